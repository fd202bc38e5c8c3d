/// API request handlers
use std::sync::Arc;

use axum::http::HeaderMap;
use axum::Json;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::api::types::ApiError;
use crate::api::types::ApiResponse;
use crate::api::types::HealthResponse;
use crate::config::AppConfig;
use crate::database::Database;
use crate::feedback::FeedbackProcessor;
use crate::recommend::Matcher;
use crate::recommend::SimilarService;

pub mod profile;
pub mod recommendations;

pub use profile::*;
pub use recommendations::*;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<Database>,
    pub matcher: Arc<Matcher>,
    pub similar: Arc<SimilarService>,
    pub feedback: Arc<FeedbackProcessor>,
    pub config: Arc<AppConfig>,
    /// Bounds concurrent recommendation work; exhaustion sheds with 429.
    pub recommend_limiter: Arc<Semaphore>,
}

/// Per-request identity supplied by the transport layer. The core never
/// reads process-wide auth state.
pub fn company_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get("x-company-id")
        .ok_or_else(|| ApiError::unauthorized("missing X-Company-Id header"))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid X-Company-Id header"))?;

    Uuid::parse_str(value).map_err(|_| ApiError::unauthorized("invalid X-Company-Id header"))
}

pub fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let value = headers
        .get("x-user-id")
        .ok_or_else(|| ApiError::unauthorized("missing X-User-Id header"))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::unauthorized("invalid X-User-Id header"))?;

    Uuid::parse_str(value).map_err(|_| ApiError::unauthorized("invalid X-User-Id header"))
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_company_id_extraction() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-company-id",
            HeaderValue::from_str(&id.to_string()).unwrap(),
        );
        assert_eq!(company_id_from_headers(&headers).unwrap(), id);
    }

    #[test]
    fn test_missing_company_id_is_unauthorized() {
        let headers = HeaderMap::new();
        let err = company_id_from_headers(&headers).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_company_id_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("x-company-id", HeaderValue::from_static("not-a-uuid"));
        let err = company_id_from_headers(&headers).unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }
}
