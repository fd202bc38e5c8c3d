//! API request and response types

use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::TenderMatchError;

/// Standard API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Machine-readable error body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub detail: String,
}

/// API error with its HTTP status
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub detail: String,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            detail: detail.into(),
            retry_after_secs: None,
        }
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", detail)
    }

    pub fn overloaded(retry_after_secs: u64) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            code: "overloaded".to_string(),
            detail: "service overloaded, retry later".to_string(),
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

impl From<TenderMatchError> for ApiError {
    fn from(error: TenderMatchError) -> Self {
        let status = match &error {
            TenderMatchError::Validation(_) | TenderMatchError::InvalidEmbeddingInput(_) => {
                StatusCode::BAD_REQUEST
            }
            TenderMatchError::ProfileNotFound(_)
            | TenderMatchError::TenderNotFound(_)
            | TenderMatchError::ReferenceNotEmbedded(_) => StatusCode::NOT_FOUND,
            TenderMatchError::ProfileIncomplete(_) | TenderMatchError::ProfileAlreadyExists(_) => {
                StatusCode::CONFLICT
            }
            TenderMatchError::Overloaded => StatusCode::TOO_MANY_REQUESTS,
            TenderMatchError::EmbeddingUpstream(_) | TenderMatchError::DeadlineExceeded => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let retry_after_secs = if error.is_retriable() { Some(1) } else { None };

        Self {
            status,
            code: error.code().to_string(),
            detail: error.to_string(),
            retry_after_secs,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            code: self.code,
            detail: self.detail,
        });

        let mut response = (self.status, body).into_response();
        if let Some(secs) = self.retry_after_secs {
            if let Ok(value) = secs.to_string().parse() {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Query parameters for GET /recommendations. List filters arrive as
/// comma-separated values.
#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub min_score: f64,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    #[serde(default)]
    pub sectors: Option<String>,
    #[serde(default)]
    pub regions: Option<String>,
}

fn default_limit() -> usize {
    20
}

fn default_days_ahead() -> i64 {
    7
}

/// Split a comma-separated filter value into trimmed entries.
pub fn split_csv(value: Option<&str>) -> Option<Vec<String>> {
    let entries: Vec<String> = value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Query parameters for the similar-tenders endpoint
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    #[serde(default = "default_similar_limit")]
    pub limit: usize,
}

fn default_similar_limit() -> usize {
    5
}

/// Feedback recording response
#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub success: bool,
    pub interaction_id: Option<Uuid>,
    pub message: String,
}

/// Refresh-embedding response
#[derive(Debug, Serialize)]
pub struct RefreshEmbeddingResponse {
    pub message: String,
    pub reembedded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_csv() {
        assert_eq!(
            split_csv(Some("IT and Infrastructure, Manufacturing")),
            Some(vec![
                "IT and Infrastructure".to_string(),
                "Manufacturing".to_string()
            ])
        );
        assert_eq!(split_csv(Some("  ,, ")), None);
        assert_eq!(split_csv(None), None);
    }

    #[test]
    fn test_error_status_mapping() {
        let e: ApiError = TenderMatchError::ProfileIncomplete("x".to_string()).into();
        assert_eq!(e.status, StatusCode::CONFLICT);

        let e: ApiError = TenderMatchError::ProfileNotFound(Uuid::nil()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e: ApiError = TenderMatchError::Validation("bad".to_string()).into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        let e: ApiError = TenderMatchError::EmbeddingUpstream("down".to_string()).into();
        assert_eq!(e.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(e.retry_after_secs.is_some());
    }
}
