/// Company-profile API handlers
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use tracing::info;

use super::company_id_from_headers;
use super::AppState;
use crate::api::types::ApiError;
use crate::api::types::ApiResponse;
use crate::models::profile_options;
use crate::models::CompanyProfile;
use crate::models::CreateProfileRequest;
use crate::models::ProfileOptions;
use crate::models::UpdateProfileRequest;
use crate::TenderMatchError;

/// GET /api/company-profile
pub async fn get_company_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CompanyProfile>, ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    info!("GET /api/company-profile company={}", company_id);

    let profile = state
        .database
        .get_profile_by_company(company_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(TenderMatchError::ProfileNotFound(company_id)))?;

    Ok(Json(profile))
}

/// POST /api/company-profile (onboarding step 1)
pub async fn create_company_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<CompanyProfile>), ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    info!("POST /api/company-profile company={}", company_id);

    request.validate()?;

    let profile = state.database.create_profile(company_id, &request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// PUT /api/company-profile (partial update)
pub async fn update_company_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<CompanyProfile>, ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    info!("PUT /api/company-profile company={}", company_id);

    request.validate()?;

    let profile = state.database.update_profile(company_id, &request).await?;
    Ok(Json(profile))
}

/// GET /api/company-profile/options
pub async fn get_profile_options() -> Json<ApiResponse<ProfileOptions>> {
    Json(ApiResponse::success(profile_options()))
}
