/// Recommendation, similar-tender and feedback handlers
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::error;
use tracing::info;
use tracing::warn;
use uuid::Uuid;

use super::company_id_from_headers;
use super::user_id_from_headers;
use super::AppState;
use crate::api::types::split_csv;
use crate::api::types::ApiError;
use crate::api::types::ApiResponse;
use crate::api::types::FeedbackResponse;
use crate::api::types::RecommendQuery;
use crate::api::types::RefreshEmbeddingResponse;
use crate::api::types::SimilarQuery;
use crate::database::InteractionStats;
use crate::feedback::RecordInteractionRequest;
use crate::recommend::RecommendFilters;
use crate::recommend::RecommendationPage;
use crate::recommend::SimilarTendersResponse;
use crate::TenderMatchError;

/// GET /api/recommendations
pub async fn get_recommendations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RecommendQuery>,
) -> Result<Json<RecommendationPage>, ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    info!(
        "GET /api/recommendations company={} limit={}",
        company_id, params.limit
    );

    // Shed before queueing: a full limiter means sustained overload
    let Ok(_permit) = state.recommend_limiter.try_acquire() else {
        return Err(ApiError::overloaded(1));
    };

    // Under pressure, shrink candidate breadth before shedding requests
    let capacity = state.config.recommendation.max_inflight;
    let degraded = state.recommend_limiter.available_permits() < capacity / 4;

    let filters = RecommendFilters {
        limit: params.limit,
        min_score: params.min_score,
        days_ahead: params.days_ahead,
        sectors: split_csv(params.sectors.as_deref()),
        regions: split_csv(params.regions.as_deref()),
    };

    let deadline =
        std::time::Duration::from_millis(state.config.recommendation.recommend_deadline_ms);
    let page = tokio::time::timeout(deadline, state.matcher.recommend(company_id, filters, degraded))
        .await
        .map_err(|_| {
            error!("Recommendation deadline exceeded for company {}", company_id);
            ApiError::from(TenderMatchError::DeadlineExceeded)
        })??;

    Ok(Json(page))
}

/// GET /api/recommendations/tenders/:tender_id/similar
pub async fn get_similar_tenders(
    State(state): State<AppState>,
    Path(tender_id): Path<Uuid>,
    Query(params): Query<SimilarQuery>,
) -> Result<Json<SimilarTendersResponse>, ApiError> {
    info!("GET /api/recommendations/tenders/{}/similar", tender_id);

    let deadline =
        std::time::Duration::from_millis(state.config.recommendation.similar_deadline_ms);
    let response = tokio::time::timeout(deadline, state.similar.similar(tender_id, params.limit))
        .await
        .map_err(|_| ApiError::from(TenderMatchError::DeadlineExceeded))??;

    Ok(Json(response))
}

/// POST /api/recommendations/feedback/:tender_id
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(tender_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<RecordInteractionRequest>,
) -> Result<Json<FeedbackResponse>, ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    let user_id = user_id_from_headers(&headers)?;
    info!(
        "POST /api/recommendations/feedback/{} type={}",
        tender_id, request.interaction_type
    );

    let deadline = std::time::Duration::from_millis(state.config.feedback.record_deadline_ms);
    let outcome = tokio::time::timeout(
        deadline,
        state
            .feedback
            .record_interaction(user_id, company_id, tender_id, &request),
    )
    .await
    .map_err(|_| ApiError::from(TenderMatchError::DeadlineExceeded))??;

    // Consume the dirty flag off the request path: the interaction may have
    // pushed the profile over its re-embed conditions, and the record
    // deadline must not wait for the embedding upstream.
    if let Some(profile_id) = outcome.profile_id {
        let feedback = state.feedback.clone();
        tokio::spawn(async move {
            match feedback.trigger_reembed_if_dirty(profile_id).await {
                Ok(true) => info!("Profile {} re-embedded after interaction", profile_id),
                Ok(false) => {}
                Err(e) => warn!("Background re-embed for profile {} failed: {}", profile_id, e),
            }
        });
    }

    let message = if outcome.deduplicated {
        "Duplicate submission ignored".to_string()
    } else {
        "Feedback recorded successfully".to_string()
    };

    Ok(Json(FeedbackResponse {
        success: true,
        interaction_id: outcome.interaction_id,
        message,
    }))
}

/// POST /api/recommendations/refresh-profile-embedding
pub async fn refresh_profile_embedding(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshEmbeddingResponse>, ApiError> {
    let company_id = company_id_from_headers(&headers)?;
    info!(
        "POST /api/recommendations/refresh-profile-embedding company={}",
        company_id
    );

    let profile = state
        .database
        .get_profile_by_company(company_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(TenderMatchError::ProfileNotFound(company_id)))?;

    let reembedded = state
        .feedback
        .refresh_profile_embedding(profile.id)
        .await?;

    let message = if reembedded {
        "Profile embedding refreshed".to_string()
    } else {
        "Profile embedding already up to date".to_string()
    };

    Ok(Json(RefreshEmbeddingResponse {
        message,
        reembedded,
    }))
}

/// GET /api/recommendations/interactions/stats
pub async fn get_interaction_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<InteractionStats>>, ApiError> {
    let user_id = user_id_from_headers(&headers)?;
    info!("GET /api/recommendations/interactions/stats user={}", user_id);

    let stats = state.feedback.user_interaction_stats(user_id).await?;
    Ok(Json(ApiResponse::success(stats)))
}
