//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Recommendations
        .route("/recommendations", get(handlers::get_recommendations))
        .route(
            "/recommendations/tenders/:tender_id/similar",
            get(handlers::get_similar_tenders),
        )
        .route(
            "/recommendations/feedback/:tender_id",
            post(handlers::submit_feedback),
        )
        .route(
            "/recommendations/refresh-profile-embedding",
            post(handlers::refresh_profile_embedding),
        )
        .route(
            "/recommendations/interactions/stats",
            get(handlers::get_interaction_stats),
        )
        // Company profile
        .route(
            "/company-profile",
            get(handlers::get_company_profile)
                .post(handlers::create_company_profile)
                .put(handlers::update_company_profile),
        )
        .route("/company-profile/options", get(handlers::get_profile_options))
        .with_state(state)
}
