//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tokio::sync::Semaphore;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::database::Database;
use crate::embeddings::EmbeddingService;
use crate::feedback::FeedbackProcessor;
use crate::recommend::Matcher;
use crate::recommend::SimilarService;
use crate::Result;

/// Start the API server
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("Starting tendermatch API server...");

    // Initialize services
    let database = Arc::new(Database::from_config(config).await?);
    let embedding_service = Arc::new(EmbeddingService::new(config)?);
    let matcher = Arc::new(Matcher::new(
        database.clone(),
        config.recommendation.clone(),
    ));
    let similar = Arc::new(SimilarService::new(database.clone()));
    let feedback = Arc::new(FeedbackProcessor::new(
        database.clone(),
        embedding_service,
        config.feedback.clone(),
    ));

    let state = AppState {
        database,
        matcher,
        similar,
        feedback,
        config: Arc::new(config.clone()),
        recommend_limiter: Arc::new(Semaphore::new(config.recommendation.max_inflight)),
    };

    // Build API routes
    let api_router = routes::api_routes(state);

    let mut app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        info!("CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    // Start server
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health                                     - Health check");
    info!("  GET  /api/recommendations                            - Personalized recommendations");
    info!("  GET  /api/recommendations/tenders/:id/similar        - Similar tenders");
    info!("  POST /api/recommendations/feedback/:tender_id        - Record interaction");
    info!("  POST /api/recommendations/refresh-profile-embedding  - Force profile re-embed");
    info!("  GET  /api/recommendations/interactions/stats         - Interaction stats");
    info!("  GET  /api/company-profile                            - Load profile");
    info!("  POST /api/company-profile                            - Create profile");
    info!("  PUT  /api/company-profile                            - Update profile");
    info!("  GET  /api/company-profile/options                    - Profile options");

    axum::serve(listener, app).await?;

    Ok(())
}
