use axum::{http::HeaderValue, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_scout::config::Config;
use lead_scout::db::Database;
use lead_scout::db_storage::{LeadRepository, PgLeadRepository};
use lead_scout::directory::YellowPagesScraper;
use lead_scout::enrichment::EnrichmentClient;
use lead_scout::evaluation::{EvaluationEngine, OpenAiScoringBackend};
use lead_scout::handlers::{self, AppState};
use lead_scout::pipeline::LeadPipeline;

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the database pool and the pipeline
/// collaborators, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize database connection pool
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let repository: Arc<dyn LeadRepository> = Arc::new(PgLeadRepository::new(db.pool.clone()));
    let directory = Arc::new(YellowPagesScraper::from_config(&config));
    let enrichment = EnrichmentClient::from_config(&config)?;
    let evaluator = EvaluationEngine::new(
        Arc::new(OpenAiScoringBackend::from_config(&config)),
        repository.clone(),
    );

    let app_state = Arc::new(AppState {
        pipeline: LeadPipeline::new(repository, directory, enrichment, evaluator),
    });

    // Configure rate limiter: 2 requests/second per IP, burst of 10.
    // Searches start a browser session each.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(10)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let cors = match &config.frontend_origin {
        Some(origin) => CorsLayer::permissive().allow_origin(origin.parse::<HeaderValue>()?),
        None => CorsLayer::permissive(),
    };

    let protected_routes = handlers::api_routes().layer(
        ServiceBuilder::new()
            // Request size limit: 1MB max payload
            .layer(RequestBodyLimitLayer::new(1024 * 1024))
            .layer(GovernorLayer {
                config: governor_conf,
            }),
    );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
