//! Runs one directory search from the command line and stores the results.
//!
//! Usage: `search_leads <industry> <location>`

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_scout::config::Config;
use lead_scout::db::Database;
use lead_scout::db_storage::{LeadRepository, PgLeadRepository};
use lead_scout::directory::YellowPagesScraper;
use lead_scout::enrichment::EnrichmentClient;
use lead_scout::evaluation::{EvaluationEngine, OpenAiScoringBackend};
use lead_scout::models::SearchQuery;
use lead_scout::pipeline::LeadPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_scout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (industry, location) = match (args.next(), args.next()) {
        (Some(industry), Some(location)) => (industry, location),
        _ => anyhow::bail!("Usage: search_leads <industry> <location>"),
    };

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url).await?;

    let repository: Arc<dyn LeadRepository> = Arc::new(PgLeadRepository::new(db.pool.clone()));
    let pipeline = LeadPipeline::new(
        repository.clone(),
        Arc::new(YellowPagesScraper::from_config(&config)),
        EnrichmentClient::from_config(&config)?,
        EvaluationEngine::new(
            Arc::new(OpenAiScoringBackend::from_config(&config)),
            repository,
        ),
    );

    let changed = pipeline
        .search(&SearchQuery { industry, location })
        .await?;
    let total = pipeline.list().await?.len();

    println!("{} leads inserted or changed, {} stored in total", changed, total);
    Ok(())
}
