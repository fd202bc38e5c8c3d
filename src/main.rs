use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use tendermatch::config::AppConfig;
use tendermatch::database::Database;
use tendermatch::embeddings::backfill::backfill_tender_embeddings;
use tendermatch::embeddings::EmbeddingService;
use tendermatch::Result;
use tracing::info;

#[derive(Parser)]
#[command(name = "tendermatch")]
#[command(about = "Personalized tender recommendation service")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
        /// Enable permissive CORS
        #[arg(long)]
        cors: bool,
    },
    /// Generate embeddings for tenders that are missing one
    BackfillEmbeddings {
        /// Tenders per upstream batch call
        #[arg(short, long, default_value = "50")]
        batch_size: usize,
    },
    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tendermatch::logging::init_logging_with_level("debug")?;
    } else {
        tendermatch::logging::init_logging()?;
    }

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    match cli.command {
        Commands::Serve { host, port, cors } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let enable_cors = cors || config.server.enable_cors;
            tendermatch::api::server::serve_api(&config, host, port, enable_cors).await?;
        }
        Commands::BackfillEmbeddings { batch_size } => {
            println!("🧠 Backfilling tender embeddings (batch size: {batch_size})");
            let db = Arc::new(Database::from_config(&config).await?);
            let embedding_service = Arc::new(EmbeddingService::new(&config)?);

            let stats = backfill_tender_embeddings(
                db,
                embedding_service,
                batch_size,
                config.embeddings.max_description_chars,
            )
            .await?;

            println!(
                "✅ Backfill finished: {} scanned, {} embedded, {} failed",
                stats.scanned, stats.embedded, stats.failed
            );
        }
        Commands::Config => {
            handle_config_command(&config);
        }
    }

    Ok(())
}

fn handle_config_command(config: &AppConfig) {
    println!("📋 Tendermatch Configuration:");
    println!();

    println!("🗄️  Database:");
    println!("  URL: {}", mask_database_url(config.database_url()));
    println!("  Max connections: {}", config.max_connections());
    println!("  Min connections: {}", config.min_connections());
    println!("  Connection timeout: {}s", config.connection_timeout());
    println!();

    println!("🧠 Embeddings:");
    println!("  Dimension: {}", config.embedding_dimension());
    println!("  Model: {}", config.embedding_model());
    println!("  Endpoint: {}", config.embedding_endpoint());
    println!();

    println!("🎯 Recommendation:");
    println!(
        "  Candidate breadth: max({}, {}x limit)",
        config.recommendation.candidate_floor, config.recommendation.candidate_multiplier
    );
    println!(
        "  Deadlines: recommend {}ms, similar {}ms",
        config.recommendation.recommend_deadline_ms, config.recommendation.similar_deadline_ms
    );
    println!("  Max inflight: {}", config.recommendation.max_inflight);
    println!();

    println!("🔁 Feedback:");
    println!("  Dedup window: {}s", config.feedback.dedup_window_secs);
    println!(
        "  Re-embed: every {}s or {} interactions",
        config.feedback.reembed_min_interval_secs, config.feedback.reembed_interaction_count
    );
}

/// Mask database URL for logging (hide password)
fn mask_database_url(url: &str) -> String {
    if let Ok(parsed) = url::Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            format!(
                "{}://{}@{}:{}",
                parsed.scheme(),
                parsed.username(),
                host,
                parsed.port().unwrap_or(5432)
            )
        } else {
            "***masked***".to_string()
        }
    } else {
        "***invalid***".to_string()
    }
}
