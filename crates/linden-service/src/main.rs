//! Linden service binary
//!
//! Wires the engine to a storage backend and serves the workflow API.
//! Runs against PostgreSQL when LINDEN_DATABASE_URL is set, otherwise
//! against the in-memory store (development mode).

use clap::Parser;
use linden_engine::{
    BusinessCalendar, IdempotencyLedger, InMemoryMetrics, NullDispatcher, SlaClock, SlaConfig,
    StateVerifier, TransitionExecutor,
};
use linden_service::{create_router, AppState};
use linden_store::{InMemoryStore, PostgresStore, WorkflowStore};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Linden workflow service
#[derive(Parser)]
#[command(name = "lindend")]
#[command(about = "Linden - research proposal workflow service", long_about = None)]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(
        short,
        long,
        env = "LINDEN_LISTEN_ADDR",
        default_value = "127.0.0.1:8080"
    )]
    listen: String,

    /// PostgreSQL URL; omit to run on the in-memory store
    #[arg(long, env = "LINDEN_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(long, env = "LINDEN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "LINDEN_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let store: Arc<dyn WorkflowStore> = match &cli.database_url {
        Some(url) => {
            tracing::info!("using PostgreSQL storage");
            Arc::new(PostgresStore::connect(url, 10, 5).await?)
        }
        None => {
            tracing::warn!("no database configured, using in-memory storage");
            Arc::new(InMemoryStore::new())
        }
    };

    let ledger = Arc::new(IdempotencyLedger::new());
    let metrics = Arc::new(InMemoryMetrics::new());
    let sla = SlaClock::new(SlaConfig::default(), BusinessCalendar::new());

    let executor = Arc::new(TransitionExecutor::new(
        store.clone(),
        ledger.clone(),
        sla.clone(),
        metrics.clone(),
        Arc::new(NullDispatcher),
    ));
    let verifier = Arc::new(StateVerifier::new(store.clone()));

    // Hourly retention sweep over the idempotency ledger
    {
        let ledger = ledger.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                let purged = ledger.purge_expired(chrono::Utc::now());
                if purged > 0 {
                    tracing::debug!(purged, "expired idempotency records purged");
                }
            }
        });
    }

    let state = AppState {
        executor,
        store,
        verifier,
        sla: Arc::new(sla),
        metrics,
    };

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    tracing::info!(listen = %cli.listen, "linden service started");
    axum::serve(listener, router).await?;

    Ok(())
}
