use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use whistle_node::config::Config;
use whistle_node::db::Database;
use whistle_node::handlers::{self, AppState};
use whistle_node::i18n::{AppDataFile, LanguageRegistry};
use whistle_node::node;
use whistle_node::scheduler;
use whistle_node::tor::TorExitSet;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("whistle_node=info".parse()?),
        )
        .init();

    info!("Starting whistle-node {}", node::VERSION);

    let config = Arc::new(Config::from_env()?);

    // Step 1: Open the database and bootstrap the node on first run
    let db = Database::new(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;
    let appdata = Arc::new(AppDataFile::new(config.appdata_path()));

    db.transact(|tx| {
        node::initialize(tx, LanguageRegistry::get(), appdata.as_ref(), &config.default_language)
    })?;

    // Step 2: Background jobs
    let exit_set = Arc::new(TorExitSet::new());
    let _scheduler = scheduler::start_scheduler(Arc::clone(&config), exit_set).await?;

    // Step 3: Serve the API
    let state = AppState::new(Arc::clone(&config), db, appdata)?;
    let app = handlers::router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
