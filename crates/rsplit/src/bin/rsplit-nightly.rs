//! One-shot nightly run: links every unresolved split in the SQLite database
//! to its SEC filing.

use std::sync::Arc;

use rsplit::{BatchConfig, SqliteStore, run_nightly_edgar_batch_with_shutdown};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let config = BatchConfig::from_env()?;
    let db_path = std::env::var("RSPLIT_DB_PATH").unwrap_or_else(|_| "rsplit.db".to_string());
    info!(db_path = %db_path, "Opening split database");
    let store = Arc::new(SqliteStore::new(&db_path)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight splits");
            let _ = shutdown_tx.send(true);
        }
    });

    match run_nightly_edgar_batch_with_shutdown(store, &config, shutdown_rx).await {
        Ok(report) => {
            info!(%report, "Nightly EDGAR batch complete");
            for outcome in report.outcomes.iter().filter(|o| o.error.is_some()) {
                warn!(
                    split_id = %outcome.split_id,
                    symbol = %outcome.symbol,
                    error = outcome.error.as_deref().unwrap_or_default(),
                    "Split errored"
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Nightly EDGAR batch aborted");
            Err(e.into())
        }
    }
}
