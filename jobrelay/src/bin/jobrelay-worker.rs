use std::sync::Arc;

use jobrelay::config::AppConfig;
use jobrelay::database::repositories::SqlxJobStore;
use jobrelay::logging;
use jobrelay::worker::{LoggingHandler, Worker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(logging::DEFAULT_LOG_FILTER);

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env_or_default();

    let store = SqlxJobStore::open(&config.database_url).await?;

    let worker = Worker::new(
        Arc::new(store),
        WorkerConfig::from_env_or_default(),
        Arc::new(LoggingHandler),
    );

    let cancel_token = worker.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            cancel_token.cancel();
        }
    });

    worker.run().await?;

    Ok(())
}
