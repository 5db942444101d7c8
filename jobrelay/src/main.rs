use std::sync::Arc;

use jobrelay::api::server::{ApiServer, ApiServerConfig, AppState};
use jobrelay::config::AppConfig;
use jobrelay::database::repositories::SqlxJobStore;
use jobrelay::dispatch::DispatchClient;
use jobrelay::llm::AnthropicClient;
use jobrelay::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(logging::DEFAULT_LOG_FILTER);

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env_or_default();

    let store = SqlxJobStore::open(&config.database_url).await?;
    let llm = AnthropicClient::new(&config.llm)?;
    let dispatch = DispatchClient::new(&config.dispatch_base_url);

    let state = AppState::new(Arc::new(store), Arc::new(llm), Arc::new(dispatch));
    let server = ApiServer::new(ApiServerConfig::from_env_or_default(), state);

    let cancel_token = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            cancel_token.cancel();
        }
    });

    server.run().await?;

    Ok(())
}
