use chainquery_api::{init_tracing, Server};
use chainquery_core::ConfigManager;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(ConfigManager::load()?);
    init_tracing(&config.config().logging);

    let server = Server::from_config(config)?;
    server.run().await?;
    Ok(())
}
