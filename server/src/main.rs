use std::sync::Arc;

use tokio::sync::Notify;
use tracing::Level;
use virtlens::context::Context;
use virtlens::server::api_server;
use virtlens_config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    virtlens_trace::setup_tracing_to_stdout(Level::INFO);

    let config = Config::from_env()?;
    let context = Context::new().await?;
    let shutdown = Arc::new(Notify::new());

    api_server::start(&config, context, shutdown).await
}
