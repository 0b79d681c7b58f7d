use tracing_subscriber::EnvFilter;
use yamdb_server::{config::ServerConfig, run::run, Result};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,yamdb_app=debug,yamdb_dal=debug,tower_http=debug")),
        )
        .init();

    let args = ServerConfig::load()?;
    run(args).await
}
