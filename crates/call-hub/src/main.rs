//! Call hub binary.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use callpop_call_hub::{CallHubConfig, CallHubServerBuilder};

#[derive(Parser, Debug)]
#[command(name = "callpop-hub", about = "Real-time incoming-call broadcast hub")]
struct Args {
    /// Address to listen on (overrides CALLPOP_LISTEN_ADDR)
    #[arg(long)]
    listen: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = CallHubConfig::from_env();
    if let Some(listen) = args.listen {
        config = config.with_listen_addr(listen);
    }

    info!("🚀 Starting call hub on {}", config.listen_addr);

    let mut server = CallHubServerBuilder::new().with_config(config).build();
    server.start().await?;
    server.run().await?;

    Ok(())
}
