use anyhow::Context;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mock_service=debug,tower_http=info")),
        )
        .init();

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    let dropping_addr: SocketAddr = "0.0.0.0:3001".parse()?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let dropping = TcpListener::bind(dropping_addr)
        .await
        .with_context(|| format!("Failed to bind {dropping_addr}"))?;

    tokio::spawn(mock_service::run_dropping(dropping));
    mock_service::run(listener).await
}
