use anyhow::Context;
use stampede_runtime::{runtime::DEFAULT_LOG_FILTER, StampedeRuntime};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    StampedeRuntime::with_args()
        .context("Invalid configuration")?
        .run()
        .await
        .context("Stress test aborted")?;

    Ok(())
}
