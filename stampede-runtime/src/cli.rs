use crate::chat::{ChatTarget, DEFAULT_API_VERSION};
use crate::error::RuntimeError;
use clap::Parser;
use stampede_core::RunConfig;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Fires a fixed number of chat-completion requests through a capped worker pool and
/// connection pool, then reports success, failure and connection reset counts.
///
/// Every option can also be provided through the environment variable named next to it.
#[derive(Parser, Debug)]
#[command(name = "stampede", version)]
pub struct StampedeCli {
    /// Service endpoint, e.g. https://your-resource.openai.azure.com/
    #[arg(long, env = "AZURE_OPENAI_ENDPOINT")]
    pub endpoint: String,

    #[arg(long, env = "AZURE_OPENAI_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "AZURE_OPENAI_DEPLOYMENT")]
    pub deployment: String,

    #[arg(long, env = "AZURE_OPENAI_API_VERSION", default_value = DEFAULT_API_VERSION)]
    pub api_version: String,

    /// Number of requests to fire.
    #[arg(short('r'), long, env = "STAMPEDE_REQUESTS", default_value_t = stampede_core::DEFAULT_CONCURRENT_REQUESTS)]
    pub requests: NonZeroUsize,

    /// Number of requests executing at once.
    #[arg(short('w'), long, env = "STAMPEDE_WORKERS", default_value_t = stampede_core::DEFAULT_WORKER_POOL_SIZE)]
    pub workers: NonZeroUsize,

    /// Number of connections open at once.
    #[arg(short('c'), long, env = "STAMPEDE_CONNECTIONS", default_value_t = stampede_core::DEFAULT_CONNECTION_POOL_LIMIT)]
    pub connections: NonZeroUsize,

    #[arg(long, env = "STAMPEDE_CALL_TIMEOUT", default_value = "500s", value_parser = humantime::parse_duration)]
    pub call_timeout: Duration,

    #[arg(long, env = "STAMPEDE_CONNECT_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
    pub connect_timeout: Duration,

    /// How long to wait for the whole run before reporting partial results.
    #[arg(long, env = "STAMPEDE_DEADLINE", default_value = "10m", value_parser = humantime::parse_duration)]
    pub deadline: Duration,

    /// Log every n-th successful request.
    #[arg(long, env = "STAMPEDE_PROGRESS_INTERVAL", default_value_t = stampede_core::DEFAULT_PROGRESS_INTERVAL)]
    pub progress_interval: NonZeroUsize,

    /// Time leftover workers get to finish after the report before they are aborted.
    #[arg(long, env = "STAMPEDE_SHUTDOWN_GRACE", default_value = "30s", value_parser = humantime::parse_duration)]
    pub shutdown_grace: Duration,
}

impl StampedeCli {
    pub fn run_config(&self) -> RunConfig {
        RunConfig::new(self.requests)
            .workers(self.workers)
            .connections(self.connections)
            .call_timeout(self.call_timeout)
            .connect_timeout(self.connect_timeout)
            .deadline(self.deadline)
            .progress_interval(self.progress_interval)
            .shutdown_grace(self.shutdown_grace)
    }

    pub fn chat_target(&self) -> Result<ChatTarget, RuntimeError> {
        Ok(
            ChatTarget::new(&self.endpoint, self.api_key.clone(), self.deployment.clone())?
                .api_version(self.api_version.clone()),
        )
    }
}
