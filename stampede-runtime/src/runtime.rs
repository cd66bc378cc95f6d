//! Default stampede runtime
//!
//! Reads the target and tunables from the command line (or environment), builds the chat
//! transport, runs the harness once and prints the report to stdout.
use crate::{
    chat::{ChatClient, ChatTarget},
    cli::StampedeCli,
    error::RuntimeError,
};
use clap::Parser;
use stampede::RunController;
use stampede_core::{RunConfig, RunReport};
use std::time::SystemTime;
#[allow(unused)]
use tracing::{debug, error, info, instrument};

/// Default log filter when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "stampede=info,stampede_runtime=info";

/// Single-run stress test against a chat deployment.
///
/// # Example
///
/// ```ignore
/// use stampede_runtime::StampedeRuntime;
///
/// #[tokio::main]
/// async fn main() {
///     let report = StampedeRuntime::with_args()?.run().await?;
/// }
/// ```
pub struct StampedeRuntime {
    target: ChatTarget,
    config: RunConfig,
}

impl StampedeRuntime {
    pub fn new(target: ChatTarget) -> Self {
        Self {
            target,
            config: RunConfig::default(),
        }
    }

    /// Builds the runtime from CLI arguments and environment variables.
    ///
    /// Exits the process with a usage message if a required value is missing.
    pub fn with_args() -> Result<Self, RuntimeError> {
        let args = StampedeCli::parse();
        Ok(Self::new(args.chat_target()?).config(args.run_config()))
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the harness once. Transport construction errors abort before any request is sent.
    #[instrument(name = "stampede", skip_all, fields(deployment = self.target.deployment()))]
    pub async fn run(self) -> Result<RunReport, RuntimeError> {
        let client = ChatClient::new(&self.target, &self.config)?;
        let mut controller = RunController::new(self.config.clone())?;

        print_banner(&self.config, &self.target);
        debug!("Sending requests to {}", client.url());

        let report = controller.run(client).await;

        println!();
        println!("{report}");
        println!(
            "TEST END TIME: {}",
            humantime::format_rfc3339_seconds(SystemTime::now())
        );

        controller.shutdown().await;
        Ok(report)
    }
}

fn print_banner(config: &RunConfig, target: &ChatTarget) {
    println!("=== Chat Completion High Concurrency Test ===");
    println!("ENDPOINT: {}", target.endpoint());
    println!("DEPLOYMENT: {}", target.deployment());
    println!("NUMBER OF CONCURRENT REQUESTS: {}", config.concurrent_requests);
    println!("WORKER POOL SIZE: {}", config.worker_pool_size);
    println!("CONNECTION POOL SIZE: {}", config.connection_pool_limit);
    println!(
        "TIMEOUT: {}",
        humantime::format_duration(config.per_call_timeout)
    );
    println!(
        "OVERALL DEADLINE: {}",
        humantime::format_duration(config.overall_deadline)
    );
    println!(
        "TEST START TIME: {}",
        humantime::format_rfc3339_seconds(SystemTime::now())
    );
    println!("========================================");
}
