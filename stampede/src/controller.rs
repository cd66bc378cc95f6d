//! Run lifecycle: build the client, dispatch, wait for the deadline, report.
use crate::aggregator::Aggregator;
use crate::client::{BoundedClient, Invoke};
use crate::dispatcher::Dispatcher;
use crate::error::RunError;
use crate::reporter;
use stampede_core::{RunConfig, RunReport, RunState};
use std::sync::Arc;
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn};

/// Drives runs through `Idle -> Running -> (Completed | TimedOut) -> Reported`.
///
/// A timed out run stops *waiting*; its in-flight calls keep going until their own per-call
/// timeout and may still bump counters after the report was taken. Those leftover workers
/// are drained by [`RunController::shutdown`] or before the next run starts. Workers of a
/// run whose future was dropped are drained the same way, and dropping the controller
/// aborts whatever is left.
///
/// # Example
/// ```no_run
/// use stampede::prelude::*;
/// use std::convert::Infallible;
///
/// struct Noop;
///
/// impl Invoke for Noop {
///     type Response = ();
///     type Error = Infallible;
///
///     async fn invoke(&self, _request_id: RequestId) -> Result<(), Infallible> {
///         Ok(())
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let mut controller = RunController::new(RunConfig::default()).unwrap();
///     let report = controller.run(Noop).await;
///     println!("{report}");
///     controller.shutdown().await;
/// }
/// ```
pub struct RunController {
    config: RunConfig,
    state: RunState,
    leftover: Option<Dispatcher>,
}

impl RunController {
    pub fn new(config: RunConfig) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RunState::Idle,
            leftover: None,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    #[instrument(name = "run", skip_all, fields(
        requests = self.config.concurrent_requests.get(),
        workers = self.config.worker_pool_size.get(),
        connections = self.config.connection_pool_limit.get(),
    ))]
    pub async fn run<T: Invoke>(&mut self, invoker: T) -> RunReport {
        // NOTE: `&mut self` rules out a concurrent run, so a non-terminal state here means the
        // previous run future was dropped. Its workers are still in `leftover`.
        if !matches!(self.state, RunState::Idle | RunState::Reported) {
            warn!("Previous run was interrupted while {}.", self.state);
        }
        self.shutdown().await;

        info!("Running with config {:?}", &self.config);

        let aggregator = Arc::new(Aggregator::new());
        let client = Arc::new(BoundedClient::new(invoker, &self.config));

        self.transition(RunState::Running);
        let start = Instant::now();
        let dispatcher = self.leftover.insert(Dispatcher::spawn(
            &self.config,
            client,
            aggregator.clone(),
        ));

        let terminal =
            match tokio::time::timeout(self.config.overall_deadline, dispatcher.join()).await {
                Ok(()) => RunState::Completed,
                Err(_) => {
                    warn!(
                        "Deadline of {:?} elapsed with {} workers still running; reporting partial results.",
                        self.config.overall_deadline,
                        dispatcher.remaining()
                    );
                    RunState::TimedOut
                }
            };
        let elapsed = start.elapsed();
        if terminal == RunState::Completed {
            self.leftover = None;
        }
        self.transition(terminal);

        let report = reporter::report(
            aggregator.snapshot(),
            elapsed,
            self.config.total_requests(),
            terminal,
        );
        self.transition(RunState::Reported);

        info!("Run complete");
        report
    }

    /// Waits up to `shutdown_grace` for workers left over from a timed out run, then aborts
    /// them. Does nothing if there are none.
    pub async fn shutdown(&mut self) {
        if let Some(dispatcher) = self.leftover.take() {
            debug!("Draining {} leftover workers.", dispatcher.remaining());
            dispatcher.shutdown(self.config.shutdown_grace).await;
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("{} -> {}", self.state, next);
        self.state = next;
    }
}
