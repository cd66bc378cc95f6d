use crate::aggregator::Aggregator;
use crate::client::{BoundedClient, Invoke};
use async_channel::Receiver;
use stampede_core::{Outcome, RequestId, RunConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// Fixed pool of worker tasks draining a backlog of request ids.
pub(crate) struct Dispatcher {
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Enqueues every request id, closes the backlog, then starts the workers.
    pub fn spawn<T: Invoke>(
        config: &RunConfig,
        client: Arc<BoundedClient<T>>,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        let total = config.concurrent_requests.get();
        let (tx, rx) = async_channel::bounded(total);
        for request_id in 1..=total as RequestId {
            if tx.try_send(request_id).is_err() {
                error!("Backlog rejected request #{request_id}.");
            }
        }
        tx.close();

        // NOTE: Spawning more workers than requests would only leave idle tasks around.
        let pool_size = config.worker_pool_size.get().min(total);
        let progress_interval = config.progress_interval.get() as RequestId;
        debug!("Dispatching {total} requests to {pool_size} workers.");

        let workers = (0..pool_size)
            .map(|worker_id| {
                tokio::spawn(
                    worker(
                        worker_id,
                        rx.clone(),
                        client.clone(),
                        aggregator.clone(),
                        progress_interval,
                    )
                    .in_current_span(),
                )
            })
            .collect();

        Self { workers }
    }

    /// Waits for every worker. Cancel-safe: handles are only dropped once their task finished.
    pub async fn join(&mut self) {
        while let Some(handle) = self.workers.last_mut() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!("Worker panicked: {err}");
                }
            }
            self.workers.pop();
        }
    }

    /// Number of workers still running.
    pub fn remaining(&self) -> usize {
        self.workers.iter().filter(|h| !h.is_finished()).count()
    }

    /// Gives leftover workers `grace` to drain, then aborts whatever is still running.
    pub async fn shutdown(mut self, grace: Duration) {
        if tokio::time::timeout(grace, self.join()).await.is_err() {
            warn!(
                "{} workers still running after {grace:?}; aborting them.",
                self.remaining()
            );
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for handle in self.workers.drain(..) {
            handle.abort();
        }
    }
}

async fn worker<T: Invoke>(
    worker_id: usize,
    backlog: Receiver<RequestId>,
    client: Arc<BoundedClient<T>>,
    aggregator: Arc<Aggregator>,
    progress_interval: RequestId,
) {
    while let Ok(request_id) = backlog.recv().await {
        let start = Instant::now();
        let outcome = client.call(request_id).await;
        let elapsed = start.elapsed();

        aggregator.record(&outcome);

        #[cfg(feature = "metrics")]
        record_metrics(&outcome, elapsed);

        log_outcome(request_id, &outcome, progress_interval, elapsed);
    }
    trace!("Worker {worker_id} found the backlog empty.");
}

fn log_outcome(
    request_id: RequestId,
    outcome: &Outcome,
    progress_interval: RequestId,
    elapsed: Duration,
) {
    match outcome {
        Outcome::Success => {
            if request_id % progress_interval == 0 {
                info!("Request #{request_id} success");
            }
        }
        Outcome::EmptyResponse => warn!("Request #{request_id} response empty"),
        Outcome::TransientNetworkFault { message } => {
            error!("Request #{request_id} CONNECTION RESET OCCURRED after {elapsed:?}: {message}")
        }
        Outcome::OtherFailure { label, message } => {
            warn!("Request #{request_id} failed ({label}): {message}")
        }
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(outcome: &Outcome, elapsed: Duration) {
    metrics::histogram!("stampede_call_latency").record(elapsed.as_nanos() as f64);

    match outcome {
        Outcome::Success => metrics::counter!("stampede_success").increment(1),
        Outcome::TransientNetworkFault { .. } => {
            metrics::counter!("stampede_failure").increment(1);
            metrics::counter!("stampede_transient_fault").increment(1);
        }
        _ => metrics::counter!("stampede_failure").increment(1),
    }
}
