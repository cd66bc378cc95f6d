//! The remote call, wrapped with a connection cap and a per-call time budget.
use stampede_core::{short_type_name, Outcome, Payload, RequestId, RunConfig};
use std::borrow::Cow;
use std::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Semaphore;
#[allow(unused_imports)]
use tracing::{debug, error, trace};

/// The single operation the harness needs from an API client.
///
/// Implementations may write `async fn invoke` directly; the returned future has to be `Send`
/// since calls run on worker tasks.
pub trait Invoke: Send + Sync + 'static {
    type Response: Payload + Send;
    type Error: Error + Send + Sync + 'static;

    fn invoke(
        &self,
        request_id: RequestId,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;

    /// Category name reported for failures which are not transient network faults.
    fn failure_label(&self, _error: &Self::Error) -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<Self::Error>())
    }
}

/// Caps how many calls hold a connection at once and bounds each call by
/// `RunConfig::per_call_timeout`.
///
/// Callers beyond `connection_pool_limit` wait in FIFO order for a free slot. The wait for a
/// slot does not count against the call's time budget.
pub struct BoundedClient<T> {
    invoker: T,
    connections: Semaphore,
    connection_limit: usize,
    call_timeout: Duration,
}

impl<T: Invoke> BoundedClient<T> {
    pub fn new(invoker: T, config: &RunConfig) -> Self {
        let connection_limit = config.connection_pool_limit.get();
        Self {
            invoker,
            connections: Semaphore::new(connection_limit),
            connection_limit,
            call_timeout: config.per_call_timeout,
        }
    }

    /// Never fails; every error is folded into an [`Outcome`].
    pub async fn call(&self, request_id: RequestId) -> Outcome {
        let Ok(_permit) = self.connections.acquire().await else {
            error!("Connection pool closed while request #{request_id} was waiting.");
            return Outcome::OtherFailure {
                label: Cow::Borrowed("PoolClosed"),
                message: "connection pool closed".to_string(),
            };
        };
        trace!("Request #{request_id} acquired a connection.");

        match tokio::time::timeout(self.call_timeout, self.invoker.invoke(request_id)).await {
            Ok(Ok(response)) => Outcome::from_payload(&response),
            Ok(Err(err)) => {
                let label = self.invoker.failure_label(&err);
                Outcome::from_error(label, &err)
            }
            Err(_elapsed) => {
                debug!("Request #{request_id} exceeded {:?}.", self.call_timeout);
                Outcome::OtherFailure {
                    label: Cow::Borrowed("Timeout"),
                    message: format!("call exceeded {:?}", self.call_timeout),
                }
            }
        }
    }

    pub fn connection_limit(&self) -> usize {
        self.connection_limit
    }

    /// Connection slots not held by a call right now.
    pub fn available_connections(&self) -> usize {
        self.connections.available_permits()
    }

    pub fn invoker(&self) -> &T {
        &self.invoker
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Test double recording how many calls are in flight at once.
    #[derive(Default)]
    pub(crate) struct Probe {
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
        pub calls: AtomicUsize,
    }

    impl Probe {
        pub fn enter(&self) {
            self.calls.fetch_add(1, Ordering::AcqRel);
            let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
            self.max_in_flight.fetch_max(now, Ordering::AcqRel);
        }

        pub fn exit(&self) {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
        }

        pub fn max(&self) -> usize {
            self.max_in_flight.load(Ordering::Acquire)
        }
    }

    /// Sleeps for `delay`, then fails every request id for which `fail` returns true.
    pub(crate) struct MockInvoker {
        pub probe: Arc<Probe>,
        pub delay: Duration,
        pub fail: fn(RequestId) -> Option<&'static str>,
    }

    impl MockInvoker {
        pub fn new(delay: Duration, fail: fn(RequestId) -> Option<&'static str>) -> Self {
            Self {
                probe: Arc::new(Probe::default()),
                delay,
                fail,
            }
        }

        pub fn succeeding(delay: Duration) -> Self {
            Self::new(delay, |_| None)
        }
    }

    impl Invoke for MockInvoker {
        type Response = ();
        type Error = io::Error;

        async fn invoke(&self, request_id: RequestId) -> Result<(), io::Error> {
            self.probe.enter();
            tokio::time::sleep(self.delay).await;
            self.probe.exit();
            match (self.fail)(request_id) {
                Some(msg) => Err(io::Error::new(io::ErrorKind::Other, msg)),
                None => Ok(()),
            }
        }
    }

    struct Empty;

    impl Invoke for Empty {
        type Response = Vec<String>;
        type Error = io::Error;

        async fn invoke(&self, _request_id: RequestId) -> Result<Vec<String>, io::Error> {
            Ok(vec![])
        }

        fn failure_label(&self, _error: &io::Error) -> Cow<'static, str> {
            Cow::Borrowed("Custom")
        }
    }

    fn config(connections: usize, timeout: Duration) -> RunConfig {
        RunConfig::new(NonZeroUsize::new(1).unwrap())
            .connections(NonZeroUsize::new(connections).unwrap())
            .call_timeout(timeout)
    }

    #[tokio::test]
    async fn classifies_responses_and_errors() {
        let client = BoundedClient::new(
            MockInvoker::new(Duration::ZERO, |id| match id {
                1 => Some("Connection reset by peer"),
                2 => Some("internal server error"),
                _ => None,
            }),
            &config(1, Duration::from_secs(1)),
        );

        assert!(matches!(
            client.call(1).await,
            Outcome::TransientNetworkFault { .. }
        ));
        assert_eq!(
            client.call(2).await,
            Outcome::OtherFailure {
                label: "Error".into(),
                message: "internal server error".into(),
            }
        );
        assert_eq!(client.call(3).await, Outcome::Success);
    }

    #[tokio::test]
    async fn empty_payload_is_reported() {
        let client = BoundedClient::new(Empty, &config(1, Duration::from_secs(1)));
        assert_eq!(client.call(1).await, Outcome::EmptyResponse);
        assert_eq!(client.invoker().failure_label(&io::ErrorKind::Other.into()), "Custom");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let client = BoundedClient::new(
            MockInvoker::succeeding(Duration::from_secs(10)),
            &config(1, Duration::from_secs(1)),
        );

        let outcome = client.call(1).await;
        assert_eq!(outcome.label(), "Timeout");
        assert_eq!(client.available_connections(), 1);
    }

    #[tracing_test::traced_test]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ntest::timeout(10_000)]
    async fn never_exceeds_connection_limit() {
        let client = Arc::new(BoundedClient::new(
            MockInvoker::succeeding(Duration::from_millis(5)),
            &config(3, Duration::from_secs(5)),
        ));

        let handles: Vec<_> = (1..=60)
            .map(|id| {
                let client = client.clone();
                tokio::spawn(async move { client.call(id).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Outcome::Success);
        }

        let probe = &client.invoker().probe;
        assert_eq!(probe.calls.load(Ordering::Acquire), 60);
        assert!(probe.max() <= 3, "max in flight was {}", probe.max());
        assert_eq!(client.available_connections(), client.connection_limit());
    }
}
