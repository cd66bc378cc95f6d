use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use stampede_runtime::ChatTarget;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::{mpsc, OnceLock};
use tokio::net::TcpListener;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

/// A mock chat service running on its own runtime for the lifetime of the test binary.
pub struct MockService {
    pub addr: SocketAddr,
    pub dropping_addr: SocketAddr,
    pub metrics: PrometheusHandle,
}

impl MockService {
    pub fn target(&self, deployment: &str) -> ChatTarget {
        ChatTarget::new(&format!("http://{}", self.addr), "test-key", deployment).unwrap()
    }

    /// Target whose connections are closed without a response.
    pub fn dropping_target(&self) -> ChatTarget {
        ChatTarget::new(&format!("http://{}", self.dropping_addr), "test-key", "ok").unwrap()
    }
}

pub fn init() -> &'static MockService {
    static MOCK: OnceLock<MockService> = OnceLock::new();

    MOCK.get_or_init(|| {
        let _ = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_env_filter("stampede=info,mock_service=info")
            .try_init();

        let metrics = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install metrics recorder");

        // NOTE: Each #[tokio::test] has its own runtime, so the service gets a dedicated one
        // that outlives any single test.
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let dropping = TcpListener::bind("127.0.0.1:0").await.unwrap();
                tx.send((
                    listener.local_addr().unwrap(),
                    dropping.local_addr().unwrap(),
                ))
                .unwrap();

                tokio::spawn(mock_service::run_dropping(dropping));
                if let Err(err) = mock_service::run(listener).await {
                    error!("Mock service stopped: {err:?}");
                }
            });
        });

        let (addr, dropping_addr) = rx.recv().expect("Mock service failed to start");
        MockService {
            addr,
            dropping_addr,
            metrics,
        }
    })
}

pub fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}
