use std::num::NonZeroUsize;
use std::time::Duration;

/// Number of requests fired by a default run.
pub const DEFAULT_CONCURRENT_REQUESTS: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(5_000) };

/// Number of workers executing calls at the same time by default.
pub const DEFAULT_WORKER_POOL_SIZE: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(2_000) };

/// Number of transport connections that may be open at the same time by default.
pub const DEFAULT_CONNECTION_POOL_LIMIT: NonZeroUsize =
    unsafe { NonZeroUsize::new_unchecked(3_000) };

/// Every n-th successful request is logged.
pub const DEFAULT_PROGRESS_INTERVAL: NonZeroUsize = unsafe { NonZeroUsize::new_unchecked(100) };

pub const DEFAULT_PER_CALL_TIMEOUT: Duration = Duration::from_secs(500);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_OVERALL_DEADLINE: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Lowercase message fragments which mark an error as a transient network fault.
pub const TRANSIENT_FAULT_PATTERNS: &[&str] = &[
    "connection reset",
    "connection was reset",
    "connection closed",
    "unexpected end of stream",
];
