use crate::{
    DEFAULT_CONCURRENT_REQUESTS, DEFAULT_CONNECTION_POOL_LIMIT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_OVERALL_DEADLINE, DEFAULT_PER_CALL_TIMEOUT, DEFAULT_PROGRESS_INTERVAL,
    DEFAULT_SHUTDOWN_GRACE, DEFAULT_WORKER_POOL_SIZE,
};
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Settings for a single run.
///
/// `worker_pool_size` caps how many calls are *executing*, `connection_pool_limit` caps how
/// many are holding a transport connection. The two are independent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    pub concurrent_requests: NonZeroUsize,
    pub worker_pool_size: NonZeroUsize,
    pub connection_pool_limit: NonZeroUsize,
    pub per_call_timeout: Duration,
    pub connect_timeout: Duration,
    pub overall_deadline: Duration,
    pub progress_interval: NonZeroUsize,
    pub shutdown_grace: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            connection_pool_limit: DEFAULT_CONNECTION_POOL_LIMIT,
            per_call_timeout: DEFAULT_PER_CALL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            overall_deadline: DEFAULT_OVERALL_DEADLINE,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl RunConfig {
    pub fn new(concurrent_requests: NonZeroUsize) -> Self {
        Self {
            concurrent_requests,
            ..Default::default()
        }
    }

    pub fn workers(mut self, worker_pool_size: NonZeroUsize) -> Self {
        self.worker_pool_size = worker_pool_size;
        self
    }

    pub fn connections(mut self, connection_pool_limit: NonZeroUsize) -> Self {
        self.connection_pool_limit = connection_pool_limit;
        self
    }

    pub fn call_timeout(mut self, per_call_timeout: Duration) -> Self {
        self.per_call_timeout = per_call_timeout;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn deadline(mut self, overall_deadline: Duration) -> Self {
        self.overall_deadline = overall_deadline;
        self
    }

    pub fn progress_interval(mut self, progress_interval: NonZeroUsize) -> Self {
        self.progress_interval = progress_interval;
        self
    }

    pub fn shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }

    /// Total number of requests as the counter type used in reports.
    pub fn total_requests(&self) -> u64 {
        self.concurrent_requests.get() as u64
    }

    /// Rejects zero timeouts and deadlines. A zero `shutdown_grace` is allowed and means
    /// leftover workers are aborted right away.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("per-call timeout", self.per_call_timeout),
            ("connect timeout", self.connect_timeout),
            ("overall deadline", self.overall_deadline),
        ];

        match durations.iter().find(|(_, dur)| dur.is_zero()) {
            Some((name, _)) => Err(ConfigError::ZeroDuration(*name)),
            None => Ok(()),
        }
    }
}
