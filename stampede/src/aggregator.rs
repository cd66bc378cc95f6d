//! Outcome counters shared by every worker of a run.
use stampede_core::{FailureKind, Outcome, StatsSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free per-run counters.
///
/// Writers bump `failure` before the sub-kind counter and [`Aggregator::snapshot`] reads them
/// in the reverse order, so a snapshot never shows more transient faults than failures.
#[derive(Debug, Default)]
pub struct Aggregator {
    success: AtomicU64,
    failure: AtomicU64,
    transient_fault: AtomicU64,
    empty_response: AtomicU64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.success.fetch_add(1, Ordering::AcqRel);
    }

    pub fn record_failure(&self, kind: FailureKind) {
        self.failure.fetch_add(1, Ordering::AcqRel);
        match kind {
            FailureKind::TransientNetworkFault => {
                self.transient_fault.fetch_add(1, Ordering::AcqRel);
            }
            FailureKind::EmptyResponse => {
                self.empty_response.fetch_add(1, Ordering::AcqRel);
            }
            FailureKind::Other => {}
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        match outcome.failure_kind() {
            None => self.record_success(),
            Some(kind) => self.record_failure(kind),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let transient_fault = self.transient_fault.load(Ordering::Acquire);
        let empty_response = self.empty_response.load(Ordering::Acquire);
        let failure = self.failure.load(Ordering::Acquire);
        let success = self.success.load(Ordering::Acquire);

        StatsSnapshot {
            success,
            failure,
            transient_fault,
            empty_response,
        }
    }
}
