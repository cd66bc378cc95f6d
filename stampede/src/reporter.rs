//! Turns the final counter snapshot into a [`RunReport`].
use stampede_core::{RunReport, RunState, StatsSnapshot};
use std::time::Duration;

/// Builds the report for a finished run.
///
/// Throughput is `None` when `elapsed` is zero; rates are relative to `total_requests`.
pub fn report(
    snapshot: StatsSnapshot,
    elapsed: Duration,
    total_requests: u64,
    state: RunState,
) -> RunReport {
    let requests_per_second = if elapsed.is_zero() {
        None
    } else {
        Some(snapshot.completed() as f64 / elapsed.as_secs_f64())
    };

    RunReport {
        state,
        total_requests,
        success: snapshot.success,
        failure: snapshot.failure,
        transient_fault: snapshot.transient_fault,
        empty_response: snapshot.empty_response,
        elapsed,
        requests_per_second,
        success_rate: percent(snapshot.success, total_requests),
        failure_rate: percent(snapshot.failure, total_requests),
        transient_fault_rate: percent(snapshot.transient_fault, total_requests),
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.
    } else {
        count as f64 * 100. / total as f64
    }
}
