use std::fmt;
use std::time::Duration;

/// Point-in-time copy of the aggregate counters.
///
/// `empty_response` and `transient_fault` are subsets of `failure`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub success: u64,
    pub failure: u64,
    pub transient_fault: u64,
    pub empty_response: u64,
}

impl StatsSnapshot {
    pub fn completed(&self) -> u64 {
        self.success + self.failure
    }
}

/// Lifecycle of a run: `Idle -> Running -> (Completed | TimedOut) -> Reported`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    TimedOut,
    Reported,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "Idle",
            RunState::Running => "Running",
            RunState::Completed => "Completed",
            RunState::TimedOut => "TimedOut",
            RunState::Reported => "Reported",
        };
        f.write_str(name)
    }
}

/// Summary of a finished run.
///
/// Rates are percentages of `total_requests`, so a timed out run reports the missing
/// requests as neither successes nor failures.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Either [`RunState::Completed`] or [`RunState::TimedOut`].
    pub state: RunState,
    pub total_requests: u64,
    pub success: u64,
    pub failure: u64,
    pub transient_fault: u64,
    pub empty_response: u64,
    pub elapsed: Duration,
    /// Completed requests per second. `None` when no time elapsed.
    pub requests_per_second: Option<f64>,
    pub success_rate: f64,
    pub failure_rate: f64,
    pub transient_fault_rate: f64,
}

impl RunReport {
    pub fn completed(&self) -> u64 {
        self.success + self.failure
    }

    pub fn timed_out(&self) -> bool {
        self.state == RunState::TimedOut
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== TEST RESULTS ===")?;
        writeln!(f, "RUN STATE: {}", self.state)?;
        writeln!(f, "TOTAL NUMBER OF REQUESTS: {}", self.total_requests)?;
        if self.timed_out() {
            writeln!(f, "COMPLETED BEFORE DEADLINE: {}", self.completed())?;
        }
        writeln!(f, "NUMBER OF SUCCESSFUL REQUESTS: {}", self.success)?;
        writeln!(f, "NUMBER OF FAILED REQUESTS: {}", self.failure)?;
        writeln!(f, "NUMBER OF EMPTY RESPONSES: {}", self.empty_response)?;
        writeln!(
            f,
            "NUMBER OF TRANSIENT NETWORK FAULTS: {}",
            self.transient_fault
        )?;
        writeln!(
            f,
            "TOTAL TIME CONSUMPTION: {:.3}s",
            self.elapsed.as_secs_f64()
        )?;
        match self.requests_per_second {
            Some(rps) => writeln!(f, "AVERAGE QPS: {rps:.2}")?,
            None => writeln!(f, "AVERAGE QPS: undefined")?,
        }
        writeln!(f, "SUCCESS RATE: {:.2}%", self.success_rate)?;
        writeln!(f, "FAILURE RATE: {:.2}%", self.failure_rate)?;
        writeln!(
            f,
            "TRANSIENT NETWORK FAULT RATE: {:.2}%",
            self.transient_fault_rate
        )?;

        if self.transient_fault > 0 {
            writeln!(f)?;
            writeln!(
                f,
                "WARNING: detected {} transient network faults (connection reset/closed)!",
                self.transient_fault
            )?;
            writeln!(
                f,
                "These point at connection-level instability between this host and the service."
            )?;
        }

        write!(f, "========================================")
    }
}
