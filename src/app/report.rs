// LogMark - app/report.rs
//
// Soft-timeout reporting. A wait that runs past its intended timeout keeps
// going; the overrun is handed to a reporter so slow environments can be
// spotted without failing the test.

use std::fmt;
use std::time::Duration;

/// One intended-timeout overrun.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftTimeout {
    /// Operation that overran, e.g. `"wait_for"`.
    pub caller: &'static str,
    /// Stable identifier for the kind of overrun.
    pub diagnostic_id: u32,
    pub intended: Duration,
    /// What was still being waited for.
    pub context: String,
}

impl fmt::Display for SoftTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} exceeded intended timeout of {} ms: {}",
            self.diagnostic_id,
            self.caller,
            self.intended.as_millis(),
            self.context
        )
    }
}

/// Receives soft-timeout reports. Implementations must not panic.
pub trait SoftTimeoutReporter: Send + Sync {
    fn report(&self, timeout: &SoftTimeout);
}

/// Default reporter: a WARN event per overrun.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl SoftTimeoutReporter for TracingReporter {
    fn report(&self, timeout: &SoftTimeout) {
        tracing::warn!(
            caller = timeout.caller,
            diagnostic_id = timeout.diagnostic_id,
            intended_ms = timeout.intended.as_millis() as u64,
            context = %timeout.context,
            "Intended timeout exceeded"
        );
    }
}

impl<F> SoftTimeoutReporter for F
where
    F: Fn(&SoftTimeout) + Send + Sync,
{
    fn report(&self, timeout: &SoftTimeout) {
        self(timeout)
    }
}
