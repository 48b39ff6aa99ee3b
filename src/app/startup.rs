// LogMark - app/startup.rs
//
// Application startup validation: poll the log for app manager messages and
// feed them to core::startup until every named application has started or
// failed, or the extended timeout passes.
//
// Validation always reads the whole log from byte 0 with its own offset;
// the session's cursors are neither read nor written.

use crate::app::report::SoftTimeout;
use crate::app::scanner as log_scanner;
use crate::app::session::{LogSession, WaitClock};
use crate::core::model::{LogFileRef, MaxMatches, Timeouts};
use crate::core::scanner;
use crate::core::startup::{InstalledApps, StartupState};
use crate::util::constants::{
    APP_MANAGER_PREFIX, DIAG_STARTUP_FAILED, DIAG_STARTUP_UNSTARTED, INSTALLED_APP_PATTERN,
};
use crate::util::error::Result;
use std::collections::BTreeSet;
use std::time::Duration;

impl LogSession {
    /// Validate that every application in `app_names` starts, allowing
    /// `intended` before reporting a soft timeout and twice that before
    /// giving up.
    pub fn validate_app_startup<S: AsRef<str>>(
        &mut self,
        app_names: &[S],
        file: &LogFileRef,
        intended: Duration,
    ) -> Result<()> {
        self.validate_app_startup_with_timeouts(app_names, file, Timeouts::new(intended))
    }

    /// `validate_app_startup` with the session's configured app start timeout.
    pub fn validate_app_startup_default<S: AsRef<str>>(
        &mut self,
        app_names: &[S],
        file: &LogFileRef,
    ) -> Result<()> {
        let intended = self.config().app_start_timeout;
        self.validate_app_startup(app_names, file, intended)
    }

    pub fn validate_app_startup_with_timeouts<S: AsRef<str>>(
        &mut self,
        app_names: &[S],
        file: &LogFileRef,
        timeouts: Timeouts,
    ) -> Result<()> {
        let mut state = StartupState::new(app_names.iter().map(|n| n.as_ref()))?;
        let patterns = [scanner::compile(&regex::escape(APP_MANAGER_PREFIX))?];
        let mut offset = 0u64;

        let target = state.unstarted().join(", ");
        let mut clock = WaitClock::start("validate_app_startup", file, &target);

        loop {
            match log_scanner::scan(file, &patterns, offset, MaxMatches::Unbounded) {
                Ok(result) => {
                    offset = result.offset;
                    for line in &result.matches {
                        state.apply_line(line, APP_MANAGER_PREFIX);
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Scan failed, retrying next poll");
                }
            }

            if state.is_settled() {
                break;
            }

            let elapsed = clock.elapsed();
            if clock.crossed_soft(elapsed, timeouts.intended) {
                self.report(SoftTimeout {
                    caller: "validate_app_startup",
                    diagnostic_id: DIAG_STARTUP_UNSTARTED,
                    intended: timeouts.intended,
                    context: format!("unstarted apps {:?} in {file}", state.unstarted()),
                });
                self.report(SoftTimeout {
                    caller: "validate_app_startup",
                    diagnostic_id: DIAG_STARTUP_FAILED,
                    intended: timeouts.intended,
                    context: format!("failures so far {:?} in {file}", state.failure_lines()),
                });
            }
            if elapsed > timeouts.extended {
                break;
            }
            self.sleep_poll();
        }

        let verdict = state.verdict(file.path());
        clock.finish(
            "validate_app_startup",
            if verdict.is_ok() { "started" } else { "failed" },
        );
        Ok(verdict?)
    }
}

/// Names from `names` that the whole log currently shows as installed:
/// more start/update messages than stop messages name them.
pub fn installed_app_names<I, S>(names: I, file: &LogFileRef) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let patterns = [scanner::compile(INSTALLED_APP_PATTERN)?];
    let result = log_scanner::scan(file, &patterns, 0, MaxMatches::Unbounded)?;

    let mut installed = InstalledApps::new(names)?;
    for line in &result.matches {
        installed.observe(line);
    }
    Ok(installed.installed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::WaitConfig;
    use crate::util::error::{LogMarkError, WaitError};

    fn fast_session() -> LogSession {
        LogSession::new(WaitConfig::default().with_poll_interval(Duration::from_millis(10)))
    }

    fn log_with(content: &str) -> (tempfile::TempDir, LogFileRef) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.log");
        std::fs::write(&path, content).unwrap();
        (dir, LogFileRef::new(path))
    }

    #[test]
    fn test_all_started() {
        let (_dir, file) = log_with(
            "[1/15/24 14:30:22:123 UTC] 0000002a AppMessageHelper A CWWKZ0001I: Application alpha started in 0.4 seconds.\n\
             [1/15/24 14:30:22:456 UTC] 0000002b AppMessageHelper A CWWKZ0001I: Application beta started in 0.5 seconds.\n",
        );
        let mut session = fast_session();
        session
            .validate_app_startup(&["alpha", "beta"], &file, Duration::from_millis(50))
            .unwrap();
    }

    #[test]
    fn test_silent_app_times_out() {
        let (_dir, file) = log_with("CWWKZ0001I: Application alpha started in 0.4 seconds.\n");
        let mut session = fast_session();
        let err = session
            .validate_app_startup(&["alpha", "beta"], &file, Duration::from_millis(20))
            .unwrap_err();
        match err {
            LogMarkError::Wait(WaitError::AppsNotStarted { apps, .. }) => assert_eq!(apps, vec!["beta"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_session_cursors_untouched() {
        let (_dir, file) = log_with("CWWKZ0001I: Application alpha started in 0.4 seconds.\n");
        let mut session = fast_session();
        session.set_mark(file.path(), 1000);
        session
            .validate_app_startup(&["alpha"], &file, Duration::from_millis(20))
            .unwrap();
        assert_eq!(session.mark(file.path()), 1000);
        assert_eq!(session.offset(file.path()), 0);
    }

    #[test]
    fn test_installed_app_names() {
        let (_dir, file) = log_with(
            "CWWKZ0001I: Application alpha started in 0.4 seconds.\n\
             CWWKZ0001I: Application beta started in 0.4 seconds.\n\
             CWWKZ0009I: The application beta has stopped successfully.\n\
             CWWKZ0003I: The application gamma updated in 0.2 seconds.\n",
        );
        let installed = installed_app_names(["alpha", "beta", "gamma", "delta"], &file).unwrap();
        let names: Vec<_> = installed.into_iter().collect();
        assert_eq!(names, vec!["alpha", "gamma"]);
    }
}
