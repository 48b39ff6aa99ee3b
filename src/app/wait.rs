// LogMark - app/wait.rs
//
// Single-pattern waits on one log file.
//
// Every wait is a sleep-then-rescan loop on the calling thread:
//   1. scan from the current offset;
//   2. a match ends the wait;
//   3. the first time elapsed time passes the intended timeout, the
//      session's reporter is told once and the wait carries on;
//   4. past the extended timeout the wait gives up;
//   5. otherwise sleep one poll interval and go again.
// At least one scan always happens, whatever the timeouts.
//
// I/O errors inside the loop mean "nothing new this poll": the server may
// not have created the file yet.

use crate::app::report::SoftTimeout;
use crate::app::scanner as log_scanner;
use crate::app::session::{LogSession, WaitClock};
use crate::core::model::{CursorKind, LogFileRef, MaxMatches, Timeouts};
use crate::core::scanner;
use crate::util::constants::{DIAG_COUNT_WAIT_SLOW, DIAG_SINGLE_WAIT_SLOW};
use crate::util::error::{PatternError, Result, WaitError};
use std::time::Duration;

impl LogSession {
    /// Wait for the first line matching `pattern` after the given cursor.
    ///
    /// Returns the matched line, or `None` once `timeouts.extended` has
    /// passed. A running-offset wait stores how far it read, matched or not;
    /// a mark wait leaves the store untouched.
    pub fn wait_for(
        &mut self,
        pattern: &str,
        file: &LogFileRef,
        timeouts: Timeouts,
        cursor: CursorKind,
    ) -> std::result::Result<Option<String>, PatternError> {
        let patterns = [scanner::compile(pattern)?];
        let mut offset = self.cursor(file.path(), cursor);
        let mut clock = WaitClock::start("wait_for", file, pattern);
        tracing::debug!(%cursor, offset, ?timeouts, "Single-pattern wait");

        loop {
            match log_scanner::scan(file, &patterns, offset, MaxMatches::Limit(1)) {
                Ok(result) => {
                    offset = result.offset;
                    if let Some(line) = result.matches.into_iter().next() {
                        self.advance(file.path(), cursor, offset);
                        clock.finish("wait_for", "matched");
                        return Ok(Some(line));
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Scan failed, retrying next poll");
                }
            }

            let elapsed = clock.elapsed();
            if clock.crossed_soft(elapsed, timeouts.intended) {
                self.report(SoftTimeout {
                    caller: "wait_for",
                    diagnostic_id: DIAG_SINGLE_WAIT_SLOW,
                    intended: timeouts.intended,
                    context: format!("[{pattern}] in {file}"),
                });
            }
            if elapsed > timeouts.extended {
                break;
            }
            self.sleep_poll();
        }

        self.advance(file.path(), cursor, offset);
        tracing::warn!(
            pattern,
            file = %file,
            timeout_ms = timeouts.extended.as_millis() as u64,
            "Pattern not found before timeout"
        );
        clock.finish("wait_for", "timed out");
        Ok(None)
    }

    /// `wait_for` with the session's configured log search timeout.
    pub fn wait_for_default(
        &mut self,
        pattern: &str,
        file: &LogFileRef,
        cursor: CursorKind,
    ) -> std::result::Result<Option<String>, PatternError> {
        let timeouts = Timeouts::new(self.config().log_search_timeout);
        self.wait_for(pattern, file, timeouts, cursor)
    }

    /// Wait for each pattern in turn, all from the file's mark.
    ///
    /// Stops at the first pattern that never shows up. Since every wait
    /// starts from the mark, the patterns may appear in any order.
    pub fn wait_for_each<S: AsRef<str>>(
        &mut self,
        patterns: &[S],
        file: &LogFileRef,
        timeouts: Timeouts,
    ) -> Result<Vec<String>> {
        let mut lines = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            match self.wait_for(pattern, file, timeouts, CursorKind::Mark)? {
                Some(line) => lines.push(line),
                None => {
                    return Err(WaitError::NotFound {
                        pattern: pattern.to_string(),
                        file: file.path().to_path_buf(),
                    }
                    .into())
                }
            }
        }
        Ok(lines)
    }

    /// Wait until at least `count` lines (minimum 1) matching `pattern` have
    /// been written after the cursor.
    ///
    /// Returns how many were seen, which is less than `count` on timeout.
    pub fn wait_for_count(
        &mut self,
        count: usize,
        pattern: &str,
        file: &LogFileRef,
        timeouts: Timeouts,
        cursor: CursorKind,
    ) -> std::result::Result<usize, PatternError> {
        let wanted = count.max(1);
        let patterns = [scanner::compile(pattern)?];
        let mut offset = self.cursor(file.path(), cursor);
        let mut seen = 0usize;
        let mut clock = WaitClock::start("wait_for_count", file, pattern);

        loop {
            match log_scanner::scan(file, &patterns, offset, MaxMatches::Limit(wanted - seen)) {
                Ok(result) => {
                    offset = result.offset;
                    seen += result.matches.len();
                    if seen >= wanted {
                        self.advance(file.path(), cursor, offset);
                        clock.finish("wait_for_count", "matched");
                        return Ok(seen);
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Scan failed, retrying next poll");
                }
            }

            let elapsed = clock.elapsed();
            if clock.crossed_soft(elapsed, timeouts.intended) {
                self.report(SoftTimeout {
                    caller: "wait_for_count",
                    diagnostic_id: DIAG_COUNT_WAIT_SLOW,
                    intended: timeouts.intended,
                    context: format!("{seen} of {wanted} x [{pattern}] in {file}"),
                });
            }
            if elapsed > timeouts.extended {
                break;
            }
            self.sleep_poll();
        }

        self.advance(file.path(), cursor, offset);
        tracing::warn!(pattern, file = %file, seen, wanted, "Count not reached before timeout");
        clock.finish("wait_for_count", "timed out");
        Ok(seen)
    }

    /// Check that `pattern` does not appear after the mark for the whole of
    /// `duration`. Returns the offending line as soon as one shows up.
    pub fn verify_absent(
        &mut self,
        pattern: &str,
        file: &LogFileRef,
        duration: Duration,
    ) -> std::result::Result<Option<String>, PatternError> {
        let patterns = [scanner::compile(pattern)?];
        let mut offset = self.mark(file.path());
        let clock = WaitClock::start("verify_absent", file, pattern);

        loop {
            match log_scanner::scan(file, &patterns, offset, MaxMatches::Limit(1)) {
                Ok(result) => {
                    offset = result.offset;
                    if let Some(line) = result.matches.into_iter().next() {
                        tracing::warn!(
                            pattern,
                            file = %file,
                            line = %crate::util::logging::preview(&line),
                            "Unexpected line found"
                        );
                        clock.finish("verify_absent", "found");
                        return Ok(Some(line));
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %file, error = %e, "Scan failed, retrying next poll");
                }
            }
            if clock.elapsed() >= duration {
                break;
            }
            self.sleep_poll();
        }

        clock.finish("verify_absent", "absent");
        Ok(None)
    }

    /// Every line matching `pattern` written after the cursor, without
    /// waiting and without moving the cursor.
    pub fn find_in_log(
        &mut self,
        pattern: &str,
        file: &LogFileRef,
        cursor: CursorKind,
    ) -> Result<Vec<String>> {
        let patterns = [scanner::compile(pattern)?];
        let offset = self.cursor(file.path(), cursor);
        let result = log_scanner::scan(file, &patterns, offset, MaxMatches::Unbounded)?;
        tracing::debug!(pattern, file = %file, found = result.matches.len(), "Searched log");
        Ok(result.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::WaitConfig;

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
    fn test_running_offset_advances_past_match() {
        let (_dir, file) = log_with("CWWKF0011I: ready\nCWWKF0011I: ready again\n");
        let mut session = fast_session();
        let t = Timeouts::from_millis(0);
        let first = session.wait_for("CWWKF0011I", &file, t, CursorKind::RunningOffset).unwrap();
        assert_eq!(first.as_deref(), Some("CWWKF0011I: ready"));
        assert_eq!(session.offset(file.path()), 18);
        let second = session.wait_for("CWWKF0011I", &file, t, CursorKind::RunningOffset).unwrap();
        assert_eq!(second.as_deref(), Some("CWWKF0011I: ready again"));
    }

    #[test]
    fn test_zero_timeout_still_scans_once() {
        let (_dir, file) = log_with("CWWKF0011I: ready\n");
        let mut session = fast_session();
        let t = Timeouts::with_extended(Duration::ZERO, Duration::ZERO);
        let line = session.wait_for("ready", &file, t, CursorKind::Mark).unwrap();
        assert!(line.is_some());
    }

    #[test]
    fn test_mark_wait_leaves_store_alone() {
        let (_dir, file) = log_with("CWWKF0011I: ready\n");
        let mut session = fast_session();
        let t = Timeouts::from_millis(0);
        session.wait_for("ready", &file, t, CursorKind::Mark).unwrap();
        session.wait_for("missing", &file, t, CursorKind::Mark).unwrap();
        assert_eq!(session.mark(file.path()), 0);
        assert_eq!(session.offset(file.path()), 0);
    }

    #[test]
    fn test_timeout_persists_running_offset() {
        let (_dir, file) = log_with("one\ntwo\n");
        let mut session = fast_session();
        let line = session
            .wait_for("three", &file, Timeouts::from_millis(0), CursorKind::RunningOffset)
            .unwrap();
        assert_eq!(line, None);
        assert_eq!(session.offset(file.path()), 8);
    }

    #[test]
    fn test_missing_file_times_out_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let file = LogFileRef::new(dir.path().join("never.log"));
        let mut session = fast_session();
        let line = session
            .wait_for("x", &file, Timeouts::from_millis(20), CursorKind::RunningOffset)
            .unwrap();
        assert_eq!(line, None);
    }

    #[test]
    fn test_invalid_pattern_rejected_before_waiting() {
        let (_dir, file) = log_with("");
        let mut session = fast_session();
        let err = session
            .wait_for("CWWKZ(", &file, Timeouts::from_millis(0), CursorKind::Mark)
            .unwrap_err();
        assert!(err.to_string().contains("CWWKZ("));
    }

    #[test]
    fn test_wait_for_each_reports_first_missing() {
        let (_dir, file) = log_with("CWWKZ0001I: alpha\nCWWKF0011I: ready\n");
        let mut session = fast_session();
        let t = Timeouts::from_millis(0);
        let lines = session.wait_for_each(&["CWWKF0011I", "CWWKZ0001I"], &file, t).unwrap();
        assert_eq!(lines, vec!["CWWKF0011I: ready", "CWWKZ0001I: alpha"]);

        let err = session
            .wait_for_each(&["CWWKZ0001I", "CWWKZ0002E", "CWWKZ0003I"], &file, t)
            .unwrap_err();
        assert!(err.to_string().contains("[CWWKZ0002E]"), "{err}");
    }

    #[test]
    fn test_count_reached_and_shortfall() {
        let (_dir, file) = log_with("hit\nmiss\nhit\nhit\n");
        let mut session = fast_session();
        let t = Timeouts::from_millis(0);
        assert_eq!(session.wait_for_count(2, "hit", &file, t, CursorKind::Mark).unwrap(), 2);
        assert_eq!(session.wait_for_count(5, "hit", &file, t, CursorKind::Mark).unwrap(), 3);
        assert_eq!(session.wait_for_count(0, "hit", &file, t, CursorKind::Mark).unwrap(), 1);
    }

    #[test]
    fn test_verify_absent() {
        let (_dir, file) = log_with("CWWKZ0001I: alpha\n");
        let mut session = fast_session();
        let d = Duration::from_millis(30);
        assert_eq!(session.verify_absent("CWWKZ0002E", &file, d).unwrap(), None);
        assert_eq!(
            session.verify_absent("alpha", &file, d).unwrap().as_deref(),
            Some("CWWKZ0001I: alpha")
        );
    }

    #[test]
    fn test_find_in_log_respects_mark() {
        let (_dir, file) = log_with("E1 early\nE2 late\n");
        let mut session = fast_session();
        session.set_mark(file.path(), 9);
        assert_eq!(session.find_in_log("E\\d", &file, CursorKind::Mark).unwrap(), vec!["E2 late"]);
        assert_eq!(session.find_in_log("E\\d", &file, CursorKind::RunningOffset).unwrap().len(), 2);
        assert_eq!(session.mark(file.path()), 9);
    }
}
