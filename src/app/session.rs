// LogMark - app/session.rs
//
// The session that every wait runs on. It owns the per-file cursors, the
// polling and timeout settings, and the soft-timeout reporter.
//
// Waits take `&mut self`, so one session serves one driver thread at a time.
// Parallel waits need one session per thread.
//
// The wait operations themselves live in app::wait, app::config_update and
// app::startup as further `impl LogSession` blocks.

use crate::app::offsets::OffsetStore;
use crate::app::report::{SoftTimeout, SoftTimeoutReporter, TracingReporter};
use crate::core::model::{CursorKind, LogFileRef};
use crate::platform::config::AppConfig;
use crate::platform::fs;
use crate::util::error::ScanError;
use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

// =============================================================================
// Wait configuration
// =============================================================================

/// Session-wide polling and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    /// Sleep between two scans. Shared by every wait on the session.
    pub poll_interval: Duration,
    /// Intended timeout of single-pattern waits started from the CLI or the
    /// `*_default` helpers.
    pub log_search_timeout: Duration,
    /// Timeout of configuration update waits.
    pub config_update_timeout: Duration,
    /// Intended timeout of application startup validation.
    pub app_start_timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for WaitConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            log_search_timeout: Duration::from_millis(config.log_search_timeout_ms),
            config_update_timeout: Duration::from_millis(config.config_update_timeout_ms),
            app_start_timeout: Duration::from_millis(config.app_start_timeout_ms),
        }
    }
}

impl WaitConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_config_update_timeout(mut self, timeout: Duration) -> Self {
        self.config_update_timeout = timeout;
        self
    }
}

// =============================================================================
// LogSession
// =============================================================================

pub struct LogSession {
    offsets: OffsetStore,
    config: WaitConfig,
    reporter: Box<dyn SoftTimeoutReporter>,
}

impl fmt::Debug for LogSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSession")
            .field("offsets", &self.offsets)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for LogSession {
    fn default() -> Self {
        Self::new(WaitConfig::default())
    }
}

impl LogSession {
    /// A session reporting soft timeouts through `tracing`.
    pub fn new(config: WaitConfig) -> Self {
        Self {
            offsets: OffsetStore::new(),
            config,
            reporter: Box::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: impl SoftTimeoutReporter + 'static) -> Self {
        self.reporter = Box::new(reporter);
        self
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Cursors
    // -------------------------------------------------------------------------

    pub fn offset(&mut self, path: &Path) -> u64 {
        self.offsets.offset(path)
    }

    pub fn update_offset(&mut self, path: &Path, offset: u64) {
        self.offsets.update_offset(path, offset);
    }

    pub fn mark(&mut self, path: &Path) -> u64 {
        self.offsets.mark(path)
    }

    pub fn set_mark(&mut self, path: &Path, offset: u64) {
        tracing::debug!(file = %path.display(), offset, "Mark set");
        self.offsets.set_mark(path, offset);
    }

    /// Move each file's mark to its current end so later mark waits only see
    /// lines written from now on. A file that does not exist yet gets mark 0.
    pub fn set_mark_to_end_of_log(&mut self, files: &[LogFileRef]) -> Result<(), ScanError> {
        for file in files {
            let len = fs::file_len_or_zero(file.path()).map_err(|e| ScanError::Io {
                path: file.path().to_path_buf(),
                source: e,
            })?;
            self.set_mark(file.path(), len);
        }
        Ok(())
    }

    /// Forget every offset and mark.
    pub fn reset_offsets(&mut self) {
        tracing::debug!(files = self.offsets.tracked_files(), "Offsets and marks reset");
        self.offsets.reset();
    }

    pub(crate) fn cursor(&mut self, path: &Path, cursor: CursorKind) -> u64 {
        self.offsets.get(path, cursor)
    }

    /// Persist where a wait got to. Only the running offset moves; the mark
    /// is changed by explicit calls alone.
    pub(crate) fn advance(&mut self, path: &Path, cursor: CursorKind, offset: u64) {
        if cursor == CursorKind::RunningOffset {
            self.offsets.update_offset(path, offset);
        }
    }

    // -------------------------------------------------------------------------
    // Loop helpers
    // -------------------------------------------------------------------------

    pub(crate) fn report(&self, timeout: SoftTimeout) {
        self.reporter.report(&timeout);
    }

    pub(crate) fn sleep_poll(&self) {
        std::thread::sleep(self.config.poll_interval);
    }
}

/// Wall-clock bookkeeping for one wait.
#[derive(Debug)]
pub(crate) struct WaitClock {
    started: Instant,
    soft_reported: bool,
}

impl WaitClock {
    pub(crate) fn start(operation: &str, file: &LogFileRef, target: &str) -> Self {
        tracing::info!(
            operation,
            file = %file,
            encoding = file.encoding_name(),
            target,
            at = %chrono::Local::now().format("%H:%M:%S%.3f"),
            "Wait started"
        );
        Self {
            started: Instant::now(),
            soft_reported: false,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// True exactly once: the first time `elapsed` exceeds `intended`.
    pub(crate) fn crossed_soft(&mut self, elapsed: Duration, intended: Duration) -> bool {
        if !self.soft_reported && elapsed > intended {
            self.soft_reported = true;
            return true;
        }
        false
    }

    pub(crate) fn finish(&self, operation: &str, outcome: &str) {
        tracing::info!(
            operation,
            outcome,
            elapsed_ms = self.elapsed().as_millis() as u64,
            at = %chrono::Local::now().format("%H:%M:%S%.3f"),
            "Wait finished"
        );
    }
}

/// Default session from a validated config file.
impl From<&AppConfig> for LogSession {
    fn from(config: &AppConfig) -> Self {
        Self::new(WaitConfig::from(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::constants;

    #[test]
    fn test_wait_config_from_app_config() {
        let app = AppConfig {
            poll_interval_ms: 25,
            app_start_timeout_ms: 500,
            ..AppConfig::default()
        };
        let config = WaitConfig::from(&app);
        assert_eq!(config.poll_interval, Duration::from_millis(25));
        assert_eq!(config.app_start_timeout, Duration::from_millis(500));
        assert_eq!(
            WaitConfig::default().poll_interval,
            Duration::from_millis(constants::DEFAULT_POLL_INTERVAL_MS)
        );
    }

    #[test]
    fn test_mark_to_end_of_log() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("messages.log");
        std::fs::write(&present, "line one\nline two\n").unwrap();
        let absent = dir.path().join("trace.log");

        let mut session = LogSession::default();
        session
            .set_mark_to_end_of_log(&[LogFileRef::new(&present), LogFileRef::new(&absent)])
            .unwrap();
        assert_eq!(session.mark(&present), 18);
        assert_eq!(session.mark(&absent), 0);
        assert_eq!(session.offset(&present), 0);
    }

    #[test]
    fn test_advance_never_moves_mark() {
        let mut session = LogSession::default();
        let path = Path::new("messages.log");
        session.set_mark(path, 7);
        session.advance(path, CursorKind::Mark, 99);
        assert_eq!(session.mark(path), 7);
        assert_eq!(session.offset(path), 0);
        session.advance(path, CursorKind::RunningOffset, 99);
        assert_eq!(session.offset(path), 99);
    }

    #[test]
    fn test_wait_start_logs_encoding() {
        let file = LogFileRef::with_encoding("console.log", "windows-1252").unwrap();
        let (_, output) = crate::util::logging::capture(|| {
            WaitClock::start("wait_for", &file, "CWWKF0011I");
        });
        assert!(output.contains("Wait started"), "{output}");
        assert!(output.contains("encoding=\"windows-1252\""), "{output}");
    }

    #[test]
    fn test_soft_crossing_reported_once() {
        let file = LogFileRef::new("messages.log");
        let mut clock = WaitClock::start("test", &file, "x");
        let intended = Duration::from_millis(10);
        assert!(!clock.crossed_soft(Duration::from_millis(5), intended));
        assert!(clock.crossed_soft(Duration::from_millis(11), intended));
        assert!(!clock.crossed_soft(Duration::from_millis(50), intended));
    }
}
