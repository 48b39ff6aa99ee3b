// LogMark - tests/common/mod.rs
//
// Shared helpers for the end-to-end tests: temp log files, a background
// writer that appends lines on a schedule, and a reporter that records
// soft-timeout diagnostics.

#![allow(dead_code)]

use logmark::{LogFileRef, LogSession, SoftTimeout, SoftTimeoutReporter, WaitConfig};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Poll interval used by every e2e session.
pub const TEST_POLL: Duration = Duration::from_millis(10);

/// Records the diagnostic id of every soft timeout it is given.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    ids: Arc<Mutex<Vec<u32>>>,
}

impl RecordingReporter {
    pub fn ids(&self) -> Vec<u32> {
        self.ids.lock().unwrap().clone()
    }
}

impl SoftTimeoutReporter for RecordingReporter {
    fn report(&self, timeout: &SoftTimeout) {
        if let Ok(mut ids) = self.ids.lock() {
            ids.push(timeout.diagnostic_id);
        }
    }
}

/// A session with a short poll interval and a recording reporter.
pub fn session() -> (LogSession, RecordingReporter) {
    let reporter = RecordingReporter::default();
    let session = LogSession::new(WaitConfig::default().with_poll_interval(TEST_POLL))
        .with_reporter(reporter.clone());
    (session, reporter)
}

/// A log file inside a fresh temp directory, created with `content`.
pub fn log_file(content: &str) -> (tempfile::TempDir, LogFileRef) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("messages.log");
    std::fs::write(&path, content).unwrap();
    (dir, LogFileRef::new(path))
}

/// Append raw text to `path`, as the server would.
pub fn append(path: &Path, text: &str) {
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(text.as_bytes()).unwrap();
    f.flush().unwrap();
}

/// Append each `(delay_ms, text)` after sleeping `delay_ms` since the
/// previous write, on a background thread.
pub fn write_later(path: &Path, schedule: &[(u64, &str)]) -> JoinHandle<()> {
    let path: PathBuf = path.to_path_buf();
    let schedule: Vec<(u64, String)> = schedule
        .iter()
        .map(|(delay, text)| (*delay, text.to_string()))
        .collect();
    std::thread::spawn(move || {
        for (delay, text) in schedule {
            std::thread::sleep(Duration::from_millis(delay));
            append(&path, &text);
        }
    })
}
