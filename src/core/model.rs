// LogMark - core/model.rs
//
// Core data model types. Pure data definitions with no file I/O.
// These types are the shared vocabulary across all layers.

use crate::util::constants::EXTENDED_TIMEOUT_FACTOR;
use crate::util::error::ScanError;
use encoding_rs::Encoding;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// Log file reference
// =============================================================================

/// Identifies a text log by path plus the character encoding of its bytes.
///
/// Immutable once constructed. `None` means UTF-8 (decoded lossily so a
/// stray invalid byte never aborts a wait).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileRef {
    path: PathBuf,
    encoding: Option<&'static Encoding>,
}

impl LogFileRef {
    /// Reference a UTF-8 log file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: None,
        }
    }

    /// Reference a log written in a legacy encoding, e.g. `"windows-1252"`
    /// for a console log on a platform whose default code page is not UTF-8.
    ///
    /// Lines are split on the `\n` byte before decoding, so only
    /// ASCII-compatible encodings are accepted.
    pub fn with_encoding(path: impl Into<PathBuf>, label: &str) -> Result<Self, ScanError> {
        let encoding = Encoding::for_label(label.as_bytes())
            .filter(|e| e.is_ascii_compatible())
            .ok_or_else(|| ScanError::UnsupportedEncoding {
                label: label.to_string(),
            })?;
        let encoding = if encoding == encoding_rs::UTF_8 {
            None
        } else {
            Some(encoding)
        };
        Ok(Self {
            path: path.into(),
            encoding,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical name of the encoding in use.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.map(|e| e.name()).unwrap_or("UTF-8")
    }

    /// Decode one line's bytes into text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.encoding {
            Some(encoding) => encoding.decode_without_bom_handling(bytes).0,
            None => String::from_utf8_lossy(bytes),
        }
    }
}

impl fmt::Display for LogFileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// =============================================================================
// Cursors
// =============================================================================

/// Which of the two per-file cursors a wait starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CursorKind {
    /// The caller-set checkpoint. Waits read it but never move it.
    Mark,
    /// The auto-advancing offset: each wait resumes where the last one
    /// stopped and stores where it got to.
    RunningOffset,
}

impl fmt::Display for CursorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorKind::Mark => f.write_str("mark"),
            CursorKind::RunningOffset => f.write_str("running offset"),
        }
    }
}

// =============================================================================
// Timeouts
// =============================================================================

/// Two-tier timeout: exceeding `intended` is reported as a soft failure and
/// the wait carries on; exceeding `extended` ends the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub intended: Duration,
    pub extended: Duration,
}

impl Timeouts {
    /// Intended timeout with the conventional extended timeout of twice that.
    pub fn new(intended: Duration) -> Self {
        Self {
            intended,
            extended: intended.saturating_mul(EXTENDED_TIMEOUT_FACTOR),
        }
    }

    pub fn from_millis(intended_ms: u64) -> Self {
        Self::new(Duration::from_millis(intended_ms))
    }

    /// Explicit intended and extended timeouts.
    pub fn with_extended(intended: Duration, extended: Duration) -> Self {
        Self { intended, extended }
    }
}

// =============================================================================
// Scan results
// =============================================================================

/// Upper bound on the number of matches one scan collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxMatches {
    Limit(usize),
    /// Scan all complete lines currently in the file.
    Unbounded,
}

impl MaxMatches {
    /// Returns true once `count` matches satisfy this bound.
    pub fn reached(self, count: usize) -> bool {
        match self {
            MaxMatches::Limit(limit) => count >= limit,
            MaxMatches::Unbounded => false,
        }
    }

    /// The bound left after `count` matches have been collected.
    pub fn remaining(self, count: usize) -> Self {
        match self {
            MaxMatches::Limit(limit) => MaxMatches::Limit(limit.saturating_sub(count)),
            MaxMatches::Unbounded => MaxMatches::Unbounded,
        }
    }
}

/// Outcome of scanning a log from an offset to its current end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSearchResult {
    /// Matching lines in file order, without line terminators.
    pub matches: Vec<String>,
    /// Offset to resume from: just past the last line consumed.
    pub offset: u64,
    /// First complete line inspected by this scan.
    pub first_line: Option<String>,
    /// Last complete line inspected by this scan. `None` when the scan found
    /// no new complete line.
    pub last_line: Option<String>,
}

impl LogSearchResult {
    /// An empty result that leaves the cursor at `offset`.
    pub fn empty_at(offset: u64) -> Self {
        Self {
            offset,
            ..Default::default()
        }
    }

    /// Fold in the result of scanning the bytes that follow this one.
    pub fn append(&mut self, next: LogSearchResult) {
        self.matches.extend(next.matches);
        self.offset = next.offset;
        if self.first_line.is_none() {
            self.first_line = next.first_line;
        }
        if next.last_line.is_some() {
            self.last_line = next.last_line;
        }
    }
}

/// The stretch of log text a multi-poll wait has looked at, for the
/// end-of-wait diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSpan {
    /// First line inspected by any poll.
    pub first_line: Option<String>,
    /// Last line inspected. Sticky: a poll that sees nothing new keeps it.
    pub last_line: Option<String>,
    /// Some poll found no new complete line, so `last_line` was the last
    /// text in the file at that point.
    pub reached_eof: bool,
}

impl SearchSpan {
    pub fn absorb(&mut self, result: &LogSearchResult) {
        if self.first_line.is_none() {
            self.first_line.clone_from(&result.first_line);
        }
        match &result.last_line {
            Some(line) => self.last_line = Some(line.clone()),
            None => self.reached_eof = true,
        }
    }
}
