// LogMark - core/scanner.rs
//
// Line matching over a block of bytes read from a log file.
// Core layer: accepts bytes, never touches the filesystem directly.
//
// Only complete lines are consumed. Bytes after the final b'\n' belong to a
// line the server is still writing; they are left for the next scan so the
// line is reported exactly once, whole.

use crate::core::model::{LogFileRef, LogSearchResult, MaxMatches};
use crate::util::error::PatternError;
use regex::Regex;

/// Compile one caller-supplied pattern.
pub fn compile(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|e| PatternError::InvalidRegex {
        pattern: pattern.to_string(),
        source: e,
    })
}

/// Compile a list of patterns, failing on the first invalid one.
pub fn compile_all<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, PatternError> {
    patterns.iter().map(|p| compile(p.as_ref())).collect()
}

/// Scan `bytes`, which start at byte `base_offset` of `file`, for lines
/// matching any of `patterns`.
///
/// Stops as soon as `max_matches` lines have matched; the returned offset is
/// then just past the last matching line. Otherwise it is just past the last
/// complete line in `bytes`.
pub fn scan_bytes(
    bytes: &[u8],
    base_offset: u64,
    file: &LogFileRef,
    patterns: &[Regex],
    max_matches: MaxMatches,
) -> LogSearchResult {
    let mut result = LogSearchResult::empty_at(base_offset);
    let mut consumed = 0usize;

    while let Some(nl) = bytes[consumed..].iter().position(|&b| b == b'\n') {
        let mut raw = &bytes[consumed..consumed + nl];
        if let Some(stripped) = raw.strip_suffix(b"\r") {
            raw = stripped;
        }
        consumed += nl + 1;

        let line = file.decode(raw).into_owned();
        if result.first_line.is_none() {
            result.first_line = Some(line.clone());
        }
        if patterns.iter().any(|p| p.is_match(&line)) {
            result.matches.push(line.clone());
        }
        result.last_line = Some(line);

        if max_matches.reached(result.matches.len()) {
            break;
        }
    }

    result.offset = base_offset + consumed as u64;
    result
}
