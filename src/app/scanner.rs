// LogMark - app/scanner.rs
//
// One scan of a log file: stat, read from an offset to the current end,
// hand the bytes to core::scanner.
//
// A file shorter than the requested offset was truncated or rotated; the scan
// restarts from byte 0 so the rewritten content is picked up.
//
// New content is read in chunks of at most MAX_SCAN_READ_BYTES. A chunk that
// holds no complete line is re-read with a doubled limit.

use crate::core::model::{LogFileRef, LogSearchResult, MaxMatches};
use crate::core::scanner;
use crate::platform::fs;
use crate::util::constants::MAX_SCAN_READ_BYTES;
use crate::util::error::ScanError;
use regex::Regex;

fn io_error(file: &LogFileRef, source: std::io::Error) -> ScanError {
    ScanError::Io {
        path: file.path().to_path_buf(),
        source,
    }
}

/// Scan `file` from `from_offset` to its current end for lines matching
/// any of `patterns`.
pub fn scan(
    file: &LogFileRef,
    patterns: &[Regex],
    from_offset: u64,
    max_matches: MaxMatches,
) -> Result<LogSearchResult, ScanError> {
    scan_chunked(file, patterns, from_offset, max_matches, MAX_SCAN_READ_BYTES)
}

fn scan_chunked(
    file: &LogFileRef,
    patterns: &[Regex],
    from_offset: u64,
    max_matches: MaxMatches,
    chunk_bytes: usize,
) -> Result<LogSearchResult, ScanError> {
    let current_size = fs::file_len(file.path()).map_err(|e| io_error(file, e))?;

    let mut offset = from_offset;
    if current_size < offset {
        tracing::info!(
            file = %file,
            old_offset = offset,
            new_size = current_size,
            "File truncated or rotated, rescanning from 0"
        );
        offset = 0;
    }

    let mut result = LogSearchResult::empty_at(offset);
    let mut read_limit = chunk_bytes.max(1);
    while result.offset < current_size && !max_matches.reached(result.matches.len()) {
        let available = current_size - result.offset;
        let limit = available.min(read_limit as u64) as usize;
        let bytes = fs::read_at(file.path(), result.offset, limit).map_err(|e| io_error(file, e))?;

        let chunk = scanner::scan_bytes(
            &bytes,
            result.offset,
            file,
            patterns,
            max_matches.remaining(result.matches.len()),
        );
        if chunk.offset == result.offset {
            // No complete line in this chunk.
            if bytes.len() == limit && (limit as u64) < available {
                read_limit = read_limit.saturating_mul(2);
                continue;
            }
            break;
        }
        result.append(chunk);
        read_limit = chunk_bytes.max(1);
    }

    tracing::trace!(
        file = %file,
        from = offset,
        to = result.offset,
        matches = result.matches.len(),
        "Scanned"
    );
    Ok(result)
}
