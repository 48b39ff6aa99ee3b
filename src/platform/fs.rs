// LogMark - platform/fs.rs
//
// Read-only access to the observed log files. The server owns these files;
// nothing here ever opens one for writing.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Current length of `path` in bytes.
pub fn file_len(path: &Path) -> io::Result<u64> {
    std::fs::metadata(path).map(|m| m.len())
}

/// Length of `path`, or 0 when it does not exist yet.
pub fn file_len_or_zero(path: &Path) -> io::Result<u64> {
    match file_len(path) {
        Ok(len) => Ok(len),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Read up to `limit` bytes starting at byte position `offset`.
///
/// The file may still be growing; fewer than `limit` bytes come back when
/// the read reaches the current end of file.
pub fn read_at(path: &Path, offset: u64, limit: usize) -> io::Result<Vec<u8>> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
