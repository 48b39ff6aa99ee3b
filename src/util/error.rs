// LogMark - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// Every wait failure names what was still outstanding so a failing test
// reads as a diagnosis without opening the raw log.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogMark operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogMarkError {
    /// A caller-supplied pattern did not compile.
    Pattern(PatternError),

    /// Reading a log file failed.
    Scan(ScanError),

    /// A wait ended without its completion condition being met.
    Wait(WaitError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for LogMarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(e) => write!(f, "Pattern error: {e}"),
            Self::Scan(e) => write!(f, "Scan error: {e}"),
            Self::Wait(e) => write!(f, "Wait failed: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for LogMarkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pattern(e) => Some(e),
            Self::Scan(e) => Some(e),
            Self::Wait(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern errors
// ---------------------------------------------------------------------------

/// Errors compiling a caller-supplied regular expression.
#[derive(Debug)]
pub enum PatternError {
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRegex { pattern, source } => {
                write!(f, "Invalid regex '{pattern}': {source}")
            }
        }
    }
}

impl std::error::Error for PatternError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRegex { source, .. } => Some(source),
        }
    }
}

impl From<PatternError> for LogMarkError {
    fn from(e: PatternError) -> Self {
        Self::Pattern(e)
    }
}

// ---------------------------------------------------------------------------
// Scan errors
// ---------------------------------------------------------------------------

/// Errors reading a log file.
///
/// Inside a wait loop these are never fatal: the producing process may not
/// have created the file yet, so the poll is treated as "nothing new".
#[derive(Debug)]
pub enum ScanError {
    /// The log file could not be opened, sized, or read.
    Io { path: PathBuf, source: io::Error },

    /// The requested encoding is unknown or cannot be split on b'\n'.
    UnsupportedEncoding { label: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "'{}': I/O error: {source}", path.display())
            }
            Self::UnsupportedEncoding { label } => write!(
                f,
                "Encoding '{label}' is not supported. \
                 Only ASCII-compatible encodings can be scanned line by line."
            ),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::UnsupportedEncoding { .. } => None,
        }
    }
}

impl From<ScanError> for LogMarkError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

// ---------------------------------------------------------------------------
// Wait errors
// ---------------------------------------------------------------------------

/// A wait reached its hard timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// A single pattern never appeared.
    NotFound { pattern: String, file: PathBuf },

    /// A multi-pattern wait timed out with patterns and/or applications
    /// still outstanding.
    Outstanding {
        file: PathBuf,
        patterns: Vec<String>,
        apps: Vec<String>,
    },

    /// Startup validation saw no failure but these apps never started.
    AppsNotStarted { file: PathBuf, apps: Vec<String> },

    /// Startup validation recorded failures. Each entry is one rendered
    /// failure line, attributed to an application or to the app manager.
    AppFailures { file: PathBuf, failures: Vec<String> },
}

fn plural(count: usize) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { pattern, file } => write!(
                f,
                "Failed to find [{pattern}] in log file '{}'",
                file.display()
            ),
            Self::Outstanding {
                file,
                patterns,
                apps,
            } => write!(
                f,
                "Timed out waiting for {apps:?} and/or searching for {patterns:?} \
                 in log file '{}'. Patterns outstanding: {}, apps outstanding: {}",
                file.display(),
                !patterns.is_empty(),
                !apps.is_empty(),
            ),
            Self::AppsNotStarted { file, apps } => write!(
                f,
                "Timed out waiting for application{} {apps:?} to start (log file '{}').",
                plural(apps.len()),
                file.display()
            ),
            Self::AppFailures { file, failures } => {
                write!(
                    f,
                    "Failures occurred while waiting for app{} to start (log file '{}'):",
                    plural(failures.len()),
                    file.display()
                )?;
                for failure in failures {
                    write!(f, "\n  {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for WaitError {}

impl From<WaitError> for LogMarkError {
    fn from(e: WaitError) -> Self {
        Self::Wait(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogMarkError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogMark results.
pub type Result<T> = std::result::Result<T, LogMarkError>;
