// LogMark - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogMark";

/// Application identifier used for config directories.
pub const APP_ID: &str = "LogMark";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Polling
// =============================================================================

/// Interval between two scans of a log file while a wait is in progress (ms).
/// Shared by every coordinator of a session.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Minimum configurable poll interval (ms).
pub const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Maximum configurable poll interval (ms).
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;

/// A progress line is logged every this many polls of a multi-pattern wait.
pub const PROGRESS_LOG_EVERY_POLLS: u32 = 10;

/// Maximum bytes read from a log in one read call. A scan over more new
/// content than this reads it in successive chunks, so a large backlog never
/// has to sit in memory at once.
pub const MAX_SCAN_READ_BYTES: usize = 512 * 1_024; // 512 KiB

// =============================================================================
// Timeouts
// =============================================================================

/// Intended timeout for a single log search (ms). Extended = 2x.
pub const DEFAULT_LOG_SEARCH_TIMEOUT_MS: u64 = 120_000;

/// Timeout for a configuration update wait (ms). Not two-tier.
pub const DEFAULT_CONFIG_UPDATE_TIMEOUT_MS: u64 = 180_000;

/// Intended timeout for application startup validation (ms). Extended = 2x.
pub const DEFAULT_APP_START_TIMEOUT_MS: u64 = 30_000;

/// Hard upper bound on any configured timeout (ms).
pub const MAX_TIMEOUT_MS: u64 = 3_600_000; // 1 h

/// Multiplier applied to an intended timeout to derive the extended one.
pub const EXTENDED_TIMEOUT_FACTOR: u32 = 2;

// =============================================================================
// Soft-timeout diagnostic ids
// =============================================================================

/// Reported when a single-pattern wait runs past its intended timeout.
pub const DIAG_SINGLE_WAIT_SLOW: u32 = 3906;

/// Reported when startup validation runs long: still-unstarted apps.
pub const DIAG_STARTUP_UNSTARTED: u32 = 1071;

/// Reported when startup validation runs long: failures seen so far.
pub const DIAG_STARTUP_FAILED: u32 = 1072;

/// Reported when a count wait runs past its intended timeout.
pub const DIAG_COUNT_WAIT_SLOW: u32 = 3907;

// =============================================================================
// Message codes
// =============================================================================

/// Prefix shared by every application manager message code.
pub const APP_MANAGER_PREFIX: &str = "CWWKZ";

/// Config update completed or no changes detected.
pub const CONFIG_UPDATE_DONE_PATTERN: &str = "CWWKG001[7-8]I";

/// Feature update started. Seen any number of times during a reload.
pub const FEATURE_UPDATE_STARTED_PATTERN: &str = "CWWKF0007I:";

/// Feature update completed.
pub const FEATURE_UPDATE_DONE_PATTERN: &str = "CWWKF0008I:";

/// Lines reporting an application (or resource adapter) being installed,
/// updated or stopped.
pub const INSTALLED_APP_PATTERN: &str = r"((CWWKZ0)|(J2CA7))00[139]I: ";

/// Suffix of the stop message within `INSTALLED_APP_PATTERN` lines.
pub const APP_STOPPED_MARKER: &str = "009I: ";

/// Severity letter marking an error code that is missing from the table.
pub const ERROR_SEVERITY_SUFFIX: char = 'E';

/// JSON key carrying the message text in JSON-format log lines.
pub const JSON_MESSAGE_KEY: &str = "message";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "logmark.toml";
