// LogMark - platform/config.rs
//
// Config directory resolution and logmark.toml loading with validation
// against the named constants in util::constants.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogMark configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logmark/ or %APPDATA%\LogMark\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of logmark.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// logmark.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of logmark.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[timeouts]` section.
    pub timeouts: TimeoutsSection,
    /// `[polling]` section.
    pub polling: PollingSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[timeouts]` config section. All values in milliseconds.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct TimeoutsSection {
    /// Intended timeout of a single log search.
    pub log_search_ms: Option<u64>,
    /// Timeout of a configuration update wait.
    pub config_update_ms: Option<u64>,
    /// Intended timeout of application startup validation.
    pub app_start_ms: Option<u64>,
}

/// `[polling]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct PollingSection {
    /// Sleep between two scans of a log file.
    pub interval_ms: Option<u64>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated configuration derived from logmark.toml.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_search_timeout_ms: u64,
    pub config_update_timeout_ms: u64,
    pub app_start_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_search_timeout_ms: constants::DEFAULT_LOG_SEARCH_TIMEOUT_MS,
            config_update_timeout_ms: constants::DEFAULT_CONFIG_UPDATE_TIMEOUT_MS,
            app_start_timeout_ms: constants::DEFAULT_APP_START_TIMEOUT_MS,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
            log_level: None,
        }
    }
}

/// Load and validate logmark.toml from the given config directory.
pub fn load_config(config_dir: &Path) -> (AppConfig, Vec<String>) {
    load_config_file(&config_dir.join(constants::CONFIG_FILE_NAME))
}

/// Load and validate a config file at an explicit path.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings.
/// If the file is unreadable or unparseable, returns defaults with a warning.
pub fn load_config_file(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No logmark.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    match load_config_strict(config_path) {
        Ok(loaded) => loaded,
        Err(e) => {
            let msg = format!("{e}. Using defaults.");
            tracing::warn!("{}", msg);
            (AppConfig::default(), vec![msg])
        }
    }
}

/// Load a config file the caller named explicitly. A missing or
/// unparseable file is an error rather than a fallback to defaults;
/// out-of-range values still only warn.
pub fn load_config_strict(config_path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    let raw: RawConfig = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
        path: config_path.to_path_buf(),
        source: e,
    })?;

    tracing::info!(path = %config_path.display(), "Loaded logmark.toml");

    let mut warnings = Vec::new();
    let config = validate(raw, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    Ok((config, warnings))
}

/// Accept `value` when it lies in `min..=max`, otherwise record a warning.
fn checked_ms(
    value: Option<u64>,
    field: &str,
    min: u64,
    max: u64,
    default: u64,
    warnings: &mut Vec<String>,
) -> u64 {
    match value {
        Some(v) if (min..=max).contains(&v) => v,
        Some(v) => {
            warnings.push(format!(
                "{field} = {v} is out of range ({min}-{max}). Using default ({default})."
            ));
            default
        }
        None => default,
    }
}

/// Validate each field against named constants, accumulating all warnings.
fn validate(raw: RawConfig, warnings: &mut Vec<String>) -> AppConfig {
    let defaults = AppConfig::default();

    let log_search_timeout_ms = checked_ms(
        raw.timeouts.log_search_ms,
        "[timeouts] log_search_ms",
        0,
        constants::MAX_TIMEOUT_MS,
        defaults.log_search_timeout_ms,
        warnings,
    );
    let config_update_timeout_ms = checked_ms(
        raw.timeouts.config_update_ms,
        "[timeouts] config_update_ms",
        0,
        constants::MAX_TIMEOUT_MS,
        defaults.config_update_timeout_ms,
        warnings,
    );
    let app_start_timeout_ms = checked_ms(
        raw.timeouts.app_start_ms,
        "[timeouts] app_start_ms",
        0,
        constants::MAX_TIMEOUT_MS,
        defaults.app_start_timeout_ms,
        warnings,
    );
    let poll_interval_ms = checked_ms(
        raw.polling.interval_ms,
        "[polling] interval_ms",
        constants::MIN_POLL_INTERVAL_MS,
        constants::MAX_POLL_INTERVAL_MS,
        defaults.poll_interval_ms,
        warnings,
    );

    let mut log_level = None;
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    AppConfig {
        log_search_timeout_ms,
        config_update_timeout_ms,
        app_start_timeout_ms,
        poll_interval_ms,
        log_level,
    }
}
