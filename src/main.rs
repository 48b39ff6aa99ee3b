// LogMark - main.rs
//
// CLI entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading (explicit --config path or the platform default)
// 3. Logging initialisation (debug mode support)
// 4. Running one wait and mapping its outcome to an exit code
//
// Exit codes: 0 the wait succeeded, 1 the wait failed or timed out,
// 2 usage, pattern or configuration error.

use clap::{Parser, Subcommand};
use logmark::core::model::{CursorKind, LogFileRef, Timeouts};
use logmark::platform::config::{self, AppConfig, PlatformPaths};
use logmark::util::constants;
use logmark::util::error::{ConfigError, LogMarkError, Result};
use logmark::{util, LogSession, WaitConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// LogMark - wait on server log files from test scripts.
///
/// Each subcommand blocks until the log shows what it waits for, or its
/// timeout passes.
#[derive(Parser, Debug)]
#[command(name = "logmark", version, about)]
struct Cli {
    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    /// Config file to use instead of the platform default logmark.toml.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Character encoding of the log file, e.g. windows-1252.
    #[arg(short = 'e', long = "encoding", global = true)]
    encoding: Option<String>,

    /// Only consider lines written after the command starts.
    #[arg(long = "from-end", global = true)]
    from_end: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait for a line matching REGEX; print it.
    Wait {
        file: PathBuf,
        regex: String,
        /// Intended timeout; the wait gives up at twice this.
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Wait for at least N lines matching REGEX; print the count reached.
    Count {
        file: PathBuf,
        regex: String,
        n: usize,
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Fail if a line matching REGEX appears within the given time.
    Absent {
        file: PathBuf,
        regex: String,
        #[arg(long = "for-ms")]
        for_ms: u64,
    },
    /// Validate that the named applications start.
    Apps {
        file: PathBuf,
        #[arg(required = true)]
        names: Vec<String>,
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
    /// Wait for a configuration update to finish.
    ConfigUpdate {
        file: PathBuf,
        /// Additional patterns that must also appear.
        regex: Vec<String>,
        /// Application that must be installed (repeatable).
        #[arg(long = "app")]
        apps: Vec<String>,
        /// Also wait for a feature update to complete.
        #[arg(long = "require-feature-update")]
        require_feature_update: bool,
    },
}

/// Reject CLI timeouts beyond the configured maximum.
fn checked_timeout(field: &str, value: Option<u64>, default: Duration) -> Result<Duration> {
    match value {
        None => Ok(default),
        Some(ms) if ms <= constants::MAX_TIMEOUT_MS => Ok(Duration::from_millis(ms)),
        Some(ms) => Err(ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value: ms.to_string(),
            expected: format!("0-{}", constants::MAX_TIMEOUT_MS),
        }
        .into()),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<(AppConfig, Vec<String>)> {
    match explicit {
        Some(path) => Ok(config::load_config_strict(path)?),
        None => Ok(config::load_config(&PlatformPaths::resolve().config_dir)),
    }
}

/// Run the selected subcommand. `Ok(false)` means the wait itself failed.
fn run(cli: &Cli, session: &mut LogSession) -> Result<bool> {
    let file_ref = |path: &Path| -> Result<LogFileRef> {
        match &cli.encoding {
            Some(label) => Ok(LogFileRef::with_encoding(path, label)?),
            None => Ok(LogFileRef::new(path)),
        }
    };
    let prepare = |session: &mut LogSession, path: &Path| -> Result<LogFileRef> {
        let file = file_ref(path)?;
        if cli.from_end {
            session.set_mark_to_end_of_log(std::slice::from_ref(&file))?;
        }
        Ok(file)
    };

    match &cli.command {
        Command::Wait {
            file,
            regex,
            timeout_ms,
        } => {
            let file = prepare(session, file)?;
            let intended =
                checked_timeout("--timeout-ms", *timeout_ms, session.config().log_search_timeout)?;
            match session.wait_for(regex, &file, Timeouts::new(intended), CursorKind::Mark)? {
                Some(line) => {
                    println!("{line}");
                    Ok(true)
                }
                None => {
                    eprintln!("Error: pattern [{regex}] not found in {file}");
                    Ok(false)
                }
            }
        }
        Command::Count {
            file,
            regex,
            n,
            timeout_ms,
        } => {
            let file = prepare(session, file)?;
            let intended =
                checked_timeout("--timeout-ms", *timeout_ms, session.config().log_search_timeout)?;
            let seen =
                session.wait_for_count(*n, regex, &file, Timeouts::new(intended), CursorKind::Mark)?;
            println!("{seen}");
            Ok(seen >= (*n).max(1))
        }
        Command::Absent {
            file,
            regex,
            for_ms,
        } => {
            let file = prepare(session, file)?;
            let duration = checked_timeout("--for-ms", Some(*for_ms), Duration::ZERO)?;
            match session.verify_absent(regex, &file, duration)? {
                Some(line) => {
                    eprintln!("Error: unexpected line in {file}: {line}");
                    Ok(false)
                }
                None => Ok(true),
            }
        }
        Command::Apps {
            file,
            names,
            timeout_ms,
        } => {
            let file = file_ref(file)?;
            let intended =
                checked_timeout("--timeout-ms", *timeout_ms, session.config().app_start_timeout)?;
            session.validate_app_startup(names.as_slice(), &file, intended)?;
            Ok(true)
        }
        Command::ConfigUpdate {
            file,
            regex,
            apps,
            require_feature_update,
        } => {
            let file = prepare(session, file)?;
            for line in session.wait_for_config_update(
                &file,
                apps.as_slice(),
                *require_feature_update,
                regex.as_slice(),
            )? {
                println!("{line}");
            }
            Ok(true)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(cli.config.as_deref());
    let level = loaded
        .as_ref()
        .ok()
        .and_then(|(config, _)| config.log_level.clone());

    // Initialise logging subsystem
    util::logging::init(cli.debug, level.as_deref());

    let (app_config, warnings) = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            eprintln!("Error: {e}");
            return ExitCode::from(2);
        }
    };
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "{} starting",
        constants::APP_NAME
    );

    let mut session = LogSession::new(WaitConfig::from(&app_config));

    match run(&cli, &mut session) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(LogMarkError::Wait(e)) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}
