// LogMark - core/startup.rs
//
// Application startup state machine. Turns classified app manager messages
// into two collections: applications not yet confirmed started, and
// failures recorded per application (or unattributed).
//
// Name resolution is first-found over the outstanding applications in name
// order. Callers must not supply names that are whole words of one another
// (e.g. "app" and "my app"); such ambiguity is not detected.

use crate::core::classify::{self, AppMessage, MessageEffect};
use crate::core::scanner;
use crate::util::constants::APP_STOPPED_MARKER;
use crate::util::error::{PatternError, WaitError};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

/// Where a recorded failure is filed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureBucket {
    App(String),
    /// Failures not attributable to a single application.
    Unattributed,
}

impl fmt::Display for FailureBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureBucket::App(name) => f.write_str(name),
            FailureBucket::Unattributed => f.write_str("*"),
        }
    }
}

/// Whole-word matcher for an application name.
pub fn app_name_pattern(name: &str) -> Result<Regex, PatternError> {
    scanner::compile(&format!(r"\b{}\b", regex::escape(name)))
}

/// Startup progress for one validation call.
#[derive(Debug, Clone)]
pub struct StartupState {
    unstarted: BTreeMap<String, Regex>,
    failed: BTreeMap<FailureBucket, Vec<String>>,
}

impl StartupState {
    pub fn new<I, S>(app_names: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let unstarted: BTreeMap<String, Regex> = app_names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let pattern = app_name_pattern(&name)?;
                Ok((name, pattern))
            })
            .collect::<Result<_, PatternError>>()?;
        Ok(Self {
            unstarted,
            failed: BTreeMap::new(),
        })
    }

    /// Find the outstanding application a message refers to.
    fn resolve(&self, text: &str) -> Option<String> {
        let found = self
            .unstarted
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(name, _)| name.clone());
        if found.is_none() {
            tracing::debug!(
                text = %crate::util::logging::preview(text),
                "No outstanding application named in message"
            );
        }
        found
    }

    fn record(&mut self, bucket: FailureBucket, failure: String) {
        self.failed.entry(bucket).or_default().push(failure);
    }

    /// Apply one parsed message.
    pub fn apply(&mut self, message: &AppMessage) -> MessageEffect {
        let effect = classify::effect_of(&message.code);
        tracing::trace!(code = %message.code, ?effect, "Classified app manager message");

        match effect {
            MessageEffect::RemoveFromUnstarted => {
                if let Some(name) = self.resolve(&message.remainder) {
                    self.unstarted.remove(&name);
                    tracing::debug!(app = %name, "Application started");
                }
            }
            MessageEffect::FailNamedApp => {
                if let Some(name) = self.resolve(&message.remainder) {
                    self.unstarted.remove(&name);
                    tracing::debug!(app = %name, code = %message.code, "Application failed");
                    self.record(FailureBucket::App(name), message.render());
                }
            }
            MessageEffect::FailAllUnresolved => {
                self.record(FailureBucket::Unattributed, message.render());
            }
            MessageEffect::Ignore => {}
        }
        effect
    }

    /// Parse and apply one raw log line.
    pub fn apply_line(&mut self, line: &str, prefix: &str) -> Option<MessageEffect> {
        let message = classify::parse_line(line, prefix)?;
        Some(self.apply(&message))
    }

    /// Every application has either started or failed.
    pub fn is_settled(&self) -> bool {
        self.unstarted.is_empty()
    }

    pub fn unstarted(&self) -> Vec<String> {
        self.unstarted.keys().cloned().collect()
    }

    pub fn failures(&self) -> &BTreeMap<FailureBucket, Vec<String>> {
        &self.failed
    }

    /// Rendered failure lines, one per recorded failure.
    pub fn failure_lines(&self) -> Vec<String> {
        self.failed
            .iter()
            .flat_map(|(bucket, failures)| {
                failures.iter().map(move |failure| match bucket {
                    FailureBucket::App(name) => format!("Application {name} failure: {failure}"),
                    FailureBucket::Unattributed => format!("App Manager Failure: {failure}"),
                })
            })
            .collect()
    }

    /// Final verdict. Failures take precedence over silence: an app that
    /// neither started nor failed is only reported when nothing failed.
    pub fn verdict(&self, file: &Path) -> Result<(), WaitError> {
        if !self.failed.is_empty() {
            return Err(WaitError::AppFailures {
                file: file.to_path_buf(),
                failures: self.failure_lines(),
            });
        }
        if !self.unstarted.is_empty() {
            return Err(WaitError::AppsNotStarted {
                file: file.to_path_buf(),
                apps: self.unstarted(),
            });
        }
        Ok(())
    }
}

/// Running install count per application name, fed by start/update/stop
/// message lines. Names match as whole words, like `StartupState`.
#[derive(Debug, Clone, Default)]
pub struct InstalledApps {
    counters: BTreeMap<String, (Regex, i64)>,
}

impl InstalledApps {
    pub fn new<I, S>(names: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let counters = names
            .into_iter()
            .map(|name| {
                let name = name.into();
                let pattern = app_name_pattern(&name)?;
                Ok((name, (pattern, 0)))
            })
            .collect::<Result<BTreeMap<_, _>, PatternError>>()?;
        Ok(Self { counters })
    }

    /// Count one install/update (+1) or stop (-1) line.
    pub fn observe(&mut self, line: &str) {
        let delta = if line.contains(APP_STOPPED_MARKER) { -1 } else { 1 };
        for (pattern, count) in self.counters.values_mut() {
            if pattern.is_match(line) {
                *count += delta;
            }
        }
    }

    /// Names currently counted as installed.
    pub fn installed(&self) -> BTreeSet<String> {
        self.counters
            .iter()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const PREFIX: &str = "CWWKZ";

    #[test]
    fn test_started_app_removed() {
        let mut state = StartupState::new(["alpha", "beta"]).unwrap();
        state.apply_line("CWWKZ0001I: Application alpha started in 0.5 seconds.", PREFIX);
        assert_eq!(state.unstarted(), vec!["beta"]);
        assert!(!state.is_settled());
    }

    #[test]
    fn test_named_failure_is_terminal() {
        let mut state = StartupState::new(["alpha", "beta"]).unwrap();
        state.apply_line("CWWKZ0001I: Application alpha started in 0.5 seconds.", PREFIX);
        state.apply_line("CWWKZ0002E: beta failed", PREFIX);
        assert!(state.is_settled());

        let err = state.verdict(&PathBuf::from("messages.log")).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Application beta failure: CWWKZ0002E: beta failed"), "{text}");
        assert!(!text.contains("alpha"), "{text}");
    }

    #[test]
    fn test_unattributed_failure_keeps_apps_outstanding() {
        let mut state = StartupState::new(["alpha"]).unwrap();
        state.apply_line("CWWKZ0008E: An internal error has occurred.", PREFIX);
        assert!(!state.is_settled());
        assert_eq!(
            state.failures().get(&FailureBucket::Unattributed).map(Vec::len),
            Some(1)
        );
        assert_eq!(
            state.failure_lines(),
            vec!["App Manager Failure: CWWKZ0008E: An internal error has occurred."]
        );
    }

    #[test]
    fn test_unknown_error_code_recorded() {
        let mut state = StartupState::new(["alpha"]).unwrap();
        let effect = state.apply_line("CWWKZ0999E: something new broke", PREFIX);
        assert_eq!(effect, Some(MessageEffect::FailAllUnresolved));
        assert!(!state.failures().is_empty());
    }

    #[test]
    fn test_whole_word_resolution() {
        let mut state = StartupState::new(["app"]).unwrap();
        state.apply_line("CWWKZ0001I: Application apple started in 1 seconds.", PREFIX);
        assert_eq!(state.unstarted(), vec!["app"]);
        state.apply_line("CWWKZ0001I: Application app started in 1 seconds.", PREFIX);
        assert!(state.is_settled());
    }

    #[test]
    fn test_name_with_regex_metacharacters() {
        let mut state = StartupState::new(["my.app"]).unwrap();
        state.apply_line("CWWKZ0001I: Application myXapp started.", PREFIX);
        assert!(!state.is_settled());
        state.apply_line("CWWKZ0001I: Application my.app started.", PREFIX);
        assert!(state.is_settled());
    }

    #[test]
    fn test_verdict_silence_is_timeout() {
        let state = StartupState::new(["alpha", "beta"]).unwrap();
        let err = state.verdict(&PathBuf::from("messages.log")).unwrap_err();
        assert_eq!(
            err,
            WaitError::AppsNotStarted {
                file: PathBuf::from("messages.log"),
                apps: vec!["alpha".to_string(), "beta".to_string()],
            }
        );
    }

    #[test]
    fn test_verdict_all_started() {
        let mut state = StartupState::new(["alpha"]).unwrap();
        state.apply_line("CWWKZ0001I: Application alpha started.", PREFIX);
        assert!(state.verdict(&PathBuf::from("messages.log")).is_ok());
    }

    #[test]
    fn test_ignored_messages_change_nothing() {
        let mut state = StartupState::new(["alpha"]).unwrap();
        state.apply_line("CWWKZ0018I: Starting application alpha.", PREFIX);
        state.apply_line("CWWKZ0009I: The application alpha has stopped successfully.", PREFIX);
        assert_eq!(state.unstarted(), vec!["alpha"]);
        assert!(state.failures().is_empty());
    }

    #[test]
    fn test_installed_apps_counts_starts_and_stops() {
        let mut installed = InstalledApps::new(["alpha", "beta", "gamma"]).unwrap();
        installed.observe("CWWKZ0001I: Application alpha started in 0.4 seconds.");
        installed.observe("CWWKZ0001I: Application beta started in 0.4 seconds.");
        installed.observe("CWWKZ0009I: The application beta has stopped successfully.");
        installed.observe("J2CA7001I: Resource adapter gamma installed in 0.6 seconds.");
        let names: Vec<_> = installed.installed().into_iter().collect();
        assert_eq!(names, vec!["alpha", "gamma"]);
    }

    #[test]
    fn test_installed_apps_whole_word_only() {
        let mut installed = InstalledApps::new(["app", "my.app"]).unwrap();
        installed.observe("CWWKZ0001I: Application apple started in 0.4 seconds.");
        installed.observe("CWWKZ0003I: The application myXapp updated in 0.2 seconds.");
        assert!(installed.installed().is_empty());
        installed.observe("CWWKZ0001I: Application app started in 0.4 seconds.");
        let names: Vec<_> = installed.installed().into_iter().collect();
        assert_eq!(names, vec!["app"]);
    }
}
