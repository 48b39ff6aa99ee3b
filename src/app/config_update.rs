// LogMark - app/config_update.rs
//
// Multi-pattern waits driven by a WatchSpec, and the configuration update
// wait built on top of them.
//
// Each poll reads at most one matching line from the mark-relative offset so
// a single line never causes two state changes. A matched line either arms
// the dynamic addition (feature update started, so also wait for it to
// complete) or satisfies one outstanding pattern. When applications are
// named, the installed set is re-derived from the whole log each time the log
// has grown.

use crate::app::scanner as log_scanner;
use crate::app::session::{LogSession, WaitClock};
use crate::app::startup::installed_app_names;
use crate::core::model::{LogFileRef, MaxMatches, SearchSpan};
use crate::core::watch::{DynamicWatch, WatchEvent, WatchSet, WatchSpec};
use crate::platform::fs;
use crate::util::constants::{
    CONFIG_UPDATE_DONE_PATTERN, FEATURE_UPDATE_DONE_PATTERN, FEATURE_UPDATE_STARTED_PATTERN,
    PROGRESS_LOG_EVERY_POLLS,
};
use crate::util::error::{Result, WaitError};
use std::collections::BTreeSet;
use std::time::Duration;

impl LogSession {
    /// Wait until every pattern of `spec` has matched after the mark and
    /// every name in `app_names` is installed, or `timeout` passes.
    ///
    /// Returns the matched lines in the order they were read, trigger lines
    /// included. The mark is not moved.
    pub fn wait_for_all<S: AsRef<str>>(
        &mut self,
        mut spec: WatchSpec,
        app_names: &[S],
        file: &LogFileRef,
        timeout: Duration,
    ) -> std::result::Result<Vec<String>, WaitError> {
        let required: BTreeSet<String> = app_names.iter().map(|n| n.as_ref().to_string()).collect();
        let mut installed = BTreeSet::new();
        let mut installed_checked_at: Option<u64> = None;
        let mut offset = self.mark(file.path());
        let mut matched = Vec::new();
        let mut span = SearchSpan::default();
        let mut polls = 0u32;

        let target = spec.watch.pattern_strings().join(", ");
        let clock = WaitClock::start("wait_for_all", file, &target);

        loop {
            let mut read_line = false;
            let patterns = spec.scan_patterns();
            if !patterns.is_empty() {
                match log_scanner::scan(file, &patterns, offset, MaxMatches::Limit(1)) {
                    Ok(mut result) => {
                        offset = result.offset;
                        span.absorb(&result);
                        if let Some(line) = result.matches.pop() {
                            read_line = true;
                            match spec.apply(&line) {
                                WatchEvent::Expanded { added } => {
                                    tracing::debug!(added, line = %line, "Dynamic watch triggered");
                                }
                                WatchEvent::Satisfied(pattern) => {
                                    tracing::debug!(%pattern, remaining = spec.watch.len(), "Pattern satisfied");
                                }
                                WatchEvent::Unrelated => {}
                            }
                            matched.push(line);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(file = %file, error = %e, "Scan failed, retrying next poll");
                    }
                }
            }

            // The installed set is derived from the whole log, so it only
            // changes when the log does.
            if !required.is_empty() {
                let len = fs::file_len_or_zero(file.path()).ok();
                if len.is_none() || len != installed_checked_at {
                    match installed_app_names(&required, file) {
                        Ok(names) => {
                            installed = names;
                            installed_checked_at = len;
                        }
                        Err(e) => tracing::warn!(file = %file, error = %e, "Installed-app check failed"),
                    }
                }
            }
            let apps_outstanding: Vec<String> = required.difference(&installed).cloned().collect();

            if spec.is_complete() && apps_outstanding.is_empty() {
                log_search_span(&span);
                clock.finish("wait_for_all", "complete");
                return Ok(matched);
            }

            if clock.elapsed() >= timeout {
                log_search_span(&span);
                clock.finish("wait_for_all", "timed out");
                return Err(WaitError::Outstanding {
                    file: file.path().to_path_buf(),
                    patterns: spec.watch.pattern_strings(),
                    apps: apps_outstanding,
                });
            }

            polls += 1;
            if polls % PROGRESS_LOG_EVERY_POLLS == 0 {
                tracing::info!(
                    polls,
                    elapsed_ms = clock.elapsed().as_millis() as u64,
                    patterns = ?spec.watch.pattern_strings(),
                    apps = ?apps_outstanding,
                    "Still waiting"
                );
            }

            if !read_line {
                self.sleep_poll();
            }
        }
    }

    /// Wait for the server to finish applying a configuration change.
    ///
    /// Waits after the mark for the config-updated (or no-change) message
    /// plus `extra_patterns`. A feature update starting before that counts
    /// as part of the change, so its completion is then waited for too;
    /// `require_feature_update` waits for that completion unconditionally.
    /// `app_names` must all be installed before the wait succeeds.
    pub fn wait_for_config_update<A: AsRef<str>, P: AsRef<str>>(
        &mut self,
        file: &LogFileRef,
        app_names: &[A],
        require_feature_update: bool,
        extra_patterns: &[P],
    ) -> Result<Vec<String>> {
        let spec = config_update_spec(require_feature_update, extra_patterns)?;
        let timeout = self.config().config_update_timeout;
        Ok(self.wait_for_all(spec, app_names, file, timeout)?)
    }
}

fn log_search_span(span: &SearchSpan) {
    tracing::info!(first_line = ?span.first_line, "First line searched");
    tracing::info!(last_line = ?span.last_line, "Last line searched");
    if span.reached_eof {
        tracing::info!("Search reached end of file; the last line searched was the last line seen");
    }
}

/// Watch spec for a configuration update.
pub fn config_update_spec<S: AsRef<str>>(
    require_feature_update: bool,
    extra_patterns: &[S],
) -> Result<WatchSpec> {
    let mut watch = WatchSet::from_patterns(extra_patterns)?;
    watch.insert(crate::core::scanner::compile(CONFIG_UPDATE_DONE_PATTERN)?);
    if require_feature_update {
        watch.insert(crate::core::scanner::compile(FEATURE_UPDATE_DONE_PATTERN)?);
    }
    let dynamic = DynamicWatch::new(FEATURE_UPDATE_STARTED_PATTERN, FEATURE_UPDATE_DONE_PATTERN)?;
    Ok(WatchSpec::new(watch).with_dynamic(dynamic))
}
