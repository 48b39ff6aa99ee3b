// LogMark - core/classify.rs
//
// Application manager message classification.
//
// A static, data-driven table maps each known message code to the effect it
// has on startup validation. Dispatch on the effect happens in
// core::startup; adding a code here never touches that control flow.
//
// Codes missing from the table fall back on the severity letter: an
// `E`-suffixed code is an error the table does not know about yet and is
// recorded as an unattributed failure instead of being dropped.

use crate::util::constants::{ERROR_SEVERITY_SUFFIX, JSON_MESSAGE_KEY};
use std::collections::HashMap;
use std::sync::OnceLock;

/// What a classified message does to the startup state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageEffect {
    /// The named application started.
    RemoveFromUnstarted,
    /// The named application failed; terminal for that application.
    FailNamedApp,
    /// A failure that cannot be pinned on one application.
    FailAllUnresolved,
    /// Informational for startup purposes.
    Ignore,
}

use MessageEffect::{FailAllUnresolved, FailNamedApp, Ignore, RemoveFromUnstarted};

/// Application manager codes and their effect on startup validation.
pub const APP_MANAGER_MESSAGES: &[(&str, MessageEffect)] = &[
    // Application {0} started in {1} seconds.
    ("CWWKZ0001I", RemoveFromUnstarted),
    // An exception occurred while starting the application {0}.
    ("CWWKZ0002E", FailNamedApp),
    // The application {0} updated in {1} seconds.
    ("CWWKZ0003I", Ignore),
    ("CWWKZ0004E", Ignore),
    // The server is not configured to handle applications of type {1}.
    ("CWWKZ0005E", FailNamedApp),
    // Could not create a download location for the {1} application.
    ("CWWKZ0006E", FailNamedApp),
    // An exception occurred while downloading the file from {0}.
    ("CWWKZ0007W", FailAllUnresolved),
    // The location service required to resolve file locations is missing.
    ("CWWKZ0008E", FailAllUnresolved),
    // The application {0} has stopped successfully.
    ("CWWKZ0009I", Ignore),
    ("CWWKZ0010E", Ignore),
    ("CWWKZ0011E", Ignore),
    // The application {0} was not started.
    ("CWWKZ0012I", FailNamedApp),
    ("CWWKZ0013E", Ignore),
    // The application {0} could not be found at location {1}.
    ("CWWKZ0014W", FailNamedApp),
    ("CWWKZ0015E", Ignore),
    ("CWWKZ0016E", FailNamedApp),
    ("CWWKZ0017E", FailNamedApp),
    ("CWWKZ0018I", Ignore),
    ("CWWKZ0019I", Ignore),
    ("CWWKZ0020I", Ignore),
    ("CWWKZ0021E", FailNamedApp),
    // Application {0} has not started in {1} seconds.
    ("CWWKZ0022W", Ignore),
    // Application monitor.
    ("CWWKZ0053E", Ignore),
    ("CWWKZ0054E", FailNamedApp),
    ("CWWKZ0055E", FailNamedApp),
    ("CWWKZ0056E", FailNamedApp),
    ("CWWKZ0057E", Ignore),
    ("CWWKZ0058I", Ignore),
    ("CWWKZ0059E", Ignore),
    ("CWWKZ0060E", Ignore),
    ("CWWKZ0060W", Ignore),
    // War installer and module containers.
    ("CWWKZ0106E", FailNamedApp),
    ("CWWKZ0107E", Ignore),
    ("CWWKZ0111E", FailNamedApp),
    ("CWWKZ0112E", FailNamedApp),
    ("CWWKZ0113E", FailNamedApp),
    ("CWWKZ0114E", FailNamedApp),
    ("CWWKZ0115E", FailNamedApp),
    ("CWWKZ0116E", FailNamedApp),
    ("CWWKZ0117E", FailNamedApp),
    ("CWWKZ0118E", FailNamedApp),
    ("CWWKZ0120E", FailNamedApp),
    ("CWWKZ0121E", FailNamedApp),
    // WAB installer.
    ("CWWKZ0201E", Ignore),
    ("CWWKZ0202E", Ignore),
    ("CWWKZ0203E", Ignore),
    ("CWWKZ0204E", Ignore),
    ("CWWKZ0205E", Ignore),
    ("CWWKZ0206E", Ignore),
    ("CWWKZ0207E", Ignore),
    ("CWWKZ0208E", Ignore),
    // EBA installer.
    ("CWWKZ0301E", FailNamedApp),
    ("CWWKZ0302E", FailNamedApp),
    ("CWWKZ0303E", FailNamedApp),
    ("CWWKZ0304E", FailNamedApp),
    // ESA installer.
    ("CWWKZ0401E", FailNamedApp),
    ("CWWKZ0402E", FailNamedApp),
    ("CWWKZ0403E", FailNamedApp),
    ("CWWKZ0404E", FailNamedApp),
];

fn table() -> &'static HashMap<&'static str, MessageEffect> {
    static TABLE: OnceLock<HashMap<&'static str, MessageEffect>> = OnceLock::new();
    TABLE.get_or_init(|| APP_MANAGER_MESSAGES.iter().copied().collect())
}

/// Effect of a code found in the table, if any.
pub fn lookup(code: &str) -> Option<MessageEffect> {
    table().get(code).copied()
}

/// Effect of any code, applying the severity-letter fallback for codes the
/// table does not list.
pub fn effect_of(code: &str) -> MessageEffect {
    match lookup(code) {
        Some(effect) => effect,
        None if code.ends_with(ERROR_SEVERITY_SUFFIX) => FailAllUnresolved,
        None => Ignore,
    }
}

/// A message line split into its code and the text after the first `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMessage {
    pub code: String,
    pub remainder: String,
}

impl AppMessage {
    /// Rejoin code and text as they appeared in the log.
    pub fn render(&self) -> String {
        format!("{}:{}", self.code, self.remainder)
    }
}

/// Extract the message starting at `prefix` from a raw log line.
///
/// Plain lines carry a timestamp/thread/logger preamble before the code, so
/// the line is cut at the first occurrence of `prefix`. JSON lines carry the
/// text under the `message` key. Returns `None` for lines with no code or no
/// `:` separator.
pub fn parse_line(line: &str, prefix: &str) -> Option<AppMessage> {
    let text: std::borrow::Cow<'_, str> = if line.trim_start().starts_with('{') {
        match serde_json::from_str::<serde_json::Value>(line) {
            Ok(value) => match value.get(JSON_MESSAGE_KEY).and_then(|m| m.as_str()) {
                Some(message) => message.to_string().into(),
                None => {
                    tracing::warn!(
                        key = JSON_MESSAGE_KEY,
                        line = %crate::util::logging::preview(line),
                        "JSON log line has no message key"
                    );
                    return None;
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable JSON log line");
                return None;
            }
        }
    } else {
        line.into()
    };

    let start = text.find(prefix)?;
    let (code, remainder) = text[start..].split_once(':')?;
    Some(AppMessage {
        code: code.trim().to_string(),
        remainder: remainder.to_string(),
    })
}
