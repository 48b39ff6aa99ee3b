// LogMark - core/watch.rs
//
// The set of not-yet-satisfied patterns a multi-pattern wait is blocked on.
// Patterns may be added while waiting; they leave the set only by matching.

use crate::core::scanner;
use crate::util::error::PatternError;
use regex::Regex;

/// Insertion-ordered set of outstanding patterns.
#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    outstanding: Vec<Regex>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from pattern strings, in order.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, PatternError> {
        let mut set = Self::new();
        for pattern in patterns {
            set.insert(scanner::compile(pattern.as_ref())?);
        }
        Ok(set)
    }

    /// Add a pattern. Returns false if the same pattern is already outstanding.
    pub fn insert(&mut self, pattern: Regex) -> bool {
        if self.contains(pattern.as_str()) {
            return false;
        }
        self.outstanding.push(pattern);
        true
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.outstanding.iter().any(|p| p.as_str() == pattern)
    }

    /// Remove the first outstanding pattern that matches `line`.
    /// Returns the satisfied pattern's text.
    pub fn satisfy(&mut self, line: &str) -> Option<String> {
        let idx = self.outstanding.iter().position(|p| p.is_match(line))?;
        Some(self.outstanding.remove(idx).as_str().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.outstanding.is_empty()
    }

    pub fn len(&self) -> usize {
        self.outstanding.len()
    }

    pub fn patterns(&self) -> &[Regex] {
        &self.outstanding
    }

    /// Outstanding pattern strings, for diagnostics and timeout errors.
    pub fn pattern_strings(&self) -> Vec<String> {
        self.outstanding.iter().map(|p| p.as_str().to_string()).collect()
    }
}

/// A pattern whose appearance adds another pattern to the watch set.
///
/// Used for "a feature reload started, so also wait for it to finish".
#[derive(Debug, Clone)]
pub struct DynamicWatch {
    pub trigger: Regex,
    pub addition: Regex,
}

impl DynamicWatch {
    pub fn new(trigger: &str, addition: &str) -> Result<Self, PatternError> {
        Ok(Self {
            trigger: scanner::compile(trigger)?,
            addition: scanner::compile(addition)?,
        })
    }
}

/// Complete description of what a multi-pattern wait blocks on.
#[derive(Debug, Clone, Default)]
pub struct WatchSpec {
    pub watch: WatchSet,
    pub dynamic: Option<DynamicWatch>,
}

/// Effect of one matched line on a `WatchSpec`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The line matched the trigger; the addition was (re)armed.
    Expanded { added: bool },
    /// The line satisfied this outstanding pattern.
    Satisfied(String),
    /// The line matched nothing still outstanding.
    Unrelated,
}

impl WatchSpec {
    pub fn new(watch: WatchSet) -> Self {
        Self {
            watch,
            dynamic: None,
        }
    }

    pub fn with_dynamic(mut self, dynamic: DynamicWatch) -> Self {
        self.dynamic = Some(dynamic);
        self
    }

    /// Patterns to scan for: everything outstanding, then the trigger.
    pub fn scan_patterns(&self) -> Vec<Regex> {
        let mut patterns = self.watch.patterns().to_vec();
        if let Some(dynamic) = &self.dynamic {
            patterns.push(dynamic.trigger.clone());
        }
        patterns
    }

    /// Apply one matched line. The trigger is checked first so a single line
    /// never both satisfies a pattern and expands the set.
    pub fn apply(&mut self, line: &str) -> WatchEvent {
        if let Some(dynamic) = &self.dynamic {
            if dynamic.trigger.is_match(line) {
                let added = self.watch.insert(dynamic.addition.clone());
                return WatchEvent::Expanded { added };
            }
        }
        match self.watch.satisfy(line) {
            Some(pattern) => WatchEvent::Satisfied(pattern),
            None => WatchEvent::Unrelated,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.watch.is_empty()
    }
}
