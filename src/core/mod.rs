// LogMark - core/mod.rs
//
// Core matching logic layer.
// Dependencies: regex, encoding_rs, serde_json, tracing.
// Must NOT depend on: app, platform, or touch the filesystem.

pub mod classify;
pub mod model;
pub mod scanner;
pub mod startup;
pub mod watch;
