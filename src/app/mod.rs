// LogMark - app/mod.rs
//
// Application layer: the session, its cursors, and the wait loops.
// Dependencies: core, platform, util.

pub mod config_update;
pub mod offsets;
pub mod report;
pub mod scanner;
pub mod session;
pub mod startup;
pub mod wait;
