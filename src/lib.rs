// LogMark - lib.rs
//
// Library entry point. Test drivers embed the library directly: build a
// `LogSession`, then block on its waits. The `logmark` binary in main.rs
// is a thin CLI over the same surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use crate::app::report::{SoftTimeout, SoftTimeoutReporter, TracingReporter};
pub use crate::app::session::{LogSession, WaitConfig};
pub use crate::core::model::{CursorKind, LogFileRef, Timeouts};
pub use crate::util::error::{LogMarkError, WaitError};
