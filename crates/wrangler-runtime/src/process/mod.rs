//! Child process management.
//!
//! A [`ProcessHandle`] owns one spawned executable. Its output is exposed as a
//! finite stream of tagged lines and its exit is observable through any number
//! of [`ExitWatcher`]s.

mod handle;
mod launcher;
pub mod ports;
pub mod shutdown;
mod stream;

pub use handle::{
    ExitInfo, ExitWatcher, LaunchSpec, OutputLine, OutputLines, ProcessError, ProcessHandle,
    TERMINATE_GRACE,
};
pub use launcher::{ProcessLauncher, TokioLauncher};
pub use ports::is_port_available;
