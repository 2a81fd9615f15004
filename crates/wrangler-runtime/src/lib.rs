//! OS-facing runtime for wrangler.
//!
//! Everything that spawns processes, talks HTTP or touches the filesystem
//! lives here:
//!
//! - [`locator`]: toolchain binary resolution
//! - [`process`]: child process handles with graceful-then-forced termination
//! - [`readiness`]: fixed-interval readiness probing
//! - [`supervisor`]: the single owned inference server
//! - [`jobs`]: download and quantize jobs
//! - [`reconciler`]: detection of servers this orchestrator did not spawn
//! - [`models`]: model directory scan
//!
//! [`Orchestrator`] ties them together for hosts.

pub mod deps;
pub mod jobs;
pub mod locator;
pub mod models;
pub mod orchestrator;
pub mod process;
pub mod readiness;
pub mod reconciler;
pub mod settings_store;
pub mod sink;
pub mod supervisor;
pub mod toolchain;

pub use deps::{DependencyReport, check_dependencies};
pub use jobs::{DownloadSource, JobRegistry, JobRequest, JobTicket};
pub use orchestrator::Orchestrator;
pub use process::{LaunchSpec, ProcessHandle, ProcessLauncher, TokioLauncher};
pub use readiness::{ReqwestProbe, RetryPolicy};
pub use settings_store::{JsonFileSettingsStore, MemorySettingsStore};
pub use sink::BroadcastSink;
pub use supervisor::{LaunchdSupervisor, ServerSupervisor, SupervisorOptions};
