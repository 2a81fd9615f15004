//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the orchestrator expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No process or socket types in any signature
//! - Traits are intent-based (`probe`, `switch_model`) rather than mechanical
//! - Every port has a test double path (mockall or a no-op impl)

pub mod event_sink;
pub mod external_supervisor;
pub mod readiness;
pub mod settings_store;

pub use event_sink::{EventSink, NoopSink};
pub use external_supervisor::ExternalSupervisor;
pub use readiness::{HttpProbe, ProbeError};
pub use settings_store::{SettingsStore, StoreError};
