//! Services that orchestrate domain operations over ports.

mod config_handle;

pub use config_handle::ConfigHandle;
