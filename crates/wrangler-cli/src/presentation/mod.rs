//! Terminal formatting helpers.

mod events;
mod tables;

pub use events::{describe_event, job_progress_bar};
pub use tables::{print_separator, truncate_string};
