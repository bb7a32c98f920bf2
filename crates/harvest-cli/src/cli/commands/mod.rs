//! CLI command handlers, one per file.

mod probe;
mod run;
mod verify;

pub use probe::run_probe;
pub use run::run_harvest;
pub use verify::run_verify;

/// Exit code for a probe or verify that ran but did not accept its input.
pub(crate) const REJECTED_EXIT_CODE: i32 = 2;
