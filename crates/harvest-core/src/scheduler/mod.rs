//! Episode scheduler.
//!
//! Bounded worker pool over episode pipelines, the shared slot counter and
//! activity gauge, and the stage events pipelines publish.

mod parallel;
mod progress;
mod slots;

pub use parallel::run_episodes;
pub use progress::{EpisodeEvent, EventKind};
pub use slots::{ActivityGauge, ActivityGuard, SlotGuard, WorkerSlots};
