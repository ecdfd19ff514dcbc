//! CLI command handlers, one per file.

mod batch;
mod classify;
mod stats;
mod sweep;

pub use batch::run_batch;
pub use classify::run_classify;
pub use stats::run_stats;
pub use sweep::run_sweep;
