//! Subcommand implementations.

mod analyze;
mod report;
mod selfcheck;
mod stats;
mod sync;

pub use analyze::run_analyze;
pub use report::run_report;
pub use selfcheck::run_selfcheck;
pub use stats::run_stats;
pub use sync::run_sync_models;
