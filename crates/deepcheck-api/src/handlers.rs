//! Request handlers.

pub mod analyze;
pub mod feedback;
pub mod health;
pub mod reports;
pub mod stats;

pub use analyze::*;
pub use feedback::*;
pub use health::*;
pub use reports::*;
pub use stats::*;
