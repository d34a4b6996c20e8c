//! Request handlers for sync and stats operations.

mod stats;
mod sync;

pub use stats::*;
pub use sync::*;
