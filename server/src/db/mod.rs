//! Database module for PostgreSQL persistence.

mod pool;
mod progress;
mod stats;

pub use pool::*;
pub use progress::*;
pub use stats::*;
