//! The crate-wide `Result` alias.

use crate::Error;

/// Convenience alias used throughout the scheduler.
pub type Result<T> = std::result::Result<T, Error>;
