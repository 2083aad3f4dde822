//! Core identifier, error, and result types shared by every crate in the DAG task scheduler.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod error;
mod identifier;
mod result;

pub use error::Error;
pub use identifier::Identifier;
pub use result::Result;
