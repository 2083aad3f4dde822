//! Consumes a generic document tree — produced by an external YAML-or-JSON front end, out of
//! scope for this crate — and builds a runnable `dagrunner_engine::Dag`, resolving every
//! `Stage`/`Callback` symbol it names through a `dagrunner_registry::DynamicLibraryRegistry`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod document;
mod loader;

pub use document::SAMPLE_DOCUMENT;
pub use loader::DagSpecLoader;
