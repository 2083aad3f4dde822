//! Process-wide, deduplicated cache of dynamically loaded shared libraries, plus the unsafe
//! symbol-resolution layer that turns a `(library, symbol name)` pair into a safe
//! [`dagrunner_engine::Stage`] factory or completion callback.
//!
//! This is the one crate in the workspace that must reach past Rust's safety boundary: loading
//! a host-provided shared object and calling into it is, by construction, a trust boundary (see
//! §4.9/§6 of the design). Every `unsafe` block here is narrowly scoped and commented with the
//! invariant it relies on; nothing above this crate touches raw pointers or `extern "C"`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

mod registry;
mod symbols;

pub use registry::DynamicLibraryRegistry;
pub use symbols::{
    CallbackFunctionHandle, CallbackFunctionSymbol, CallbackPluginFactory,
    CallbackPluginFactorySymbol, StageFactory, StageFactorySymbol,
};
