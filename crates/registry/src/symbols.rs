//! Safe wrappers around the three symbol shapes the shared-library ABI (§6) exposes: a stage
//! factory, a plain callback function, and a callback-plugin factory.
//!
//! Each wrapper keeps the owning [`libloading::Library`] alive (via its `Arc`) for as long as
//! the wrapper — and anything it constructs — might still be called, since the loaded code
//! must remain mapped for the lifetime of any object it produced.

use std::ffi::CString;
use std::os::raw::c_char;
use std::sync::Arc;

use dagrunner_core::{Error, Result};
use dagrunner_engine::{CallbackPlugin, Stage};
use libloading::Library;

/// The exported shape of a stage factory: given a NUL-terminated label, produce a heap-boxed
/// trait object. Returning `*mut Box<dyn Stage>` (a thin pointer to a fat one) rather than
/// `*mut dyn Stage` directly keeps the symbol's signature a plain C-ABI-shaped pointer; the fat
/// pointer itself never crosses the `extern "C"` boundary.
pub type StageFactorySymbol = unsafe extern "C" fn(*const c_char) -> *mut Box<dyn Stage>;

/// The exported shape of a plain completion-callback function.
pub type CallbackFunctionSymbol = unsafe extern "C" fn(bool);

/// The exported shape of a callback-plugin factory.
pub type CallbackPluginFactorySymbol = unsafe extern "C" fn() -> *mut Box<dyn CallbackPlugin>;

/// A resolved stage factory: calling [`StageFactory::create`] invokes the loaded symbol and
/// takes ownership of whatever it returns.
pub struct StageFactory {
    library: Arc<Library>,
    symbol: StageFactorySymbol,
    name: String,
}

impl StageFactory {
    pub(crate) fn new(library: Arc<Library>, symbol: StageFactorySymbol, name: String) -> Self {
        Self { library, symbol, name }
    }

    /// The symbol name this factory was resolved from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The library this factory's symbol was resolved from, for diagnostics (e.g. confirming
    /// two factories share the same loaded library via `Arc::ptr_eq`).
    #[must_use]
    pub const fn library(&self) -> &Arc<Library> {
        &self.library
    }

    /// Invokes the factory with `label`, taking ownership of the returned stage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if `label` contains an interior NUL byte (it cannot be
    /// represented as a C string), or [`Error::StageFailed`] if the factory returned a null
    /// pointer.
    pub fn create(&self, label: &str) -> Result<Box<dyn Stage>> {
        let c_label = CString::new(label)
            .map_err(|_| Error::invalid_record("stage label contains an interior NUL byte"))?;

        // SAFETY: `self.symbol` was resolved from `self.library`, which this struct keeps
        // alive for at least as long as `self` exists. The ABI contract (§6) guarantees the
        // factory returns either null or a pointer obtained from `Box::into_raw`.
        let raw = unsafe { (self.symbol)(c_label.as_ptr()) };
        if raw.is_null() {
            return Err(Error::stage_failed(format!(
                "stage factory '{}' returned a null stage",
                self.name
            )));
        }
        // SAFETY: non-null, and per the ABI contract was produced by `Box::into_raw` on the
        // producing side; we take ownership back exactly once.
        let boxed: Box<Box<dyn Stage>> = unsafe { Box::from_raw(raw) };
        Ok(*boxed)
    }
}

/// A resolved plain callback function, still tied to its owning library.
pub struct CallbackFunctionHandle {
    library: Arc<Library>,
    symbol: CallbackFunctionSymbol,
}

impl CallbackFunctionHandle {
    pub(crate) fn new(library: Arc<Library>, symbol: CallbackFunctionSymbol) -> Self {
        Self { library, symbol }
    }

    /// Converts this handle into a boxed closure suitable for
    /// [`dagrunner_engine::TaskCallback::Function`]. The closure holds the library `Arc`, so the
    /// loaded code stays mapped for as long as the closure (and the task carrying it) lives.
    #[must_use]
    pub fn into_boxed_fn(self) -> Box<dyn Fn(bool) + Send + Sync> {
        let symbol = self.symbol;
        let _library = self.library;
        Box::new(move |status: bool| {
            // SAFETY: see `StageFactory::create` — the library outlives this closure.
            let _keep_alive = &_library;
            unsafe { symbol(status) }
        })
    }
}

/// A resolved callback-plugin factory.
pub struct CallbackPluginFactory {
    library: Arc<Library>,
    symbol: CallbackPluginFactorySymbol,
    name: String,
}

impl CallbackPluginFactory {
    pub(crate) fn new(
        library: Arc<Library>,
        symbol: CallbackPluginFactorySymbol,
        name: String,
    ) -> Self {
        Self { library, symbol, name }
    }

    /// Invokes the factory, taking ownership of the returned plugin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StageFailed`] if the factory returned a null pointer.
    pub fn create(&self) -> Result<Box<dyn CallbackPlugin>> {
        // SAFETY: see `StageFactory::create`.
        let raw = unsafe { (self.symbol)() };
        if raw.is_null() {
            return Err(Error::stage_failed(format!(
                "callback plugin factory '{}' returned a null plugin",
                self.name
            )));
        }
        // SAFETY: see `StageFactory::create`.
        let boxed: Box<Box<dyn CallbackPlugin>> = unsafe { Box::from_raw(raw) };
        let _keep_alive = &self.library;
        Ok(*boxed)
    }
}
