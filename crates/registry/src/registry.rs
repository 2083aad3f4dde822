//! The process-wide cache of opened shared libraries, keyed by (canonicalized) path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use dagrunner_core::{Error, Result};
use libloading::Library;

use crate::symbols::{
    CallbackFunctionHandle, CallbackFunctionSymbol, CallbackPluginFactory,
    CallbackPluginFactorySymbol, StageFactory, StageFactorySymbol,
};

/// A deduplicated cache of opened [`Library`] handles. `register_library` is idempotent per
/// path: a second call for the same path returns a handle pointing at the same underlying
/// library (`Arc::ptr_eq`), rather than reopening it.
///
/// Lookups (the common case) only need a shared `&self`; only the rare first-open-per-path
/// path takes the lock for longer than a hashmap read, matching §5's "read-mostly; lookups
/// synchronized; insertions serialized" resource model.
#[derive(Default)]
pub struct DynamicLibraryRegistry {
    libraries: Mutex<HashMap<PathBuf, Arc<Library>>>,
}

impl DynamicLibraryRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or returns the already-open handle for) the shared library at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LibraryLoadFailed`] if the library cannot be opened.
    pub fn register_library(&self, path: impl AsRef<Path>) -> Result<Arc<Library>> {
        let path = path.as_ref();
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if let Some(existing) = self.cached(&key) {
            tracing::debug!(path = %key.display(), "reusing already-open library");
            return Ok(existing);
        }

        // SAFETY: loading a host-provided shared object is the documented trust boundary of
        // this component (§4.9/§6); the scheduler kernel has no way to validate its contents
        // beyond the symbol-resolution checks that follow.
        let library =
            unsafe { Library::new(path) }.map_err(|source| Error::library_load_failed(path, source))?;
        tracing::info!(path = %key.display(), "opened shared library");

        let mut guard = self
            .libraries
            .lock()
            .map_err(|_| Error::contract_violation("dynamic library registry mutex poisoned"))?;
        let library = Arc::clone(guard.entry(key).or_insert_with(|| Arc::new(library)));
        Ok(library)
    }

    fn cached(&self, key: &Path) -> Option<Arc<Library>> {
        self.libraries.lock().ok()?.get(key).cloned()
    }

    /// The number of distinct libraries currently open.
    #[must_use]
    pub fn len(&self) -> usize {
        self.libraries.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    /// True iff no library has been opened yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves `symbol` in `library` as a stage factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] if the symbol is absent.
    pub fn resolve_stage_factory(
        &self,
        library: &Arc<Library>,
        library_path: impl AsRef<Path>,
        symbol: &str,
    ) -> Result<StageFactory> {
        // SAFETY: the caller asserts `symbol` names a function matching `StageFactorySymbol`'s
        // signature, per the ABI contract in §6; `libloading` validates only that the symbol
        // exists and is loadable, not its type.
        let loaded: libloading::Symbol<StageFactorySymbol> = unsafe { library.get(symbol.as_bytes()) }
            .map_err(|_| Error::symbol_not_found(library_path.as_ref(), symbol))?;
        Ok(StageFactory::new(Arc::clone(library), *loaded, symbol.to_string()))
    }

    /// Resolves `symbol` in `library` as a plain completion-callback function.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] if the symbol is absent.
    pub fn resolve_callback_function(
        &self,
        library: &Arc<Library>,
        library_path: impl AsRef<Path>,
        symbol: &str,
    ) -> Result<CallbackFunctionHandle> {
        // SAFETY: see `resolve_stage_factory`.
        let loaded: libloading::Symbol<CallbackFunctionSymbol> =
            unsafe { library.get(symbol.as_bytes()) }
                .map_err(|_| Error::symbol_not_found(library_path.as_ref(), symbol))?;
        Ok(CallbackFunctionHandle::new(Arc::clone(library), *loaded))
    }

    /// Resolves `symbol` in `library` as a callback-plugin factory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SymbolNotFound`] if the symbol is absent.
    pub fn resolve_callback_plugin_factory(
        &self,
        library: &Arc<Library>,
        library_path: impl AsRef<Path>,
        symbol: &str,
    ) -> Result<CallbackPluginFactory> {
        // SAFETY: see `resolve_stage_factory`.
        let loaded: libloading::Symbol<CallbackPluginFactorySymbol> =
            unsafe { library.get(symbol.as_bytes()) }
                .map_err(|_| Error::symbol_not_found(library_path.as_ref(), symbol))?;
        Ok(CallbackPluginFactory::new(
            Arc::clone(library),
            *loaded,
            symbol.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn given_missing_library_path_when_registered_then_library_load_failed() {
        let registry = DynamicLibraryRegistry::new();
        let result = registry.register_library("/no/such/path/does-not-exist.so");
        assert!(matches!(result, Err(Error::LibraryLoadFailed { .. })));
    }

    #[test]
    fn given_fresh_registry_when_queried_then_it_is_empty() {
        let registry = DynamicLibraryRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn given_non_library_file_when_registered_then_library_load_failed() {
        // A real file that exists but is not a valid shared object: the dynamic loader must
        // reject it the same way it rejects a missing path, surfaced as the same error kind.
        let file = tempfile::NamedTempFile::new().expect("temp file creation");
        std::fs::write(file.path(), b"not a shared library").expect("write stub contents");
        let registry = DynamicLibraryRegistry::new();
        let result = registry.register_library(file.path());
        assert!(matches!(result, Err(Error::LibraryLoadFailed { .. })));
    }
}
