//! Shared error taxonomy for the DAG task scheduler.
//!
//! All errors are explicit, typed, and propagated with `?` — no panics in production code,
//! with the single documented exception of [`Error::ContractViolation`], which signals a
//! caller-side bug (moving a running stage or task) and is expected to terminate the process.

use std::path::PathBuf;

use thiserror::Error;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    // -- document loading -----------------------------------------------
    #[error("failed to read file '{path}'")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error")]
    JsonParseFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML parse error")]
    YamlParseFailed {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("document root must be 'DAG', found: {found}")]
    WrongRoot { found: String },

    #[error("field '{field}' has the wrong shape: expected {expected}")]
    WrongType { field: String, expected: String },

    #[error("missing required key '{key}' in {context}")]
    MissingKey { key: String, context: String },

    // -- identifier / DAG structure --------------------------------------
    #[error("invalid identifier '{text}'")]
    InvalidIdentifier {
        text: String,
        #[source]
        source: uuid::Error,
    },

    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("connecting would introduce a cycle: {reason}")]
    WouldBeCyclic { reason: String },

    // -- dynamic library registry -----------------------------------------
    #[error("failed to load shared library '{path}'")]
    LibraryLoadFailed {
        path: PathBuf,
        #[source]
        source: libloading_error::LibloadingError,
    },

    #[error("symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: PathBuf, symbol: String },

    // -- runtime execution -------------------------------------------------
    #[error("stage failed: {reason}")]
    StageFailed { reason: String },

    #[error("execution was interrupted")]
    Interrupted,

    #[error("contract violation: {reason}")]
    ContractViolation { reason: String },

    #[error("invalid record: {reason}")]
    InvalidRecord { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thin wrapper so this crate does not force a direct `libloading` dependency onto every
/// downstream consumer of [`Error`]; the registry crate supplies the real source error.
pub mod libloading_error {
    use std::fmt;

    /// An opaque, displayable stand-in for a `libloading::Error`.
    #[derive(Debug)]
    pub struct LibloadingError(pub String);

    impl fmt::Display for LibloadingError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for LibloadingError {}
}

impl Error {
    /// Creates a [`Error::FileReadFailed`].
    pub fn file_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Creates a [`Error::JsonParseFailed`].
    #[must_use]
    pub const fn json_parse_failed(source: serde_json::Error) -> Self {
        Self::JsonParseFailed { source }
    }

    /// Creates a [`Error::YamlParseFailed`].
    #[must_use]
    pub const fn yaml_parse_failed(source: serde_yaml::Error) -> Self {
        Self::YamlParseFailed { source }
    }

    /// Creates a [`Error::WrongRoot`].
    pub fn wrong_root(found: impl Into<String>) -> Self {
        Self::WrongRoot {
            found: found.into(),
        }
    }

    /// Creates a [`Error::WrongType`].
    pub fn wrong_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::WrongType {
            field: field.into(),
            expected: expected.into(),
        }
    }

    /// Creates a [`Error::MissingKey`].
    pub fn missing_key(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingKey {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Creates a [`Error::LibraryLoadFailed`].
    pub fn library_load_failed(path: impl Into<PathBuf>, source: impl std::fmt::Display) -> Self {
        Self::LibraryLoadFailed {
            path: path.into(),
            source: libloading_error::LibloadingError(source.to_string()),
        }
    }

    /// Creates a [`Error::InvalidIdentifier`].
    pub fn invalid_identifier(text: impl Into<String>, source: uuid::Error) -> Self {
        Self::InvalidIdentifier {
            text: text.into(),
            source,
        }
    }

    /// Creates a [`Error::NotFound`].
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Creates a [`Error::WouldBeCyclic`].
    pub fn would_be_cyclic(reason: impl Into<String>) -> Self {
        Self::WouldBeCyclic {
            reason: reason.into(),
        }
    }

    /// Creates a [`Error::SymbolNotFound`].
    pub fn symbol_not_found(library: impl Into<PathBuf>, symbol: impl Into<String>) -> Self {
        Self::SymbolNotFound {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    /// Creates a [`Error::StageFailed`].
    pub fn stage_failed(reason: impl Into<String>) -> Self {
        Self::StageFailed {
            reason: reason.into(),
        }
    }

    /// Creates a [`Error::ContractViolation`]. Also emits a `warn`-level trace event, since a
    /// contract violation signals a caller-side bug worth surfacing even where the error
    /// itself is only logged and not displayed to an operator.
    pub fn contract_violation(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "contract violation");
        Self::ContractViolation { reason }
    }

    /// Creates a [`Error::InvalidRecord`].
    pub fn invalid_record(reason: impl Into<String>) -> Self {
        Self::InvalidRecord {
            reason: reason.into(),
        }
    }
}
