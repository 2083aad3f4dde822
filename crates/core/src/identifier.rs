//! The 128-bit identifier shared by every addressable entity (stages, tasks, vertices, edges).

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A 128-bit value with a canonical 8-4-4-4-12 lowercase-hex string form.
///
/// Two identifiers compare equal iff both are cleared (the "null" sentinel) or both carry
/// the same bits. `Identifier::new` always yields a freshly generated, non-null value;
/// `Identifier::cleared` yields the sentinel used before an entity has been assigned a real
/// identity (or after it has been explicitly cleared).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(Uuid);

impl Identifier {
    /// Generates a fresh, non-null identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The cleared / "null" sentinel identifier.
    #[must_use]
    pub const fn cleared() -> Self {
        Self(Uuid::nil())
    }

    /// True iff this identifier is the cleared sentinel.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        self.0.is_nil()
    }

    /// Parses the canonical 8-4-4-4-12 hex string form.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidRecord`] if `text` is not a valid UUID string.
    pub fn parse(text: &str) -> crate::Result<Self> {
        Uuid::parse_str(text)
            .map(Self)
            .map_err(|source| crate::Error::invalid_identifier(text, source))
    }

    /// Clears this identifier in place, leaving the sentinel "null" state.
    pub fn clear(&mut self) {
        self.0 = Uuid::nil();
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for Identifier {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}
