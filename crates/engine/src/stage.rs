//! The polymorphic unit of executable work that makes up a [`crate::task::Task`].

use dagrunner_core::Identifier;

/// A single step of a task's execution.
///
/// Implementations are typically produced by a factory symbol resolved from a dynamically
/// loaded shared library, but the trait itself has no dependency on how a concrete
/// implementation is constructed.
///
/// # Contract
///
/// A stage whose [`Stage::is_running`] is `true` must not be dropped, moved, or cloned
/// without a successful [`Stage::end`] followed by [`Stage::cleanup`] first. Violating this
/// is a programming error, not a recoverable runtime condition — see
/// [`dagrunner_core::Error::ContractViolation`].
///
/// Long-running stages are expected to poll an interrupt signal (passed to them out of band
/// by whoever constructs them, or observed via [`Stage::is_running`] toggling externally)
/// between internal steps so that [`Stage::end`] is honored promptly rather than only at the
/// next stage boundary.
pub trait Stage: Send {
    /// A human-readable label, not necessarily unique.
    fn label(&self) -> &str;

    /// This stage's identifier.
    fn identifier(&self) -> Identifier;

    /// Begins executing. Returns `true` on success.
    fn run(&mut self) -> bool;

    /// Whether this stage is currently mid-`run`.
    fn is_running(&self) -> bool;

    /// Cooperative stop signal. A running stage is expected to poll for this and return from
    /// `run` promptly. Returns `true` if the stage acknowledged and stopped cleanly.
    fn end(&mut self) -> bool;

    /// Releases any transient resources. Idempotent; always safe to call after `end`.
    fn cleanup(&mut self);

    /// Produces an independent stage with the same label and identifier but fresh state —
    /// the `dyn`-safe substitute for [`Clone`] that trait objects cannot derive directly.
    fn clone_stage(&self) -> Box<dyn Stage>;
}

/// A minimal stage used by tests and as a safe default when a loaded document declares a
/// vertex with no stages of its own.
#[derive(Debug, Clone)]
pub struct NoopStage {
    label: String,
    identifier: Identifier,
    running: bool,
}

impl NoopStage {
    /// Creates a fresh no-op stage with the given label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            identifier: Identifier::new(),
            running: false,
        }
    }
}

impl Stage for NoopStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn identifier(&self) -> Identifier {
        self.identifier
    }

    fn run(&mut self) -> bool {
        self.running = true;
        self.running = false;
        true
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn end(&mut self) -> bool {
        self.running = false;
        true
    }

    fn cleanup(&mut self) {}

    fn clone_stage(&self) -> Box<dyn Stage> {
        Box::new(Self {
            label: self.label.clone(),
            identifier: self.identifier,
            running: false,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn given_noop_stage_when_run_then_it_succeeds_and_is_not_left_running() {
        let mut stage = NoopStage::new("print");
        assert!(stage.run());
        assert!(!stage.is_running());
    }

    #[test]
    fn given_noop_stage_when_cloned_then_identifier_and_label_are_preserved() {
        let stage = NoopStage::new("print");
        let clone = stage.clone_stage();
        assert_eq!(stage.identifier(), clone.identifier());
        assert_eq!(stage.label(), clone.label());
    }

    #[test]
    fn given_noop_stage_when_end_called_then_it_returns_true() {
        let mut stage = NoopStage::new("print");
        assert!(stage.end());
    }
}
