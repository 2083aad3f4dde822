//! A loadable demonstration `Stage`, completion function, and completion plugin.
//!
//! Grounded in the upstream project's own worked example, `stages_lib::PrintStage`: a stage
//! that does nothing but print its label, used there (and here) to exercise the dynamic-loading
//! path end to end without pulling in a real workload's dependencies.
//!
//! Built as a `cdylib` so a document's `LibraryName`/`SymbolName` pair can name this crate's
//! build artifact directly; see [`crate::document::SAMPLE_DOCUMENT`] in `dagrunner-loader` for
//! the document shape that resolves `print_stage_factory`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::atomic::{AtomicBool, Ordering};

use dagrunner_core::Identifier;
use dagrunner_engine::{CallbackPlugin, Stage, Task};

/// A stage whose entire job is to print its label. Mirrors `stages_lib::PrintStage`'s
/// `run`/`is_running`/`end`/`cleanup` shape.
pub struct PrintStage {
    label: String,
    identifier: Identifier,
    running: AtomicBool,
}

impl PrintStage {
    /// Creates a fresh print stage with a new identifier.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            identifier: Identifier::new(),
            running: AtomicBool::new(false),
        }
    }
}

impl Stage for PrintStage {
    fn label(&self) -> &str {
        &self.label
    }

    fn identifier(&self) -> Identifier {
        self.identifier
    }

    fn run(&mut self) -> bool {
        self.running.store(true, Ordering::SeqCst);
        println!("[print_stage] {}", self.label);
        self.running.store(false, Ordering::SeqCst);
        true
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn end(&mut self) -> bool {
        self.running.store(false, Ordering::SeqCst);
        true
    }

    fn cleanup(&mut self) {}

    fn clone_stage(&self) -> Box<dyn Stage> {
        Box::new(Self {
            label: self.label.clone(),
            identifier: self.identifier,
            running: AtomicBool::new(false),
        })
    }
}

/// A completion plugin that counts how many times it has observed a task finish.
pub struct CountingCallbackPlugin {
    observations: usize,
}

impl CountingCallbackPlugin {
    /// Creates a plugin that has observed nothing yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { observations: 0 }
    }

    /// How many completions this plugin has observed.
    #[must_use]
    pub const fn observations(&self) -> usize {
        self.observations
    }
}

impl Default for CountingCallbackPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackPlugin for CountingCallbackPlugin {
    fn completed(&mut self, status: bool, task: &Task) {
        self.observations += 1;
        println!(
            "[print_stage] task '{}' completed (status={status}), observation #{}",
            task.label(),
            self.observations
        );
    }

    fn clone_plugin(&self) -> Box<dyn CallbackPlugin> {
        Box::new(Self {
            observations: self.observations,
        })
    }
}

/// Stage factory: the exported symbol a `Stages:` document entry names via `SymbolName`.
/// Matches `dagrunner_registry::StageFactorySymbol`.
///
/// # Safety
///
/// `label` must be either null or a valid, NUL-terminated C string for the duration of this
/// call, per the shared-library ABI contract.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn print_stage_factory(label: *const c_char) -> *mut Box<dyn Stage> {
    let label = if label.is_null() {
        "print".to_string()
    } else {
        // SAFETY: caller's contract guarantees `label` is a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(label) }.to_string_lossy().into_owned()
    };
    let stage: Box<dyn Stage> = Box::new(PrintStage::new(label));
    Box::into_raw(Box::new(stage))
}

/// Plain completion-callback function: prints whether the task succeeded. The exported symbol
/// a `Callback: {Type: Function}` document entry names via `SymbolName`. Matches
/// `dagrunner_registry::CallbackFunctionSymbol`.
#[unsafe(no_mangle)]
pub extern "C" fn print_completion_callback(status: bool) {
    println!("[print_stage] task completed: {status}");
}

/// Callback-plugin factory: the exported symbol a `Callback: {Type: Plugin}` document entry
/// names via `SymbolName`. Matches `dagrunner_registry::CallbackPluginFactorySymbol`.
#[unsafe(no_mangle)]
pub extern "C" fn print_callback_plugin_factory() -> *mut Box<dyn CallbackPlugin> {
    let plugin: Box<dyn CallbackPlugin> = Box::new(CountingCallbackPlugin::new());
    Box::into_raw(Box::new(plugin))
}
