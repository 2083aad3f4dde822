//! A [`Task`] is an ordered sequence of [`crate::stage::Stage`]s plus configuration, initial
//! inputs, and at most one completion callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dagrunner_core::Identifier;
use serde_json::Value;

use crate::stage::Stage;

/// Observes a task's completion. Implementations must not block for long; the worker that
/// drives the task calls this synchronously once iteration finishes.
pub trait CallbackPlugin: Send {
    /// Invoked exactly once, after the task's stages have finished (or been interrupted).
    fn completed(&mut self, status: bool, task: &Task);

    /// The `dyn`-safe substitute for [`Clone`].
    fn clone_plugin(&self) -> Box<dyn CallbackPlugin>;
}

/// At most one of these may be attached to a [`Task`]; the loader's document schema enforces
/// this structurally (there is only one `Callback:` key per task).
pub enum TaskCallback {
    /// A plain function pointer/closure invoked with the completion status.
    Function(Box<dyn Fn(bool) + Send + Sync>),
    /// A stateful plugin object.
    Plugin(Box<dyn CallbackPlugin>),
}

impl Clone for TaskCallback {
    fn clone(&self) -> Self {
        match self {
            Self::Function(_) => {
                // Function callbacks close over caller state that is not `Clone`-derivable in
                // general; a cloned task carries no callback rather than guess at sharing
                // semantics the loader never specified. Plugins declare their own clone.
                Self::Plugin(Box::new(NullPlugin))
            }
            Self::Plugin(plugin) => Self::Plugin(plugin.clone_plugin()),
        }
    }
}

struct NullPlugin;

impl CallbackPlugin for NullPlugin {
    fn completed(&mut self, _status: bool, _task: &Task) {}

    fn clone_plugin(&self) -> Box<dyn CallbackPlugin> {
        Box::new(Self)
    }
}

/// An ordered sequence of stages plus configuration, executed serially by exactly one worker
/// at a time.
pub struct Task {
    label: String,
    identifier: Identifier,
    stages: Vec<Box<dyn Stage>>,
    configuration: Value,
    initial_inputs: Value,
    callback: Option<TaskCallback>,
    iterating: AtomicBool,
    kill: Arc<AtomicBool>,
}

impl Task {
    /// Creates a new task with no stages and no callback.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            identifier: Identifier::new(),
            stages: Vec::new(),
            configuration: Value::Null,
            initial_inputs: Value::Null,
            callback: None,
            iterating: AtomicBool::new(false),
            kill: Arc::new(AtomicBool::new(false)),
        }
    }

    /// This task's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// This task's identifier.
    #[must_use]
    pub const fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// Appends a stage to the end of this task's stage sequence.
    pub fn push_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// The number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Sets the JSON configuration document.
    pub fn set_configuration(&mut self, configuration: Value) {
        self.configuration = configuration;
    }

    /// The JSON configuration document.
    #[must_use]
    pub const fn configuration(&self) -> &Value {
        &self.configuration
    }

    /// Sets the JSON initial-inputs document.
    pub fn set_initial_inputs(&mut self, initial_inputs: Value) {
        self.initial_inputs = initial_inputs;
    }

    /// The JSON initial-inputs document.
    #[must_use]
    pub const fn initial_inputs(&self) -> &Value {
        &self.initial_inputs
    }

    /// Attaches a callback, replacing any previous one.
    pub fn set_callback(&mut self, callback: TaskCallback) {
        self.callback = Some(callback);
    }

    /// Whether a worker is currently walking this task's stages.
    #[must_use]
    pub fn is_iterating(&self) -> bool {
        self.iterating.load(Ordering::SeqCst)
    }

    /// Requests cooperative cancellation; checked between stages by [`Task::iterate_stages`].
    pub fn kill(&self) {
        self.kill.store(true, Ordering::SeqCst);
    }

    /// Whether a kill has been requested.
    #[must_use]
    pub fn was_killed(&self) -> bool {
        self.kill.load(Ordering::SeqCst)
    }

    /// A clone of this task's kill switch, shareable across the thread boundary to the
    /// worker that ends up owning this task while it runs. Lets
    /// [`crate::worker::InterruptibleTaskThread::set_interrupt`] propagate an interrupt into
    /// a task it no longer has direct access to without holding a lock on the task itself for
    /// the whole run.
    #[must_use]
    pub fn kill_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.kill)
    }

    /// Walks the stages in order, calling `run` on each. Stops early if a stage fails, if
    /// `end` fails, or if [`Task::kill`] was called. Returns `true` iff every stage ran to
    /// completion. A second concurrent call while already iterating returns `false`
    /// immediately without touching any stage.
    pub fn iterate_stages(&mut self) -> bool {
        self.iterate_stages_with_delay(Duration::ZERO)
    }

    /// As [`Task::iterate_stages`], but sleeps `delay` between stages — the gap the worker
    /// uses to let a pending interrupt land promptly rather than only at the next stage.
    ///
    /// Does **not** clear a pending kill on entry: a kill may legitimately have been requested
    /// in the window between a worker picking up this task and this call starting (e.g. via
    /// [`Task::kill_handle`] shared with a scheduler before iteration begins), and that request
    /// must still be honored at the first stage boundary. `kill` is reset only where a task is
    /// deliberately prepared for reuse — [`Task::new`] and [`Task::clone_task`].
    pub fn iterate_stages_with_delay(&mut self, delay: Duration) -> bool {
        if self.iterating.swap(true, Ordering::SeqCst) {
            return false;
        }

        let mut all_ran = true;
        for (position, stage) in self.stages.iter_mut().enumerate() {
            if self.kill.load(Ordering::SeqCst) {
                all_ran = false;
                break;
            }
            tracing::debug!(stage = stage.label(), "running stage");
            let ran = stage.run();
            stage.cleanup();
            let ended = stage.end();
            if !ran || !ended {
                all_ran = false;
                break;
            }
            if position + 1 < self.stages.len() && !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }

        self.iterating.store(false, Ordering::SeqCst);
        all_ran
    }

    /// Invokes whichever completion callback is attached, exactly once. No-op if none is set.
    pub fn complete(&mut self, status: bool) {
        match self.callback.take() {
            Some(TaskCallback::Function(function)) => {
                function(status);
                self.callback = Some(TaskCallback::Function(function));
            }
            Some(TaskCallback::Plugin(mut plugin)) => {
                plugin.completed(status, self);
                self.callback = Some(TaskCallback::Plugin(plugin));
            }
            None => {}
        }
    }

    /// Produces an independent task: stages are deep-cloned via
    /// [`crate::stage::Stage::clone_stage`], JSON documents are deep-copied, and the
    /// identifier is preserved (a structural clone, not a fresh construction).
    #[must_use]
    pub fn clone_task(&self) -> Self {
        Self {
            label: self.label.clone(),
            identifier: self.identifier,
            stages: self.stages.iter().map(|stage| stage.clone_stage()).collect(),
            configuration: self.configuration.clone(),
            initial_inputs: self.initial_inputs.clone(),
            callback: self.callback.as_ref().map(|callback| match callback {
                TaskCallback::Function(_) => TaskCallback::Plugin(Box::new(NullPlugin)),
                TaskCallback::Plugin(plugin) => TaskCallback::Plugin(plugin.clone_plugin()),
            }),
            iterating: AtomicBool::new(false),
            kill: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Task {}
