//! A single worker thread that drives one [`Task`] through [`Task::iterate_stages_with_delay`]
//! at a time, honoring a cooperative interrupt signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use dagrunner_core::{Error, Identifier, Result};

use crate::task::Task;

/// Invoked by the worker once a task finishes (successfully, with a failure, or interrupted),
/// after the task's own [`Task::complete`] callback (if any) has already fired. Used by
/// [`crate::scheduler::TaskScheduler`] to learn the worker is free again.
pub type OnWorkerComplete = Box<dyn FnOnce(bool) + Send>;

struct WorkItem {
    task: Task,
    on_complete: OnWorkerComplete,
    delay_between_stages: Duration,
    started: mpsc::Sender<()>,
}

/// One worker: a persistent background thread that accepts one task at a time, drives its
/// stages to completion (or interruption), and reports back.
///
/// # Contract
///
/// Movable only while idle. Dropping a worker that is still mid-task without going through
/// [`InterruptibleTaskThread::shutdown`] first is a contract violation.
pub struct InterruptibleTaskThread {
    sender: Option<mpsc::Sender<WorkItem>>,
    handle: Option<JoinHandle<()>>,
    interrupt: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    current: Arc<Mutex<Option<(Identifier, Arc<AtomicBool>)>>>,
}

impl InterruptibleTaskThread {
    /// Spawns the worker's background thread, idle until the first
    /// [`InterruptibleTaskThread::set_task_and_run`] call.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel::<WorkItem>();
        let interrupt = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(false));
        let current = Arc::new(Mutex::new(None));

        let handle = {
            let interrupt = Arc::clone(&interrupt);
            let running = Arc::clone(&running);
            let current = Arc::clone(&current);
            thread::spawn(move || Self::run_loop(&receiver, &interrupt, &running, &current))
        };

        Self {
            sender: Some(sender),
            handle: Some(handle),
            interrupt,
            running,
            current,
        }
    }

    fn run_loop(
        receiver: &mpsc::Receiver<WorkItem>,
        interrupt: &Arc<AtomicBool>,
        running: &Arc<AtomicBool>,
        current: &Arc<Mutex<Option<(Identifier, Arc<AtomicBool>)>>>,
    ) {
        while let Ok(item) = receiver.recv() {
            let WorkItem {
                mut task,
                on_complete,
                delay_between_stages,
                started,
            } = item;

            interrupt.store(false, Ordering::SeqCst);
            if let Ok(mut slot) = current.lock() {
                *slot = Some((task.identifier(), task.kill_handle()));
            }
            running.store(true, Ordering::SeqCst);
            let _ = started.send(());

            let all_ran = task.iterate_stages_with_delay(delay_between_stages);
            task.complete(all_ran);

            if let Ok(mut slot) = current.lock() {
                *slot = None;
            }
            running.store(false, Ordering::SeqCst);
            on_complete(all_ran);
        }
    }

    /// Assigns `task` to this worker and returns once the worker has signaled it has started
    /// (so the caller observes [`InterruptibleTaskThread::is_running`] as `true` reliably).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContractViolation`] if this worker is already running a task, or if
    /// the background thread is gone (it should only ever exit via
    /// [`InterruptibleTaskThread::shutdown`]).
    pub fn set_task_and_run(
        &self,
        task: Task,
        on_complete: OnWorkerComplete,
        delay_between_stages: Duration,
    ) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(Error::contract_violation(
                "attempted to assign a task to a worker that is already running one",
            ));
        }
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::contract_violation("worker thread has already shut down"))?;

        let (started_tx, started_rx) = mpsc::channel();
        let item = WorkItem {
            task,
            on_complete,
            delay_between_stages,
            started: started_tx,
        };
        sender
            .send(item)
            .map_err(|_| Error::contract_violation("worker thread is no longer accepting work"))?;
        started_rx
            .recv()
            .map_err(|_| Error::contract_violation("worker thread exited before confirming start"))?;
        Ok(())
    }

    /// Whether this worker is currently iterating a task's stages.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Whether an interrupt has been raised since the current (or most recent) task started.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// The identifier of the task currently assigned to this worker, if any.
    #[must_use]
    pub fn current_task_id(&self) -> Option<Identifier> {
        self.current.lock().ok().and_then(|slot| slot.as_ref().map(|(id, _)| *id))
    }

    /// Raises the interrupt flag and, if a task is currently assigned, calls its
    /// [`Task::kill`] via the kill handle captured when it started.
    pub fn set_interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
        if let Ok(slot) = self.current.lock() {
            if let Some((_, kill)) = slot.as_ref() {
                kill.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Interrupts any running task, joins the background thread, and leaves this worker in a
    /// non-running, task-less state. Idempotent.
    pub fn shutdown(&mut self) {
        self.set_interrupt();
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Default for InterruptibleTaskThread {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptibleTaskThread {
    // The documented exception to this workspace's "never panic in production code" policy:
    // dropping a worker while it is still mid-task is the contract violation §7 describes as
    // fatal, not a recoverable runtime condition.
    #[allow(clippy::panic)]
    fn drop(&mut self) {
        if self.running.load(Ordering::SeqCst) {
            panic!(
                "InterruptibleTaskThread dropped while running a task — call shutdown() first \
                 (ContractViolation)"
            );
        }
        self.sender = None;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc::channel;

    use super::*;
    use crate::stage::{NoopStage, Stage};

    struct BlockingStage {
        identifier: Identifier,
        interrupted: Arc<AtomicBool>,
    }

    impl Stage for BlockingStage {
        fn label(&self) -> &str {
            "blocking"
        }
        fn identifier(&self) -> Identifier {
            self.identifier
        }
        fn run(&mut self) -> bool {
            for _ in 0..200 {
                if self.interrupted.load(Ordering::SeqCst) {
                    return false;
                }
                thread::sleep(Duration::from_millis(5));
            }
            true
        }
        fn is_running(&self) -> bool {
            false
        }
        fn end(&mut self) -> bool {
            true
        }
        fn cleanup(&mut self) {}
        fn clone_stage(&self) -> Box<dyn Stage> {
            Box::new(Self {
                identifier: self.identifier,
                interrupted: Arc::clone(&self.interrupted),
            })
        }
    }

    #[test]
    fn given_task_with_noop_stage_when_run_then_on_complete_reports_success() {
        let mut worker = InterruptibleTaskThread::new();
        let mut task = Task::new("worker-task");
        task.push_stage(Box::new(NoopStage::new("s1")));

        let (tx, rx) = channel();
        worker
            .set_task_and_run(task, Box::new(move |status| { let _ = tx.send(status); }), Duration::ZERO)
            .expect("idle worker accepts task");

        let status = rx.recv_timeout(Duration::from_secs(2)).expect("completion reported");
        assert!(status);
        worker.shutdown();
    }

    #[test]
    fn given_running_worker_when_set_interrupt_then_stage_observes_interruption() {
        let mut worker = InterruptibleTaskThread::new();
        let interrupted = Arc::new(AtomicBool::new(false));
        let mut task = Task::new("interruptible");
        task.push_stage(Box::new(BlockingStage {
            identifier: Identifier::new(),
            interrupted: Arc::clone(&interrupted),
        }));

        let (tx, rx) = channel();
        worker
            .set_task_and_run(task, Box::new(move |status| { let _ = tx.send(status); }), Duration::ZERO)
            .expect("idle worker accepts task");
        assert!(worker.is_running());

        worker.set_interrupt();
        interrupted.store(true, Ordering::SeqCst);

        let status = rx.recv_timeout(Duration::from_secs(2)).expect("completion reported");
        assert!(!status);
        worker.shutdown();
    }

    #[test]
    fn given_busy_worker_when_second_task_assigned_then_contract_violation() {
        let mut worker = InterruptibleTaskThread::new();
        let mut blocker = Task::new("blocker");
        blocker.push_stage(Box::new(BlockingStage {
            identifier: Identifier::new(),
            interrupted: Arc::new(AtomicBool::new(false)),
        }));
        let (tx, _rx) = channel();
        worker
            .set_task_and_run(blocker, Box::new(move |status| { let _ = tx.send(status); }), Duration::ZERO)
            .expect("idle worker accepts task");

        let second = Task::new("second");
        let result = worker.set_task_and_run(second, Box::new(|_| {}), Duration::ZERO);
        assert!(result.is_err());

        worker.shutdown();
    }

    #[test]
    fn given_idle_worker_when_shutdown_then_is_not_running() {
        let mut worker = InterruptibleTaskThread::new();
        assert!(!worker.is_running());
        worker.shutdown();
        assert!(!worker.is_running());
    }

    #[test]
    fn given_worker_when_multiple_tasks_run_sequentially_then_each_completes_independently() {
        let mut worker = InterruptibleTaskThread::new();
        let completions = Arc::new(AtomicUsize::new(0));
        for label in ["a", "b", "c"] {
            let mut task = Task::new(label);
            task.push_stage(Box::new(NoopStage::new(label)));
            let completions = Arc::clone(&completions);
            let (tx, rx) = channel();
            worker
                .set_task_and_run(
                    task,
                    Box::new(move |status| {
                        if status {
                            completions.fetch_add(1, Ordering::SeqCst);
                        }
                        let _ = tx.send(());
                    }),
                    Duration::ZERO,
                )
                .expect("idle worker accepts task");
            rx.recv_timeout(Duration::from_secs(2)).expect("task completes");
        }
        assert_eq!(completions.load(Ordering::SeqCst), 3);
        worker.shutdown();
    }
}
