//! Owns the task queue and a worker pool; dispatches queued tasks to free workers in FIFO
//! order while not paused.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dagrunner_core::Identifier;

use crate::queue::ConcurrentTaskQueue;
use crate::task::Task;
use crate::worker::{InterruptibleTaskThread, OnWorkerComplete};

/// How often the dispatch loop polls the queue when it finds nothing to do, and the default
/// per-worker pause-poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Default pause between stages within a task, giving a pending interrupt a chance to land.
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(1);

/// Owns one [`ConcurrentTaskQueue`] and a fixed-size pool of
/// [`InterruptibleTaskThread`]s, and dispatches queued tasks to free workers FIFO. Not
/// [`Clone`] — a scheduler is a singleton resource for its pool.
pub struct TaskScheduler {
    queue: Arc<ConcurrentTaskQueue>,
    workers: Mutex<Vec<InterruptibleTaskThread>>,
    completion_hooks: Arc<Mutex<HashMap<Identifier, Box<dyn FnOnce(bool) + Send>>>>,
    paused: AtomicBool,
    killed: AtomicBool,
    poll_interval: Duration,
    stage_delay: Duration,
}

impl TaskScheduler {
    /// Creates a scheduler with `pool_size` workers and the default poll interval / stage
    /// delay.
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self::with_config(pool_size, DEFAULT_POLL_INTERVAL, DEFAULT_STAGE_DELAY)
    }

    /// Creates a scheduler with explicit timing configuration.
    #[must_use]
    pub fn with_config(pool_size: usize, poll_interval: Duration, stage_delay: Duration) -> Self {
        let workers = (0..pool_size).map(|_| InterruptibleTaskThread::new()).collect();
        Self {
            queue: Arc::new(ConcurrentTaskQueue::new()),
            workers: Mutex::new(workers),
            completion_hooks: Arc::new(Mutex::new(HashMap::new())),
            paused: AtomicBool::new(false),
            killed: AtomicBool::new(false),
            poll_interval,
            stage_delay,
        }
    }

    /// The number of workers in this scheduler's pool.
    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.workers.lock().map(|workers| workers.len()).unwrap_or(0)
    }

    /// Enqueues `task`, unconditionally — even while paused. Queuing always succeeds while
    /// the scheduler is alive; pausing only withholds dispatch, it never silently drops
    /// queued work (a resolved Open Question — see `DESIGN.md`).
    pub fn queue_task(&self, task: Task) {
        self.queue.push(task);
    }

    /// Enqueues `task` and registers `on_complete` to fire once that specific task finishes,
    /// independent of any callback the task itself carries. Used by
    /// [`crate::processor::DagProcessor`] to learn when a submitted vertex's task is done
    /// without touching the task's own callback.
    pub fn submit_with_completion(
        &self,
        task: Task,
        on_complete: impl FnOnce(bool) + Send + 'static,
    ) {
        let id = task.identifier();
        if let Ok(mut hooks) = self.completion_hooks.lock() {
            hooks.insert(id, Box::new(on_complete));
        }
        self.queue_task(task);
    }

    /// Removes a queued-but-not-yet-dispatched task by identifier, returning `true` if found.
    /// Otherwise attempts to interrupt whichever worker is currently running that task,
    /// returning `true` iff one was found.
    pub fn kill_task(&self, id: Identifier) -> bool {
        if self.queue.remove_task_by_id(id).is_some() {
            return true;
        }
        let Ok(workers) = self.workers.lock() else {
            return false;
        };
        for worker in workers.iter() {
            if worker.current_task_id() == Some(id) {
                worker.set_interrupt();
                return true;
            }
        }
        false
    }

    /// Stops dispatching new tasks. Tasks already running continue; queuing keeps working.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resumes dispatching.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    /// Whether dispatch is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Whether [`TaskScheduler::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    /// Runs the dispatch loop synchronously until [`TaskScheduler::shutdown`] is called.
    /// Hosts typically run this on a dedicated thread. Returns the final kill state (always
    /// `true` on return).
    pub fn startup(&self) -> bool {
        while !self.is_shutdown() {
            if self.is_paused() {
                std::thread::sleep(self.poll_interval);
                continue;
            }
            if let Some(task) = self.queue.wait_for_and_pop(self.poll_interval) {
                self.dispatch(task);
            }
        }
        self.is_shutdown()
    }

    fn dispatch(&self, task: Task) {
        let id = task.identifier();
        let hooks = Arc::clone(&self.completion_hooks);
        let on_complete: OnWorkerComplete = Box::new(move |status| {
            if let Ok(mut guard) = hooks.lock() {
                if let Some(hook) = guard.remove(&id) {
                    hook(status);
                }
            }
        });

        let Ok(mut workers) = self.workers.lock() else {
            self.queue.push(task);
            return;
        };
        let Some(worker) = workers.iter_mut().find(|worker| !worker.is_running()) else {
            drop(workers);
            // No free worker right now (pool saturated); put the task back and try again on
            // the next poll. This can reorder relative to tasks pushed in the meantime, which
            // the FIFO guarantee (§4.4) already scopes to "a single consumer popping from the
            // queue" rather than across a requeue.
            self.queue.push(task);
            return;
        };
        if worker.set_task_and_run(task, on_complete, self.stage_delay).is_err() {
            tracing::warn!("dispatch raced with a worker accepting another task; dropping the slot and retrying next poll");
        }
    }

    /// Interrupts every worker, joins them, and drains the queue. Idempotent.
    pub fn shutdown(&self) {
        self.killed.store(true, Ordering::SeqCst);
        if let Ok(mut workers) = self.workers.lock() {
            for worker in workers.iter_mut() {
                worker.shutdown();
            }
        }
        self.queue.clear();
        if let Ok(mut hooks) = self.completion_hooks.lock() {
            hooks.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;
    use crate::stage::NoopStage;

    #[test]
    fn given_scheduler_when_task_queued_and_started_then_it_completes() {
        let scheduler = Arc::new(TaskScheduler::with_config(
            2,
            Duration::from_millis(2),
            Duration::ZERO,
        ));
        let completed = Arc::new(AtomicUsize::new(0));
        let completed_clone = Arc::clone(&completed);

        let mut task = Task::new("job");
        task.push_stage(Box::new(NoopStage::new("s1")));
        scheduler.submit_with_completion(task, move |status| {
            if status {
                completed_clone.fetch_add(1, Ordering::SeqCst);
            }
        });

        let scheduler_clone = Arc::clone(&scheduler);
        let handle = thread::spawn(move || scheduler_clone.startup());

        for _ in 0..200 {
            if completed.load(Ordering::SeqCst) == 1 {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(completed.load(Ordering::SeqCst), 1);

        scheduler.shutdown();
        let _ = handle.join();
    }

    #[test]
    fn given_paused_scheduler_when_task_queued_then_it_still_enqueues() {
        let scheduler = TaskScheduler::new(1);
        scheduler.pause();
        scheduler.queue_task(Task::new("while-paused"));
        assert!(scheduler.is_paused());
        scheduler.shutdown();
    }

    #[test]
    fn given_queued_task_when_kill_task_called_then_it_is_removed() {
        let scheduler = TaskScheduler::new(1);
        scheduler.pause();
        let task = Task::new("to-kill");
        let id = task.identifier();
        scheduler.queue_task(task);
        assert!(scheduler.kill_task(id));
        assert!(!scheduler.kill_task(id));
        scheduler.shutdown();
    }

    #[test]
    fn given_fresh_scheduler_when_queried_then_not_paused_and_not_shutdown() {
        let scheduler = TaskScheduler::new(1);
        assert!(!scheduler.is_paused());
        assert!(!scheduler.is_shutdown());
        scheduler.shutdown();
        assert!(scheduler.is_shutdown());
    }
}
