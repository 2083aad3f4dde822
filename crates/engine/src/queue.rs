//! A FIFO queue of owned [`Task`] handles, guarded by one mutex and one condition variable —
//! the textbook mutex/condvar producer-consumer shape, and the literal idiomatic expression of
//! this component's contract.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use dagrunner_core::Identifier;

use crate::task::Task;

/// A FIFO queue of [`Task`]s with bounded-wait pop and targeted removal by identifier.
///
/// **Ordering guarantee**: if `push(a)` happens-before `push(b)` on the same producer thread,
/// `a` is popped before `b` by any single consumer. With multiple consumers, a later pusher
/// can race ahead of an earlier waiter — the queue guarantees FIFO on items, not on consumer
/// fairness.
pub struct ConcurrentTaskQueue {
    state: Mutex<VecDeque<Task>>,
    condvar: Condvar,
}

impl ConcurrentTaskQueue {
    /// Creates a new, empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
        }
    }

    /// Appends `task` to the back of the queue and wakes one waiter.
    pub fn push(&self, task: Task) {
        if let Ok(mut queue) = self.state.lock() {
            queue.push_back(task);
            self.condvar.notify_one();
        }
    }

    /// Non-blocking pop. `None` if the queue is currently empty.
    pub fn try_pop(&self) -> Option<Task> {
        self.state.lock().ok().and_then(|mut queue| queue.pop_front())
    }

    /// Blocks until the queue is non-empty, then pops the head.
    ///
    /// Implemented with [`Condvar::wait_while`], which re-acquires the mutex atomically on
    /// wakeup — there is no window in which a caller "loses the mutex" on a spurious wakeup.
    /// Callers that need a cancellable wait should prefer [`ConcurrentTaskQueue::wait_for_and_pop`]
    /// with a timeout instead; this method blocks indefinitely if nothing is ever pushed.
    pub fn wait_and_pop(&self) -> Option<Task> {
        let guard = self.state.lock().ok()?;
        let mut guard = self.condvar.wait_while(guard, |queue| queue.is_empty()).ok()?;
        guard.pop_front()
    }

    /// Blocks up to `timeout` for an item to become available. `None` on timeout.
    pub fn wait_for_and_pop(&self, timeout: Duration) -> Option<Task> {
        let guard = self.state.lock().ok()?;
        let (mut guard, _timed_out) = self
            .condvar
            .wait_timeout_while(guard, timeout, |queue| queue.is_empty())
            .ok()?;
        guard.pop_front()
    }

    /// Scans the queue for a task with the given identifier, removing and returning it if
    /// found.
    pub fn remove_task_by_id(&self, id: Identifier) -> Option<Task> {
        let mut queue = self.state.lock().ok()?;
        let position = queue.iter().position(|task| task.identifier() == id)?;
        queue.remove(position)
    }

    /// The current length. Advisory under concurrent mutation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// True iff the queue currently holds no tasks. Advisory under concurrent mutation.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every queued task.
    pub fn clear(&self) {
        if let Ok(mut queue) = self.state.lock() {
            queue.clear();
        }
    }
}

impl Default for ConcurrentTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
