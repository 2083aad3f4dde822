//! Drives a [`Dag`] to completion one layer at a time: peel every vertex whose incoming-edge
//! count is currently zero, submit each to a [`TaskScheduler`], wait for the whole layer to
//! finish, then repeat against the reduced counts.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};

use dagrunner_core::{Error, Identifier, Result};

use crate::dag::Dag;
use crate::scheduler::TaskScheduler;
use crate::task::Task;
use crate::vertex::VertexStatus;

/// Emits a [`Dag`]'s vertices as a sequence of parallel-safe layers and drives each one through
/// a [`TaskScheduler`].
///
/// The peel is simulated against a processor-local incoming-count map, not the `Dag`'s own
/// atomic counters — per §5, "the processor does not mutate the source DAG's topology, only a
/// working copy's counters." The `Dag` passed in is left with the same vertices and edges it
/// started with; only each vertex's [`VertexStatus`] and owned [`Task`] change (a placeholder
/// task is left behind once the real one has been handed to the scheduler).
pub struct DagProcessor<'a> {
    scheduler: &'a TaskScheduler,
}

impl<'a> DagProcessor<'a> {
    /// Creates a processor that drives work through `scheduler`. The scheduler's dispatch loop
    /// ([`TaskScheduler::startup`]) must already be running on some thread, or every submitted
    /// layer will wait forever.
    #[must_use]
    pub const fn new(scheduler: &'a TaskScheduler) -> Self {
        Self { scheduler }
    }

    /// Runs every vertex of `dag` to completion, layer by layer.
    ///
    /// Returns `Ok(true)` iff every vertex was eventually peeled off (the graph was acyclic, as
    /// it always should be given [`Dag::connect`]'s guard — this is a defensive re-check, not
    /// the primary cycle guard). Returns `Ok(false)` if vertices remain because no further
    /// zero-incoming vertex could be found.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the dag's own bookkeeping is inconsistent (a vertex
    /// identifier that does not resolve to an arena slot); this should not happen in practice.
    pub fn process(&self, dag: &mut Dag) -> Result<bool> {
        let mut order: Vec<Identifier> = Vec::new();
        let mut incoming: HashMap<Identifier, usize> = HashMap::new();
        let mut outgoing: HashMap<Identifier, Vec<Identifier>> = HashMap::new();
        dag.linear_traversal(|vertex| {
            let id = vertex.identifier();
            order.push(id);
            incoming.insert(id, vertex.incoming_edge_count());
            outgoing.insert(id, vertex.edges().iter().map(|edge| edge.target()).collect());
        });

        let mut remaining: HashSet<Identifier> = order.iter().copied().collect();

        while !remaining.is_empty() {
            let layer: Vec<Identifier> = order
                .iter()
                .copied()
                .filter(|id| remaining.contains(id) && incoming.get(id).copied() == Some(0))
                .collect();

            if layer.is_empty() {
                break;
            }
            for id in &layer {
                remaining.remove(id);
            }

            let results = self.run_layer(dag, &layer)?;

            for id in &layer {
                let passed = results.get(id).copied().unwrap_or(false);
                if let Some(index) = dag.find_by_id(*id) {
                    if let Some(vertex) = dag.vertex_mut(index) {
                        vertex.set_status(if passed {
                            VertexStatus::Passed
                        } else {
                            VertexStatus::Failed
                        });
                    }
                }
                if let Some(targets) = outgoing.get(id) {
                    for target in targets {
                        if remaining.contains(target) {
                            if let Some(count) = incoming.get_mut(target) {
                                *count = count.saturating_sub(1);
                            }
                        }
                    }
                }
            }
        }

        Ok(remaining.is_empty())
    }

    /// Submits every vertex in `layer` to the scheduler, marking each `Scheduled`, then blocks
    /// until all of them have completed. Returns each vertex's pass/fail status.
    fn run_layer(
        &self,
        dag: &mut Dag,
        layer: &[Identifier],
    ) -> Result<HashMap<Identifier, bool>> {
        let latch = Arc::new((Mutex::new(layer.len()), Condvar::new()));
        let results: Arc<Mutex<HashMap<Identifier, bool>>> = Arc::new(Mutex::new(HashMap::new()));

        for &id in layer {
            let index = dag
                .find_by_id(id)
                .ok_or_else(|| Error::not_found(format!("vertex {id} missing from arena")))?;
            let task = {
                let vertex = dag
                    .vertex_mut(index)
                    .ok_or_else(|| Error::not_found(format!("vertex {id} missing from arena")))?;
                vertex.set_status(VertexStatus::Scheduled);
                vertex.replace_task(Task::new("peeled"))?
            };

            let latch = Arc::clone(&latch);
            let results = Arc::clone(&results);
            self.scheduler.submit_with_completion(task, move |status| {
                if let Ok(mut guard) = results.lock() {
                    guard.insert(id, status);
                }
                let (lock, condvar) = &*latch;
                if let Ok(mut count) = lock.lock() {
                    *count = count.saturating_sub(1);
                    condvar.notify_all();
                }
            });
        }

        let (lock, condvar) = &*latch;
        if let Ok(guard) = lock.lock() {
            let _ = condvar.wait_while(guard, |count| *count > 0);
        }

        Ok(results.lock().map(|guard| guard.clone()).unwrap_or_default())
    }
}
