//! A node in the DAG that owns a [`Task`] and its outgoing [`Edge`]s.

use std::sync::atomic::{AtomicUsize, Ordering};

use dagrunner_core::Identifier;

use crate::edge::Edge;
use crate::task::Task;

/// A vertex's lifecycle state, updated by the scheduler/processor as the owned task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexStatus {
    /// Not yet submitted to any scheduler.
    Initialized,
    /// Submitted; waiting for a free worker.
    Scheduled,
    /// A worker is currently iterating this vertex's task.
    Running,
    /// The task completed successfully.
    Passed,
    /// The task completed with a failure.
    Failed,
    /// This vertex cannot participate in further scheduling (e.g. its DAG was found cyclic).
    Invalid,
}

/// One node of a [`crate::dag::Dag`].
pub struct Vertex {
    identifier: Identifier,
    label: String,
    status: VertexStatus,
    task: Task,
    edges: Vec<Edge>,
    incoming: AtomicUsize,
}

impl Vertex {
    /// Creates a new, unconnected vertex wrapping `task`.
    #[must_use]
    pub fn new(label: impl Into<String>, task: Task) -> Self {
        Self {
            identifier: Identifier::new(),
            label: label.into(),
            status: VertexStatus::Initialized,
            task,
            edges: Vec::new(),
            incoming: AtomicUsize::new(0),
        }
    }

    /// Creates a vertex with an explicit identifier (used by the loader, which reads
    /// identifiers from the source document rather than generating fresh ones).
    #[must_use]
    pub fn with_identifier(identifier: Identifier, label: impl Into<String>, task: Task) -> Self {
        Self {
            identifier,
            label: label.into(),
            status: VertexStatus::Initialized,
            task,
            edges: Vec::new(),
            incoming: AtomicUsize::new(0),
        }
    }

    /// This vertex's identifier.
    #[must_use]
    pub const fn identifier(&self) -> Identifier {
        self.identifier
    }

    /// This vertex's label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// This vertex's current status.
    #[must_use]
    pub const fn status(&self) -> VertexStatus {
        self.status
    }

    /// Updates this vertex's status.
    pub fn set_status(&mut self, status: VertexStatus) {
        self.status = status;
    }

    /// Borrows the owned task immutably.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Borrows the owned task mutably.
    #[must_use]
    pub const fn task_mut(&mut self) -> &mut Task {
        &mut self.task
    }

    /// Replaces the owned task, returning the previous one.
    ///
    /// # Errors
    ///
    /// Returns [`dagrunner_core::Error::ContractViolation`] if the current task is mid-run
    /// ([`Task::is_iterating`]) — a running task must not be displaced.
    pub fn replace_task(&mut self, task: Task) -> dagrunner_core::Result<Task> {
        if self.task.is_iterating() {
            return Err(dagrunner_core::Error::contract_violation(
                "attempted to replace a task that is currently iterating",
            ));
        }
        Ok(std::mem::replace(&mut self.task, task))
    }

    /// This vertex's outgoing edges, in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to this vertex's outgoing edges, used by the owning DAG to re-target
    /// edges after an arena reindex.
    pub fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// Appends a new outgoing edge pointing at `target` (cached at arena index
    /// `target_index`), unless an edge to that target already exists.
    ///
    /// Returns `true` iff a new edge was created.
    pub fn connect(&mut self, target: Identifier, target_index: usize) -> bool {
        if self.edges.iter().any(|edge| edge.is_a_connection_to(target)) {
            return false;
        }
        self.edges.push(Edge::new(target, target_index));
        true
    }

    /// The number of outgoing edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The number of edges elsewhere in the DAG whose target is this vertex.
    #[must_use]
    pub fn incoming_edge_count(&self) -> usize {
        self.incoming.load(Ordering::SeqCst)
    }

    /// Increments the incoming-edge counter. Called by the owning DAG when another vertex
    /// connects to this one.
    pub fn increment_incoming(&self) {
        self.incoming.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the incoming-edge counter, saturating at zero. Called by the owning DAG
    /// when an edge targeting this vertex is removed or re-targeted elsewhere.
    pub fn decrement_incoming(&self) {
        let _ = self
            .incoming
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
                Some(value.saturating_sub(1))
            });
    }

    /// Visits every outgoing edge in insertion order.
    pub fn visit_all_edges(&self, mut visitor: impl FnMut(&Edge)) {
        for edge in &self.edges {
            visitor(edge);
        }
    }

    /// Removes every outgoing edge whose target is `id`, returning how many were removed.
    pub fn disconnect_target(&mut self, id: Identifier) -> usize {
        let before = self.edges.len();
        self.edges.retain(|edge| !edge.is_a_connection_to(id));
        before - self.edges.len()
    }

    /// Produces an independent vertex: identifier and label are preserved, edges are
    /// **not** carried over (the owning [`crate::dag::Dag`] re-establishes connections after
    /// cloning every vertex, since targets must resolve within the new arena).
    #[must_use]
    pub fn clone_without_edges(&self) -> Self {
        Self {
            identifier: self.identifier,
            label: self.label.clone(),
            status: self.status,
            task: self.task.clone_task(),
            edges: Vec::new(),
            incoming: AtomicUsize::new(0),
        }
    }

    /// The edge targets this vertex currently holds, for re-establishing connections after a
    /// DAG-level clone.
    #[must_use]
    pub fn outgoing_targets(&self) -> Vec<Identifier> {
        self.edges.iter().map(Edge::target).collect()
    }
}

impl PartialEq for Vertex {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
    }
}

impl Eq for Vertex {}
