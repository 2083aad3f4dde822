//! The directed acyclic graph itself: an arena of [`Vertex`]es plus the operations that keep
//! it acyclic and orderable.

use std::collections::{HashMap, VecDeque};

use dagrunner_core::{Error, Identifier, Result};
use itertools::Itertools;
use serde_json::Value;

use crate::vertex::Vertex;

/// An index into a [`Dag`]'s vertex arena. Stable for the lifetime of the vertex it names;
/// never reused after removal within the same `Dag` instance.
pub type NodeIndex = usize;

/// A directed acyclic graph of [`Vertex`]es.
///
/// Vertices are stored in a flat arena (`Vec<Vertex>`) rather than behind individual
/// shared/weak pointers; edges carry a target [`Identifier`] plus a cached [`NodeIndex`],
/// resolved against this arena. This avoids needing a weak-reference type to express
/// "this edge does not keep its target alive" — see `DESIGN.md` for the full rationale.
pub struct Dag {
    title: String,
    configuration: Value,
    vertices: Vec<Vertex>,
    index_by_id: HashMap<Identifier, NodeIndex>,
}

impl Dag {
    /// Creates a new, empty DAG.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            configuration: Value::Null,
            vertices: Vec::new(),
            index_by_id: HashMap::new(),
        }
    }

    /// This DAG's title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sets the JSON configuration document carried alongside this DAG.
    pub fn set_configuration(&mut self, configuration: Value) {
        self.configuration = configuration;
    }

    /// The JSON configuration document.
    #[must_use]
    pub const fn configuration(&self) -> &Value {
        &self.configuration
    }

    /// The number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The total number of edges across every vertex.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.vertices.iter().map(Vertex::edge_count).sum()
    }

    /// Adds a vertex, taking ownership.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRecord`] if a vertex with the same identifier already exists.
    pub fn add_vertex(&mut self, vertex: Vertex) -> Result<NodeIndex> {
        if self.index_by_id.contains_key(&vertex.identifier()) {
            return Err(Error::invalid_record(format!(
                "vertex with identifier {} already exists",
                vertex.identifier()
            )));
        }
        let index = self.vertices.len();
        self.index_by_id.insert(vertex.identifier(), index);
        self.vertices.push(vertex);
        Ok(index)
    }

    /// Looks up a vertex's arena index by identifier.
    #[must_use]
    pub fn find_by_id(&self, id: Identifier) -> Option<NodeIndex> {
        self.index_by_id.get(&id).copied()
    }

    /// Returns the arena indices of every vertex whose label matches `label`, in insertion
    /// order.
    #[must_use]
    pub fn find_all_by_label(&self, label: &str) -> Vec<NodeIndex> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| vertex.label() == label)
            .map(|(index, _)| index)
            .collect()
    }

    /// Borrows a vertex by arena index.
    #[must_use]
    pub fn vertex(&self, index: NodeIndex) -> Option<&Vertex> {
        self.vertices.get(index)
    }

    /// Mutably borrows a vertex by arena index.
    #[must_use]
    pub fn vertex_mut(&mut self, index: NodeIndex) -> Option<&mut Vertex> {
        self.vertices.get_mut(index)
    }

    /// Visits every vertex in insertion order. The visitor must not mutate this DAG's
    /// structure.
    pub fn linear_traversal(&self, mut visitor: impl FnMut(&Vertex)) {
        for vertex in &self.vertices {
            visitor(vertex);
        }
    }

    /// Read-only reachability query: true iff `to` can already reach `from` — i.e. whether
    /// adding an edge `from -> to` would close a cycle.
    #[must_use]
    pub fn would_make_cyclic(&self, from: NodeIndex, to: NodeIndex) -> bool {
        if from == to {
            return true;
        }
        let mut visited = vec![false; self.vertices.len()];
        let mut stack = vec![to];
        while let Some(current) = stack.pop() {
            if current == from {
                return true;
            }
            if visited.get(current).copied().unwrap_or(true) {
                continue;
            }
            if let Some(flag) = visited.get_mut(current) {
                *flag = true;
            }
            if let Some(vertex) = self.vertices.get(current) {
                for edge in vertex.edges() {
                    if let Some(next) = edge.target_index() {
                        stack.push(next);
                    }
                }
            }
        }
        false
    }

    /// True iff `from` holds an edge whose target is `to`.
    #[must_use]
    pub fn are_connected(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let Some(to_vertex) = self.vertices.get(to) else {
            return false;
        };
        let to_id = to_vertex.identifier();
        self.vertices
            .get(from)
            .is_some_and(|vertex| vertex.edges().iter().any(|edge| edge.is_a_connection_to(to_id)))
    }

    /// Connects `from -> to`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBeCyclic`] if the edge would close a cycle. A second, identical
    /// connect is a no-op that returns `Ok(())` (idempotent).
    pub fn connect(&mut self, from: NodeIndex, to: NodeIndex) -> Result<()> {
        if from >= self.vertices.len() || to >= self.vertices.len() {
            return Err(Error::not_found("connect endpoint out of range"));
        }
        if self.are_connected(from, to) {
            return Ok(());
        }
        if self.would_make_cyclic(from, to) {
            return Err(Error::would_be_cyclic(format!(
                "connecting vertex {from} to vertex {to} would close a cycle"
            )));
        }
        let to_id = self
            .vertices
            .get(to)
            .map(Vertex::identifier)
            .ok_or_else(|| Error::not_found("target vertex missing"))?;
        if let Some(vertex) = self.vertices.get_mut(from) {
            vertex.connect(to_id, to);
        }
        if let Some(vertex) = self.vertices.get(to) {
            vertex.increment_incoming();
        }
        Ok(())
    }

    /// Connects by identifier rather than arena index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if either identifier is absent, or [`Error::WouldBeCyclic`]
    /// per [`Dag::connect`].
    pub fn connect_by_id(&mut self, from: Identifier, to: Identifier) -> Result<()> {
        let from_index = self
            .find_by_id(from)
            .ok_or_else(|| Error::not_found(format!("vertex {from} not found")))?;
        let to_index = self
            .find_by_id(to)
            .ok_or_else(|| Error::not_found(format!("vertex {to} not found")))?;
        self.connect(from_index, to_index)
    }

    /// Connects every vertex labeled `from_label` to every vertex labeled `to_label` (the
    /// Cartesian product). Fails atomically — if any pair would cycle, no connection from
    /// this call is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBeCyclic`] if any pair in the product would close a cycle.
    pub fn connect_all_by_label(&mut self, from_label: &str, to_label: &str) -> Result<()> {
        let froms = self.find_all_by_label(from_label);
        let tos = self.find_all_by_label(to_label);
        let pairs: Vec<(NodeIndex, NodeIndex)> = froms.iter().copied().cartesian_product(tos.iter().copied()).collect();

        if let Some(&(from, to)) = pairs
            .iter()
            .find(|&&(from, to)| self.would_make_cyclic(from, to) && !self.are_connected(from, to))
        {
            return Err(Error::would_be_cyclic(format!(
                "connecting label '{from_label}' to '{to_label}' would close a cycle ({from} -> {to})"
            )));
        }
        for (from, to) in pairs {
            self.connect(from, to)?;
        }
        Ok(())
    }

    /// Removes a vertex: drops any outgoing edges that targeted it from its neighbours, and
    /// decrements the incoming counter of every vertex the removed vertex itself pointed to
    /// (its departure means those targets now have one fewer live predecessor). Used
    /// internally by [`crate::processor::DagProcessor`] when peeling a working copy; does not
    /// touch this DAG's source topology unless called directly.
    pub fn remove_vertex_by_id(&mut self, id: Identifier) {
        let Some(removed_index) = self.index_by_id.remove(&id) else {
            return;
        };
        let removed_targets = self
            .vertices
            .get(removed_index)
            .map(Vertex::outgoing_targets)
            .unwrap_or_default();

        for vertex in &mut self.vertices {
            // the target is gone; nothing to decrement on its side, it no longer exists.
            let _ = vertex.disconnect_target(id);
        }
        self.vertices.remove(removed_index);
        // Reindex everything after the removed slot.
        self.index_by_id.clear();
        for (index, vertex) in self.vertices.iter().enumerate() {
            self.index_by_id.insert(vertex.identifier(), index);
        }
        for vertex in &mut self.vertices {
            let targets = vertex.outgoing_targets();
            for target in targets {
                if let Some(new_index) = self.index_by_id.get(&target) {
                    for edge in vertex.edges_mut() {
                        if edge.target() == target {
                            edge.connect_to(target, *new_index);
                        }
                    }
                }
            }
        }

        for target in removed_targets {
            if let Some(&target_index) = self.index_by_id.get(&target) {
                if let Some(target_vertex) = self.vertices.get(target_index) {
                    target_vertex.decrement_incoming();
                }
            }
        }
    }

    /// The arena indices of every vertex whose incoming-edge count is currently zero, in
    /// insertion order.
    #[must_use]
    pub fn zero_incoming_indices(&self) -> Vec<NodeIndex> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, vertex)| vertex.incoming_edge_count() == 0)
            .map(|(index, _)| index)
            .collect()
    }

    /// Kahn's-algorithm topological sort, flattened from [`Dag::layered_peel`] (so the output
    /// is stricter than a generic topological order: it is layer-major, with layer contents
    /// in insertion order). Fails only if the graph contains a cycle, which should not occur
    /// given [`Dag::connect`]'s invariant but is checked defensively.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBeCyclic`] if not every vertex could be ordered.
    pub fn topological_sort(&self) -> Result<Vec<Identifier>> {
        let layers = self.layered_peel()?;
        Ok(layers.into_iter().flatten().collect())
    }

    /// Repeatedly collects every vertex whose incoming-edge count is (at that point in the
    /// peel) zero into one layer, conceptually removes them, and continues. Vertices within a
    /// layer have no edges between them and are safe to process in parallel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WouldBeCyclic`] if vertices remain after no further zero-incoming
    /// vertex can be found (a cycle).
    pub fn layered_peel(&self) -> Result<Vec<Vec<Identifier>>> {
        let mut incoming: Vec<usize> = self
            .vertices
            .iter()
            .map(Vertex::incoming_edge_count)
            .collect();
        let mut remaining: usize = self.vertices.len();
        let mut layers = Vec::new();

        loop {
            let layer_indices: Vec<NodeIndex> = incoming
                .iter()
                .enumerate()
                .filter(|(_, &count)| count == 0)
                .map(|(index, _)| index)
                .filter(|index| incoming.get(*index).is_some())
                .collect();
            let layer_indices: Vec<NodeIndex> = layer_indices
                .into_iter()
                .filter(|index| self.vertices.get(*index).is_some())
                .collect();

            // Only consider vertices that have not already been emitted in a previous layer.
            let layer_indices: Vec<NodeIndex> = layer_indices
                .into_iter()
                .filter(|index| incoming.get(*index).copied() == Some(0))
                .collect();

            if layer_indices.is_empty() {
                break;
            }

            let mut layer = Vec::with_capacity(layer_indices.len());
            for &index in &layer_indices {
                if let Some(vertex) = self.vertices.get(index) {
                    layer.push(vertex.identifier());
                }
                // mark consumed so it is never selected again
                if let Some(slot) = incoming.get_mut(index) {
                    *slot = usize::MAX;
                }
                remaining -= 1;
            }
            for &index in &layer_indices {
                if let Some(vertex) = self.vertices.get(index) {
                    for edge in vertex.edges() {
                        if let Some(target_index) = edge.target_index() {
                            if let Some(slot) = incoming.get_mut(target_index) {
                                if *slot != usize::MAX {
                                    *slot = slot.saturating_sub(1);
                                }
                            }
                        }
                    }
                }
            }
            layers.push(layer);
        }

        if remaining != 0 {
            return Err(Error::would_be_cyclic(
                "vertices remain after layered peel terminated",
            ));
        }
        Ok(layers)
    }

    /// Strongly connected components via Tarjan's algorithm, over the current edge set. On a
    /// well-formed (acyclic) DAG every component is a singleton; a component with more than
    /// one vertex is evidence of a cycle that slipped past [`Dag::connect`]'s guard. Exposed
    /// as a diagnostic, not used by normal scheduling (which uses the cheaper
    /// [`Dag::would_make_cyclic`] reachability check instead).
    #[must_use]
    pub fn strongly_connected_components(&self) -> Vec<Vec<Identifier>> {
        struct State {
            index_counter: usize,
            stack: Vec<NodeIndex>,
            on_stack: Vec<bool>,
            indices: Vec<Option<usize>>,
            low_links: Vec<usize>,
            components: Vec<Vec<NodeIndex>>,
        }

        fn visit(dag: &Dag, state: &mut State, v: NodeIndex) {
            if let (Some(index_slot), Some(low_slot)) =
                (state.indices.get_mut(v), state.low_links.get_mut(v))
            {
                *index_slot = Some(state.index_counter);
                *low_slot = state.index_counter;
            }
            state.index_counter += 1;
            state.stack.push(v);
            if let Some(flag) = state.on_stack.get_mut(v) {
                *flag = true;
            }

            if let Some(vertex) = dag.vertices.get(v) {
                for edge in vertex.edges() {
                    let Some(w) = edge.target_index() else {
                        continue;
                    };
                    if state.indices.get(w).copied().flatten().is_none() {
                        visit(dag, state, w);
                        let w_low = state.low_links.get(w).copied().unwrap_or(usize::MAX);
                        if let Some(v_low) = state.low_links.get_mut(v) {
                            *v_low = (*v_low).min(w_low);
                        }
                    } else if state.on_stack.get(w).copied().unwrap_or(false) {
                        let w_index = state.indices.get(w).copied().flatten().unwrap_or(usize::MAX);
                        if let Some(v_low) = state.low_links.get_mut(v) {
                            *v_low = (*v_low).min(w_index);
                        }
                    }
                }
            }

            let v_low = state.low_links.get(v).copied().unwrap_or(usize::MAX);
            let v_index = state.indices.get(v).copied().flatten();
            if Some(v_low) == v_index {
                let mut component = Vec::new();
                while let Some(w) = state.stack.pop() {
                    if let Some(flag) = state.on_stack.get_mut(w) {
                        *flag = false;
                    }
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                state.components.push(component);
            }
        }

        let count = self.vertices.len();
        let mut state = State {
            index_counter: 0,
            stack: Vec::new(),
            on_stack: vec![false; count],
            indices: vec![None; count],
            low_links: vec![0; count],
            components: Vec::new(),
        };

        for v in 0..count {
            if state.indices.get(v).copied().flatten().is_none() {
                visit(self, &mut state, v);
            }
        }

        state
            .components
            .into_iter()
            .map(|component| {
                component
                    .into_iter()
                    .filter_map(|index| self.vertices.get(index).map(Vertex::identifier))
                    .collect()
            })
            .collect()
    }

    /// Produces an independent DAG: every vertex is deep-cloned (identifiers preserved), then
    /// every edge is re-established by identifier lookup against the new arena. A structural
    /// clone, not a fresh construction — clone identifiers equal their originals.
    #[must_use]
    pub fn clone_dag(&self) -> Self {
        let mut cloned = Self::new(self.title.clone());
        cloned.configuration = self.configuration.clone();

        let mut targets_by_source: Vec<(Identifier, Vec<Identifier>)> = Vec::new();
        for vertex in &self.vertices {
            targets_by_source.push((vertex.identifier(), vertex.outgoing_targets()));
            let clone = vertex.clone_without_edges();
            // add_vertex cannot fail here: source identifiers are unique by construction.
            let _ = cloned.add_vertex(clone);
        }

        for (source_id, targets) in targets_by_source {
            for target_id in targets {
                let _ = cloned.connect_by_id(source_id, target_id);
            }
        }

        cloned
    }

    /// Clears every vertex and edge, leaving the title and configuration intact.
    pub fn reset(&mut self) {
        self.vertices.clear();
        self.index_by_id.clear();
    }
}

impl PartialEq for Dag {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.vertices.len() == other.vertices.len()
            && self
                .vertices
                .iter()
                .zip(other.vertices.iter())
                .all(|(a, b)| a == b)
    }
}

/// Breadth-first linear traversal helper retained for diagnostics; not used by the normal
/// scheduling path, which relies on [`Dag::layered_peel`] instead.
#[must_use]
pub fn breadth_first_order(dag: &Dag, start: NodeIndex) -> Vec<Identifier> {
    let mut visited = vec![false; dag.vertices.len()];
    let mut queue = VecDeque::new();
    let mut order = Vec::new();
    queue.push_back(start);
    if let Some(flag) = visited.get_mut(start) {
        *flag = true;
    }
    while let Some(current) = queue.pop_front() {
        if let Some(vertex) = dag.vertices.get(current) {
            order.push(vertex.identifier());
            for edge in vertex.edges() {
                if let Some(next) = edge.target_index() {
                    if visited.get(next).copied() == Some(false) {
                        if let Some(flag) = visited.get_mut(next) {
                            *flag = true;
                        }
                        queue.push_back(next);
                    }
                }
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]

    use super::*;
    use crate::task::Task;

    fn dag_with_labels(labels: &[&str]) -> (Dag, HashMap<String, NodeIndex>) {
        let mut dag = Dag::new("test");
        let mut index_of = HashMap::new();
        for label in labels {
            let index = dag
                .add_vertex(Vertex::new(*label, Task::new(*label)))
                .expect("fresh identifiers never collide");
            index_of.insert((*label).to_string(), index);
        }
        (dag, index_of)
    }

    #[test]
    fn given_linear_chain_when_sorted_then_order_matches_insertion() {
        let labels = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let (mut dag, index_of) = dag_with_labels(&labels);
        for pair in labels.windows(2) {
            let from = index_of[pair[0]];
            let to = index_of[pair[1]];
            dag.connect(from, to).expect("linear chain never cycles");
        }

        let layers = dag.layered_peel().expect("acyclic");
        assert_eq!(layers.len(), 10);
        for layer in &layers {
            assert_eq!(layer.len(), 1);
        }
    }

    #[test]
    fn given_diamond_plus_branches_when_layered_then_five_layers_match_expected_shape() {
        let labels = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let (mut dag, index_of) = dag_with_labels(&labels);
        let edges = [
            ("a", "b"),
            ("a", "c"),
            ("a", "e"),
            ("b", "d"),
            ("b", "f"),
            ("c", "d"),
            ("e", "f"),
            ("e", "g"),
            ("f", "g"),
            ("f", "h"),
            ("f", "i"),
            ("f", "j"),
            ("g", "h"),
        ];
        for (from, to) in edges {
            dag.connect(index_of[from], index_of[to])
                .unwrap_or_else(|_| panic!("edge {from}->{to} should not cycle"));
        }

        let layers = dag.layered_peel().expect("acyclic");
        let layer_labels: Vec<Vec<String>> = layers
            .iter()
            .map(|layer| {
                let mut labels: Vec<String> = layer
                    .iter()
                    .map(|id| {
                        let index = dag.find_by_id(*id).expect("layer identifiers resolve");
                        dag.vertex(index).expect("index valid").label().to_string()
                    })
                    .collect();
                labels.sort();
                labels
            })
            .collect();

        assert_eq!(
            layer_labels,
            vec![
                vec!["a"],
                vec!["b", "c", "e"],
                vec!["d", "f"],
                vec!["g", "i", "j"],
                vec!["h"],
            ]
        );
    }

    #[test]
    fn given_diamond_dag_when_closing_cycle_attempted_then_rejected_and_dag_unchanged() {
        let labels = ["a", "b", "c", "d", "e", "f", "g", "h"];
        let (mut dag, index_of) = dag_with_labels(&labels);
        for (from, to) in [
            ("a", "b"),
            ("a", "c"),
            ("b", "d"),
            ("c", "d"),
            ("d", "h"),
            ("h", "g"),
        ] {
            dag.connect(index_of[from], index_of[to]).expect("no cycle yet");
        }

        let edge_count_before = dag.edge_count();
        let result = dag.connect(index_of["h"], index_of["a"]);
        assert!(matches!(result, Err(Error::WouldBeCyclic { .. })));
        assert_eq!(dag.edge_count(), edge_count_before);
    }

    #[test]
    fn given_dag_when_cloned_then_structure_is_preserved() {
        let (mut dag, index_of) = dag_with_labels(&["a", "b", "c"]);
        dag.connect(index_of["a"], index_of["b"]).expect("no cycle");
        dag.connect(index_of["b"], index_of["c"]).expect("no cycle");

        let cloned = dag.clone_dag();
        assert_eq!(cloned.vertex_count(), dag.vertex_count());
        assert_eq!(cloned.edge_count(), dag.edge_count());

        let a_id = dag.vertex(index_of["a"]).expect("exists").identifier();
        let b_id = dag.vertex(index_of["b"]).expect("exists").identifier();
        let cloned_a = cloned.find_by_id(a_id).expect("identifier preserved");
        let cloned_b = cloned.find_by_id(b_id).expect("identifier preserved");
        assert!(cloned.are_connected(cloned_a, cloned_b));
    }

    #[test]
    fn given_vertex_when_incoming_count_checked_then_it_matches_in_degree() {
        let (mut dag, index_of) = dag_with_labels(&["a", "b", "c"]);
        dag.connect(index_of["a"], index_of["c"]).expect("no cycle");
        dag.connect(index_of["b"], index_of["c"]).expect("no cycle");
        let c = dag.vertex(index_of["c"]).expect("exists");
        assert_eq!(c.incoming_edge_count(), 2);
    }

    #[test]
    fn given_vertex_removed_when_it_had_outgoing_edges_then_targets_incoming_count_drops() {
        let (mut dag, index_of) = dag_with_labels(&["a", "b"]);
        dag.connect(index_of["a"], index_of["b"]).expect("no cycle");
        let a_id = dag.vertex(index_of["a"]).expect("exists").identifier();
        let b_id = dag.vertex(index_of["b"]).expect("exists").identifier();
        assert_eq!(dag.vertex(index_of["b"]).expect("exists").incoming_edge_count(), 1);

        dag.remove_vertex_by_id(a_id);

        let b_index = dag.find_by_id(b_id).expect("b survives removal");
        assert_eq!(dag.vertex(b_index).expect("exists").incoming_edge_count(), 0);
    }

    #[test]
    fn given_acyclic_dag_when_scc_computed_then_every_component_is_a_singleton() {
        let (mut dag, index_of) = dag_with_labels(&["a", "b", "c"]);
        dag.connect(index_of["a"], index_of["b"]).expect("no cycle");
        dag.connect(index_of["b"], index_of["c"]).expect("no cycle");
        let components = dag.strongly_connected_components();
        assert!(components.iter().all(|component| component.len() == 1));
    }

    // NOTE: these `property_*` tests are deterministic stand-ins for real property-based
    // testing (no `proptest`/`quickcheck` dependency here) — each one fixes a handful of
    // representative graph shapes and asserts an invariant that must hold for all of them,
    // rather than a single literal expected output.

    /// A handful of distinct graph shapes, each as a list of vertex labels plus edges among
    /// them, used to exercise invariants across more than one topology.
    fn sample_dag_shapes() -> Vec<(Vec<&'static str>, Vec<(&'static str, &'static str)>)> {
        vec![
            (vec!["a"], vec![]),
            (vec!["a", "b", "c", "d"], vec![("a", "b"), ("b", "c"), ("c", "d")]),
            (
                vec!["a", "b", "c", "d"],
                vec![("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            ),
            (
                vec!["a", "b", "c", "d", "e"],
                vec![("a", "c"), ("b", "c"), ("c", "d"), ("c", "e")],
            ),
            (
                vec!["a", "b", "c", "d", "e", "f"],
                vec![("a", "b"), ("a", "c"), ("b", "d"), ("c", "d"), ("d", "e"), ("d", "f")],
            ),
            (vec!["a", "b", "c", "d"], vec![]),
        ]
    }

    #[test]
    fn property_topological_sort_respects_every_edge() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
            }

            let order = dag.topological_sort().unwrap_or_else(|_| panic!("case {case}: acyclic"));
            let position: HashMap<Identifier, usize> =
                order.iter().enumerate().map(|(position, id)| (*id, position)).collect();

            for (from, to) in &edges {
                let from_id = dag.vertex(index_of[*from]).expect("exists").identifier();
                let to_id = dag.vertex(index_of[*to]).expect("exists").identifier();
                assert!(
                    position[&from_id] < position[&to_id],
                    "case {case}: edge {from}->{to} violated in topological order"
                );
            }
        }
    }

    #[test]
    fn property_layered_peel_covers_every_vertex_exactly_once() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
            }

            let layers = dag.layered_peel().unwrap_or_else(|_| panic!("case {case}: acyclic"));
            let mut seen: Vec<Identifier> = layers.iter().flatten().copied().collect();
            seen.sort();
            seen.dedup();
            assert_eq!(
                seen.len(),
                labels.len(),
                "case {case}: layered peel did not cover every vertex exactly once"
            );
        }
    }

    #[test]
    fn property_layers_have_no_internal_edges() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
            }

            let layers = dag.layered_peel().unwrap_or_else(|_| panic!("case {case}: acyclic"));
            for (layer_index, layer) in layers.iter().enumerate() {
                for id in layer {
                    let index = dag.find_by_id(*id).expect("layer identifiers resolve");
                    let vertex = dag.vertex(index).expect("index valid");
                    for edge in vertex.edges() {
                        assert!(
                            !layer.contains(&edge.target()),
                            "case {case}: layer {layer_index} has an internal edge among its own vertices"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn property_incoming_count_matches_in_degree() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
            }

            for label in &labels {
                let id = dag.vertex(index_of[*label]).expect("exists").identifier();
                let in_degree = edges.iter().filter(|(_, to)| to == label).count();
                let incoming = dag.vertex(index_of[*label]).expect("exists").incoming_edge_count();
                assert_eq!(
                    incoming, in_degree,
                    "case {case}: vertex {label} (id {id:?}) incoming counter diverged from in-degree"
                );
            }
        }
    }

    #[test]
    fn property_acyclicity_invariant_holds_after_every_successful_connect() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
                assert!(
                    dag.topological_sort().is_ok(),
                    "case {case}: dag became cyclic after connecting {from}->{to}"
                );
            }
        }
    }

    #[test]
    fn property_dag_clone_preserves_structure_across_shapes() {
        for (case, (labels, edges)) in sample_dag_shapes().into_iter().enumerate() {
            let (mut dag, index_of) = dag_with_labels(&labels);
            for (from, to) in &edges {
                dag.connect(index_of[*from], index_of[*to])
                    .unwrap_or_else(|_| panic!("case {case}: edge {from}->{to} should not cycle"));
            }

            let cloned = dag.clone_dag();
            assert_eq!(cloned.vertex_count(), dag.vertex_count(), "case {case}: vertex count diverged");
            assert_eq!(cloned.edge_count(), dag.edge_count(), "case {case}: edge count diverged");

            for (from, to) in &edges {
                let from_id = dag.vertex(index_of[*from]).expect("exists").identifier();
                let to_id = dag.vertex(index_of[*to]).expect("exists").identifier();
                let cloned_from = cloned.find_by_id(from_id).expect("case {case}: identifier preserved");
                let cloned_to = cloned.find_by_id(to_id).expect("case {case}: identifier preserved");
                assert!(
                    cloned.are_connected(cloned_from, cloned_to),
                    "case {case}: clone lost edge {from}->{to}"
                );
            }
        }
    }
}
