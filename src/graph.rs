//! Lazily expanded labeled transition systems.
//!
//! The [`Graph`] manager owns the canonical vertex registry and drives lazy
//! expansion. Like every manager in this crate, all operations go through it:
//! vertices are addressed by lightweight [`VertexId`] handles assigned in
//! first-discovery order, and the vertex for a given state is created at most
//! once (hash consing on the state value).
//!
//! # Lazy expansion
//!
//! A graph is built from a set of initial states and an *expander*: a pure
//! function from a state to its outgoing transitions, grouped by [`Label`].
//! Nothing beyond the root vertices exists until [`Graph::expand`] is called;
//! each call materializes exactly one ply of edges, resolving target states to
//! canonical vertices as a side effect. [`Graph::expand_recursively`] chases
//! the frontier breadth-first until the reachable state space is exhausted.
//!
//! Termination of recursive expansion requires the reachable state space to be
//! finite. This is a precondition on the front end, not something the engine
//! detects: an expander that keeps inventing fresh states diverges. It also
//! depends on the canonical-identity invariant of [`State`]: two independently
//! constructed states describing the same configuration must compare equal, or
//! a recursive protocol unfolds into an infinite tree instead of folding back
//! into a cycle.
//!
//! # Concurrency
//!
//! Independent workers may walk different frontiers of one shared graph. The
//! expander runs outside any lock; the computed edge set is installed with an
//! atomic install-if-absent, so of two concurrent expansions of one vertex the
//! loser's work is discarded, never observed half-written.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock, RwLock};

use log::{debug, trace};

/// Capabilities required of a front-end state type.
///
/// Blanket-implemented: any `Clone + Eq + Hash` type is a state.
pub trait State: Clone + Eq + Hash {}

impl<S: Clone + Eq + Hash> State for S {}

/// Capabilities required of an edge-label action value.
pub trait ActionValue: Clone + Eq + Hash {}

impl<A: Clone + Eq + Hash> ActionValue for A {}

/// A test predicate attached to an edge label.
///
/// Tests are evaluated against a caller-supplied probe at query time and
/// compared by value when indexing edges, so a test type needs both equality
/// and evaluation.
pub trait Test: Clone + Eq + Hash {
    type Probe;

    fn accepts(&self, probe: &Self::Probe) -> bool;
}

/// A test predicate that accepts every probe.
///
/// Convenient for graphs whose labels carry no guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct AcceptAll;

impl Test for AcceptAll {
    type Probe = ();

    fn accepts(&self, _probe: &()) -> bool {
        true
    }
}

/// Stable vertex handle, assigned in first-discovery order starting at 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct VertexId(u32);

impl VertexId {
    pub(crate) fn new(index: usize) -> Self {
        VertexId(index as u32)
    }

    /// Returns the vertex id as a dense index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An edge label: a display name, an action value, and a test predicate.
///
/// The name is the label's identity: two labels are equal exactly when their
/// names are equal, even if their actions or tests differ structurally.
/// Callers must keep names consistent with their semantic meaning.
#[derive(Debug, Clone)]
pub struct Label<A, T> {
    pub name: String,
    pub action: A,
    pub test: T,
}

impl<A, T> Label<A, T> {
    pub fn new(name: impl Into<String>, action: A, test: T) -> Self {
        Label {
            name: name.into(),
            action,
            test,
        }
    }
}

impl<A, T> PartialEq for Label<A, T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<A, T> Eq for Label<A, T> {}

impl<A, T> Hash for Label<A, T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<A, T> fmt::Display for Label<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A transition between two vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge<A, T> {
    pub source: VertexId,
    pub target: VertexId,
    pub label: Label<A, T>,
}

/// The one-ply expansion of a vertex: edges in insertion order, plus an index
/// over `(action, test)` for matching queries.
///
/// The index is a performance detail; every query is equivalent to a linear
/// scan over the edges comparing action equality and evaluating tests.
#[derive(Debug)]
pub struct EdgeSet<A, T> {
    edges: Vec<Edge<A, T>>,
    index: HashMap<A, HashMap<T, Vec<VertexId>>>,
}

impl<A: ActionValue, T: Test> EdgeSet<A, T> {
    fn new() -> Self {
        EdgeSet {
            edges: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn insert(&mut self, edge: Edge<A, T>) {
        if self.edges.contains(&edge) {
            return;
        }
        let targets = self
            .index
            .entry(edge.label.action.clone())
            .or_default()
            .entry(edge.label.test.clone())
            .or_default();
        if !targets.contains(&edge.target) {
            targets.push(edge.target);
        }
        self.edges.push(edge);
    }

    /// Number of distinct edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge<A, T>] {
        &self.edges
    }

    /// Distinct labels in insertion order.
    pub fn labels(&self) -> Vec<&Label<A, T>> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .map(|e| &e.label)
            .filter(|l| seen.insert(&l.name))
            .collect()
    }

    /// All targets, sorted by id.
    pub fn targets(&self) -> Vec<VertexId> {
        sorted_dedup(self.edges.iter().map(|e| e.target).collect())
    }

    /// Targets reachable via an edge whose `(action, test)` equals the
    /// label's, sorted by id.
    pub fn targets_for_label(&self, label: &Label<A, T>) -> Vec<VertexId> {
        let targets = self
            .index
            .get(&label.action)
            .and_then(|m| m.get(&label.test))
            .cloned()
            .unwrap_or_default();
        sorted_dedup(targets)
    }

    /// Targets reachable via an edge whose action equals `action` and whose
    /// test accepts `probe`, sorted by id.
    pub fn targets_matching(&self, action: &A, probe: &T::Probe) -> Vec<VertexId> {
        let mut targets = Vec::new();
        if let Some(m) = self.index.get(action) {
            for (test, vs) in m {
                if test.accepts(probe) {
                    targets.extend_from_slice(vs);
                }
            }
        }
        sorted_dedup(targets)
    }
}

fn sorted_dedup(mut vs: Vec<VertexId>) -> Vec<VertexId> {
    vs.sort();
    vs.dedup();
    vs
}

/// The expander signature: one state in, its outgoing transitions out,
/// grouped by label. Assumed pure; invoked at most once per canonical vertex.
pub type Expander<S, A, T> = dyn Fn(&S) -> Vec<(Label<A, T>, Vec<S>)> + Send + Sync;

struct VertexData<S, A, T> {
    state: S,
    edges: OnceLock<EdgeSet<A, T>>,
}

/// A lazily expanded LTS: roots, the canonical vertex registry, and the
/// expander driving growth.
///
/// Immutable once constructed except for the monotonic growth of vertices as
/// expansion proceeds; vertices and edge sets are never removed.
pub struct Graph<S, A, T> {
    expander: Box<Expander<S, A, T>>,
    roots: Vec<VertexId>,
    registry: RwLock<HashMap<S, VertexId>>,
    vertices: RwLock<Vec<Arc<VertexData<S, A, T>>>>,
}

impl<S: State, A: ActionValue, T: Test> Graph<S, A, T> {
    /// Creates a graph with one root vertex per distinct initial state.
    pub fn new(
        initial_states: impl IntoIterator<Item = S>,
        expander: impl Fn(&S) -> Vec<(Label<A, T>, Vec<S>)> + Send + Sync + 'static,
    ) -> Self {
        let mut graph = Graph {
            expander: Box::new(expander),
            roots: Vec::new(),
            registry: RwLock::new(HashMap::new()),
            vertices: RwLock::new(Vec::new()),
        };
        let mut roots = Vec::new();
        for state in initial_states {
            let v = graph.get_or_create_vertex(state);
            if !roots.contains(&v) {
                roots.push(v);
            }
        }
        graph.roots = roots;
        graph
    }

    /// Returns the canonical vertex for `state`, creating and id-assigning it
    /// on first use. Total: equal states always map to the same vertex.
    pub fn get_or_create_vertex(&self, state: S) -> VertexId {
        if let Some(&v) = self.registry.read().unwrap().get(&state) {
            return v;
        }
        let mut registry = self.registry.write().unwrap();
        // A concurrent creator may have won the race for this state.
        if let Some(&v) = registry.get(&state) {
            return v;
        }
        let mut vertices = self.vertices.write().unwrap();
        let v = VertexId::new(vertices.len());
        vertices.push(Arc::new(VertexData {
            state: state.clone(),
            edges: OnceLock::new(),
        }));
        registry.insert(state, v);
        trace!("vertex {} created", v);
        v
    }

    fn vertex(&self, v: VertexId) -> Arc<VertexData<S, A, T>> {
        let vertices = self.vertices.read().unwrap();
        assert!(
            v.index() < vertices.len(),
            "Vertex {} is not registered in this graph",
            v
        );
        Arc::clone(&vertices[v.index()])
    }

    /// The root (initial) vertices.
    pub fn roots(&self) -> &[VertexId] {
        &self.roots
    }

    /// Number of vertices discovered so far.
    pub fn vertex_count(&self) -> usize {
        self.vertices.read().unwrap().len()
    }

    /// Total number of edges over all expanded vertices so far.
    pub fn edge_count(&self) -> usize {
        let vertices = self.vertices.read().unwrap();
        vertices
            .iter()
            .map(|v| v.edges.get().map_or(0, EdgeSet::len))
            .sum()
    }

    /// The state of a vertex.
    ///
    /// # Panics
    ///
    /// Panics if `v` is not registered in this graph.
    pub fn state(&self, v: VertexId) -> S {
        self.vertex(v).state.clone()
    }

    pub fn is_expanded(&self, v: VertexId) -> bool {
        self.vertex(v).edges.get().is_some()
    }

    /// Distinct labels on the outgoing edges of `v`; empty if unexpanded.
    pub fn labels(&self, v: VertexId) -> Vec<Label<A, T>> {
        match self.vertex(v).edges.get() {
            Some(edges) => edges.labels().into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// The outgoing edges of `v` in insertion order; empty if unexpanded.
    pub fn edges(&self, v: VertexId) -> Vec<Edge<A, T>> {
        match self.vertex(v).edges.get() {
            Some(edges) => edges.edges().to_vec(),
            None => Vec::new(),
        }
    }

    /// Direct successors of `v`, sorted by id; empty if unexpanded.
    pub fn successors(&self, v: VertexId) -> Vec<VertexId> {
        match self.vertex(v).edges.get() {
            Some(edges) => edges.targets(),
            None => Vec::new(),
        }
    }

    /// Computes one ply of outgoing edges for `v`, exactly once logically.
    ///
    /// Idempotent: a second call on an expanded vertex is a no-op. Concurrent
    /// callers may each run the expander, but only one edge set is installed;
    /// the losers' work is discarded, never corrupting the installed set.
    pub fn expand(&self, v: VertexId) {
        let vertex = self.vertex(v);
        if vertex.edges.get().is_some() {
            return;
        }
        debug!("expand({})", v);
        let mut expansion = EdgeSet::new();
        for (label, target_states) in (self.expander)(&vertex.state) {
            for target_state in target_states {
                let target = self.get_or_create_vertex(target_state);
                expansion.insert(Edge {
                    source: v,
                    target,
                    label: label.clone(),
                });
            }
        }
        // Install-if-absent: a concurrent winner keeps its expansion.
        let _ = vertex.edges.set(expansion);
    }

    /// Expands everything reachable from `v`, breadth-first.
    ///
    /// Terminates iff the reachable state space is finite; see module docs.
    pub fn expand_recursively(&self, v: VertexId) {
        self.expand_recursively_depth(v, usize::MAX);
    }

    /// Expands breadth-first up to `depth` plies from `v`.
    pub fn expand_recursively_depth(&self, v: VertexId, depth: usize) {
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        queue.push_back((v, depth));
        seen.insert(v);
        while let Some((v, depth)) = queue.pop_front() {
            if depth == 0 {
                continue;
            }
            self.expand(v);
            for target in self.successors(v) {
                if seen.insert(target) {
                    queue.push_back((target, depth - 1));
                }
            }
        }
    }

    /// Expands one ply of every root.
    pub fn expand_roots(&self) {
        for &root in &self.roots {
            self.expand(root);
        }
    }

    /// Fully expands the graph from every root.
    pub fn expand_roots_recursively(&self) {
        for &root in &self.roots {
            self.expand_recursively(root);
        }
    }

    /// Forces one-ply expansion of `v`, then returns the immediate targets
    /// reachable via an edge whose `(action, test)` equals the label's.
    pub fn traverse_now(&self, v: VertexId, label: &Label<A, T>) -> Vec<VertexId> {
        self.expand(v);
        match self.vertex(v).edges.get() {
            Some(edges) => edges.targets_for_label(label),
            None => Vec::new(),
        }
    }

    /// Forces one-ply expansion of `v`, then returns the immediate targets
    /// reachable via an edge whose action equals `action` and whose test
    /// accepts `probe`.
    pub fn traverse_now_with(&self, v: VertexId, action: &A, probe: &T::Probe) -> Vec<VertexId> {
        self.expand(v);
        match self.vertex(v).edges.get() {
            Some(edges) => edges.targets_matching(action, probe),
            None => Vec::new(),
        }
    }

    /// Searches the already-expanded subgraph reachable from `v` for any
    /// vertex with an immediate transition matching `(action, probe)`.
    ///
    /// This traversal does not trigger expansion: unexpanded vertices are
    /// treated as dead ends. Callers that need an exhaustive answer must
    /// pre-expand, e.g. with [`Graph::expand_recursively`].
    pub fn traverse_eventually(&self, v: VertexId, action: &A, probe: &T::Probe) -> bool {
        let mut todo = vec![v];
        let mut done = HashSet::new();
        done.insert(v);
        while let Some(v) = todo.pop() {
            let vertex = self.vertex(v);
            let Some(edges) = vertex.edges.get() else {
                continue;
            };
            if !edges.targets_matching(action, probe).is_empty() {
                return true;
            }
            for target in edges.targets() {
                if done.insert(target) {
                    todo.push(target);
                }
            }
        }
        false
    }

    /// [`Graph::traverse_eventually`] over a collection of sources.
    pub fn traverse_any_eventually(
        &self,
        sources: &[VertexId],
        action: &A,
        probe: &T::Probe,
    ) -> bool {
        sources
            .iter()
            .any(|&v| self.traverse_eventually(v, action, probe))
    }

    /// Union of [`Graph::traverse_now_with`] over a collection of sources,
    /// sorted by id.
    pub fn traverse_all_now(
        &self,
        sources: &[VertexId],
        action: &A,
        probe: &T::Probe,
    ) -> Vec<VertexId> {
        let mut targets = Vec::new();
        for &v in sources {
            targets.extend(self.traverse_now_with(v, action, probe));
        }
        sorted_dedup(targets)
    }
}

impl<S, A, T> fmt::Debug for Graph<S, A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let vertices = self.vertices.read().unwrap();
        let expanded = vertices.iter().filter(|v| v.edges.get().is_some()).count();
        f.debug_struct("Graph")
            .field("roots", &self.roots.len())
            .field("vertices", &vertices.len())
            .field("expanded", &expanded)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use test_log::test;

    use super::*;

    // States are plain integers; edge actions are single chars.
    fn ring(n: u32) -> Graph<u32, char, AcceptAll> {
        Graph::new([0], move |&s: &u32| {
            vec![(
                Label::new(format!("step{}", s), 'a', AcceptAll),
                vec![(s + 1) % n],
            )]
        })
    }

    #[test]
    fn test_get_or_create_is_canonical() {
        let graph = ring(3);
        let v0 = graph.get_or_create_vertex(0);
        let v1 = graph.get_or_create_vertex(1);
        assert_eq!(graph.get_or_create_vertex(0), v0);
        assert_eq!(graph.get_or_create_vertex(1), v1);
        assert_eq!(v0.index(), 0);
        assert_eq!(v1.index(), 1);
        assert_eq!(graph.roots(), &[v0]);
    }

    #[test]
    fn test_expansion_folds_cycles() {
        let graph = ring(4);
        graph.expand_roots_recursively();
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_expand_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0], move |&s: &u32| {
            counter.fetch_add(1, Ordering::SeqCst);
            if s == 0 {
                vec![(Label::new("a", 'a', AcceptAll), vec![1, 2])]
            } else {
                vec![]
            }
        });
        let root = graph.roots()[0];
        graph.expand(root);
        let first = graph.edges(root);
        graph.expand(root);
        assert_eq!(graph.edges(root), first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_depth_bounded_expansion() {
        let graph = ring(10);
        let root = graph.roots()[0];
        graph.expand_recursively_depth(root, 3);
        // Plies 0..3 expanded: vertices 0..=3 discovered, 3 expanded.
        assert_eq!(graph.vertex_count(), 4);
        assert!(graph.is_expanded(root));
        assert!(!graph.is_expanded(VertexId::new(3)));
    }

    #[test]
    fn test_concurrent_expansion_installs_one_edge_set() {
        let graph = Arc::new(ring(64));
        let root = graph.roots()[0];
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let graph = Arc::clone(&graph);
                scope.spawn(move || {
                    graph.expand_recursively(root);
                });
            }
        });
        assert_eq!(graph.vertex_count(), 64);
        assert_eq!(graph.edge_count(), 64);
        for i in 0..64 {
            assert_eq!(graph.successors(VertexId::new(i)).len(), 1);
        }
    }

    #[test]
    fn test_traverse_now_matches_action_and_test() {
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0], |&s: &u32| {
            if s == 0 {
                vec![
                    (Label::new("a", 'a', AcceptAll), vec![1]),
                    (Label::new("b", 'b', AcceptAll), vec![2]),
                ]
            } else {
                vec![]
            }
        });
        let root = graph.roots()[0];
        let targets = graph.traverse_now_with(root, &'a', &());
        assert_eq!(targets.len(), 1);
        assert_eq!(graph.state(targets[0]), 1);
        assert!(graph.traverse_now_with(root, &'c', &()).is_empty());

        let label = Label::new("b", 'b', AcceptAll);
        let targets = graph.traverse_now(root, &label);
        assert_eq!(targets.len(), 1);
        assert_eq!(graph.state(targets[0]), 2);
    }

    #[test]
    fn test_traverse_eventually_stops_at_unexpanded_frontier() {
        // 0 -a-> 1 -a-> 2 -b-> 3
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0], |&s: &u32| match s {
            0 | 1 => vec![(Label::new(format!("a{}", s), 'a', AcceptAll), vec![s + 1])],
            2 => vec![(Label::new("b", 'b', AcceptAll), vec![3])],
            _ => vec![],
        });
        let root = graph.roots()[0];
        graph.expand_recursively_depth(root, 2);
        // Vertex 2 is discovered but unexpanded: its `b` edge is invisible.
        assert!(!graph.traverse_eventually(root, &'b', &()));
        graph.expand_recursively(root);
        assert!(graph.traverse_eventually(root, &'b', &()));
    }

    #[test]
    fn test_collection_traversals() {
        // 0 -a-> 1, 2 -b-> 3
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0, 2], |&s: &u32| match s {
            0 => vec![(Label::new("a", 'a', AcceptAll), vec![1])],
            2 => vec![(Label::new("b", 'b', AcceptAll), vec![3])],
            _ => vec![],
        });
        graph.expand_roots_recursively();
        let roots = graph.roots().to_vec();

        assert!(graph.traverse_any_eventually(&roots, &'b', &()));
        assert!(!graph.traverse_any_eventually(&roots, &'c', &()));

        let now = graph.traverse_all_now(&roots, &'a', &());
        assert_eq!(now.len(), 1);
        assert_eq!(graph.state(now[0]), 1);
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn test_unregistered_vertex_panics() {
        let graph = ring(3);
        graph.state(VertexId::new(7));
    }

    #[test]
    fn test_edge_set_dedups_by_label_name() {
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0], |&s: &u32| {
            if s == 0 {
                // Same label and target twice; one edge must survive.
                vec![
                    (Label::new("a", 'a', AcceptAll), vec![1, 1]),
                    (Label::new("a", 'a', AcceptAll), vec![1]),
                ]
            } else {
                vec![]
            }
        });
        let root = graph.roots()[0];
        graph.expand(root);
        assert_eq!(graph.edges(root).len(), 1);
        assert_eq!(graph.edge_count(), 1);
    }
}
