//! Global CTL model checking over a fully expanded graph.
//!
//! A [`Model`] binds a graph to the label cache consulted by the formula
//! engine. Labeling is *global*: computing a formula's satisfaction set
//! sweeps every state of the model, so queries after labeling are O(1)
//! set-membership tests. The flip side is a hard precondition: the graph must
//! be fully expanded before the model is built — the model snapshots the
//! successor and predecessor relations at construction, and states discovered
//! later are invisible to it.
//!
//! Labeling is memoized per `(model, formula)` pair, keyed by the formula's
//! interned handle (structural equality). A compound formula labels its
//! operands first, bottom-up, so operands are fully evaluated before being
//! queried and shared sub-formulas are evaluated exactly once.

use std::collections::HashMap;

use log::debug;

use crate::action::Action;
use crate::bitset::BitSet;
use crate::formula::{Formula, FormulaId, Formulas};
use crate::graph::{ActionValue, Graph, State, Test, VertexId};

/// Access to the action that produced a state.
pub trait ProtocolState {
    /// The action that led into this state, or `None` for an initial
    /// pseudo-state.
    fn action(&self) -> Option<&Action>;
}

/// A graph bound to its formula label cache.
pub struct Model<'g, S, A, T> {
    graph: &'g Graph<S, A, T>,
    actions: Vec<Option<Action>>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    labels: HashMap<FormulaId, BitSet>,
}

impl<'g, S, A, T> Model<'g, S, A, T>
where
    S: State + ProtocolState,
    A: ActionValue,
    T: Test,
{
    /// Builds a model over the graph's current state set.
    ///
    /// Precondition: the graph is fully expanded (e.g. via
    /// [`Graph::expand_roots_recursively`]). An unexpanded vertex is treated
    /// as having no successors; the model does not re-run the expander. A
    /// model is invalid for reuse once its graph has grown.
    pub fn new(graph: &'g Graph<S, A, T>) -> Self {
        let n = graph.vertex_count();
        let mut actions = Vec::with_capacity(n);
        let mut successors = Vec::with_capacity(n);
        let mut predecessors = vec![Vec::new(); n];
        for i in 0..n {
            let v = VertexId::new(i);
            actions.push(graph.state(v).action().cloned());
            let succ: Vec<usize> = graph.successors(v).iter().map(|t| t.index()).collect();
            for &t in &succ {
                predecessors[t].push(i);
            }
            successors.push(succ);
        }
        for preds in &mut predecessors {
            preds.sort_unstable();
            preds.dedup();
        }
        Model {
            graph,
            actions,
            successors,
            predecessors,
            labels: HashMap::new(),
        }
    }

    /// Number of states in the model.
    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    /// Whether `f` has already been labeled in this model.
    pub fn is_labelled(&self, f: FormulaId) -> bool {
        self.labels.contains_key(&f)
    }

    /// Labels `f` in this model: a no-op if already labeled, otherwise
    /// labels every operand first, then computes and records this node's
    /// satisfaction set over every state.
    pub fn label(&mut self, formulas: &Formulas, f: FormulaId) {
        if self.is_labelled(f) {
            return;
        }
        let node = formulas.node(f);
        for operand in node.operands() {
            self.label(formulas, operand);
        }
        debug!("label({}) over {} states", formulas.pretty(f), self.state_count());
        let set = self.compute(&node);
        self.labels.insert(f, set);
    }

    /// O(1) satisfaction test after labeling.
    ///
    /// # Panics
    ///
    /// Panics if `f` has not been labeled in this model.
    pub fn has_label(&self, v: VertexId, f: FormulaId) -> bool {
        self.labelled_set(f).contains(v.index())
    }

    /// The states satisfying a labeled formula, in id order.
    pub fn satisfying_states(&self, f: FormulaId) -> Vec<VertexId> {
        self.labelled_set(f).iter().map(VertexId::new).collect()
    }

    /// True iff every designated initial state satisfies the labeled `f`.
    pub fn holds_at_roots(&self, f: FormulaId) -> bool {
        let set = self.labelled_set(f);
        self.graph.roots().iter().all(|r| set.contains(r.index()))
    }

    /// Labels `f` and reports satisfaction at the roots in one step.
    pub fn check(&mut self, formulas: &Formulas, f: FormulaId) -> bool {
        self.label(formulas, f);
        self.holds_at_roots(f)
    }

    fn labelled_set(&self, f: FormulaId) -> &BitSet {
        match self.labels.get(&f) {
            Some(set) => set,
            None => panic!("Formula {} is not labelled in this model", f),
        }
    }

    fn compute(&self, node: &Formula) -> BitSet {
        let n = self.state_count();
        match node {
            Formula::True => (0..n).collect(),
            Formula::Atom(atom) => (0..n)
                .filter(|&i| atom.holds(self.actions[i].as_ref()))
                .collect(),
            Formula::Not(a) => {
                let arg = self.labelled_set(*a);
                (0..n).filter(|&i| !arg.contains(i)).collect()
            }
            Formula::And(args) => {
                let mut set: BitSet = (0..n).collect();
                for a in args {
                    set.intersect_with(self.labelled_set(*a));
                }
                set
            }
            Formula::Or(args) => {
                let mut set = BitSet::new(n);
                for a in args {
                    set.union_with(self.labelled_set(*a));
                }
                set
            }
            Formula::Implies(l, r) => {
                let lhs = self.labelled_set(*l);
                let rhs = self.labelled_set(*r);
                (0..n)
                    .filter(|&i| !lhs.contains(i) || rhs.contains(i))
                    .collect()
            }
            Formula::EX(a) => self.next_states(self.labelled_set(*a), &self.successors, false),
            Formula::AX(a) => self.next_states(self.labelled_set(*a), &self.successors, true),
            Formula::EY(a) => self.next_states(self.labelled_set(*a), &self.predecessors, false),
            Formula::AY(a) => self.next_states(self.labelled_set(*a), &self.predecessors, true),
            Formula::EU(l, r) => self.until(*l, *r, &self.successors, false),
            Formula::AU(l, r) => self.until(*l, *r, &self.successors, true),
            Formula::ES(l, r) => self.until(*l, *r, &self.predecessors, false),
            Formula::AS(l, r) => self.until(*l, *r, &self.predecessors, true),
        }
    }

    /// `EX`/`AX` (or `EY`/`AY` when `steps` is the predecessor relation).
    ///
    /// Universal next requires at least one step: a state with no steps never
    /// satisfies `AX φ`, not even for `φ = true`. Vacuous truth is rejected.
    fn next_states(&self, arg: &BitSet, steps: &[Vec<usize>], universal: bool) -> BitSet {
        let n = self.state_count();
        (0..n)
            .filter(|&i| {
                let step = &steps[i];
                if universal {
                    !step.is_empty() && step.iter().all(|&s| arg.contains(s))
                } else {
                    step.iter().any(|&s| arg.contains(s))
                }
            })
            .collect()
    }

    /// Backward least fixpoint for `EU`/`AU` (or `ES`/`AS` over the
    /// predecessor relation): seed with the states satisfying `rhs`, then
    /// grow by states satisfying `lhs` from which the next step stays in the
    /// set — some step for the existential form, at least one step and all of
    /// them for the universal form. Iterate until no more states are added.
    fn until(&self, lhs: FormulaId, rhs: FormulaId, steps: &[Vec<usize>], universal: bool) -> BitSet {
        let n = self.state_count();
        let lhs = self.labelled_set(lhs);
        let mut set = self.labelled_set(rhs).clone();
        loop {
            let mut changed = false;
            for i in 0..n {
                if set.contains(i) || !lhs.contains(i) {
                    continue;
                }
                let step = &steps[i];
                let joins = if universal {
                    !step.is_empty() && step.iter().all(|&s| set.contains(s))
                } else {
                    step.iter().any(|&s| set.contains(s))
                };
                if joins {
                    set.insert(i);
                    changed = true;
                }
            }
            if !changed {
                return set;
            }
        }
    }
}

impl<S, A, T> std::fmt::Debug for Model<'_, S, A, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("states", &self.actions.len())
            .field("labelled", &self.labels.len())
            .finish()
    }
}
