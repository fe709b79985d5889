//! # lts-rs: labeled transition systems for protocol verification
//!
//! **`lts-rs`** is a state-space engine for verifying properties of
//! multi-role communication protocols. A front end describes a protocol as a
//! set of initial states plus an *expander* function; this crate materializes
//! the protocol's finite labeled transition system (LTS) lazily, answers
//! temporal-logic queries over it, and decides behavioral equivalence between
//! two LTSs.
//!
//! ## Key features
//!
//! - **Manager-centric architecture**: the [`Graph`][crate::graph::Graph]
//!   manager owns the canonical vertex registry (one vertex per distinct
//!   state, hash consing on the state value) and hands out lightweight
//!   [`VertexId`][crate::graph::VertexId] handles. The
//!   [`Formulas`][crate::formula::Formulas] manager does the same for
//!   formulas, so structurally identical formulas share one handle and the
//!   label cache is keyed by cheap handle comparisons.
//! - **Lazy, race-safe expansion**: edges are computed one ply at a time by
//!   the externally supplied expander and installed with an atomic
//!   install-if-absent, so independent workers can explore one shared graph
//!   without locks around the expander.
//! - **Global CTL model checking**: future (`EX AX EF AF EG AG EU AU`) and
//!   past (`EY AY EP AP ES AS`) operators, labeled bottom-up over the full
//!   state set with exact fixpoint semantics; queries after labeling are
//!   O(1). Universal next/previous reject vacuous truth: a state without
//!   successors never satisfies `AX φ`.
//! - **Bisimulation checking**: partition refinement over two fully expanded
//!   graphs decides whether their roots are behaviorally indistinguishable.
//!
//! ## Quick start
//!
//! ```rust
//! use lts_rs::action::Action;
//! use lts_rs::formula::Formulas;
//! use lts_rs::graph::{AcceptAll, Graph, Label};
//! use lts_rs::model::{Model, ProtocolState};
//!
//! // One protocol configuration: a phase tag plus the action that led here.
//! #[derive(Clone, PartialEq, Eq, Hash)]
//! struct Config {
//!     phase: u8,
//!     action: Option<Action>,
//! }
//!
//! impl ProtocolState for Config {
//!     fn action(&self) -> Option<&Action> {
//!         self.action.as_ref()
//!     }
//! }
//!
//! // a sends to b, then the channel is closed.
//! let initial = Config { phase: 0, action: None };
//! let graph = Graph::new([initial], |c: &Config| match c.phase {
//!     0 => vec![(
//!         Label::new("send(a,b)", Action::send("a", "b"), AcceptAll),
//!         vec![Config { phase: 1, action: Some(Action::send("a", "b")) }],
//!     )],
//!     1 => vec![(
//!         Label::new("close(a,b)", Action::close("a", "b"), AcceptAll),
//!         vec![Config { phase: 2, action: Some(Action::close("a", "b")) }],
//!     )],
//!     _ => vec![],
//! });
//!
//! // The formula engine is global: expand everything first.
//! graph.expand_roots_recursively();
//!
//! // "On every path, the channel is eventually closed."
//! let formulas = Formulas::new();
//! let closed = formulas.af(formulas.close("a", "b"));
//!
//! let mut model = Model::new(&graph);
//! assert!(model.check(&formulas, closed));
//! ```
//!
//! ## Core components
//!
//! - **[`graph`]**: the lazily expanded LTS: vertex registry, labels, edges,
//!   expansion, traversals.
//! - **[`formula`]**: the interned formula arena and constructor API.
//! - **[`model`]**: the labeling engine binding a graph to its label cache.
//! - **[`bisim`]**: bisimulation equivalence via partition refinement.
//! - **[`export`]**: the `des` exchange format for external tooling.
//!
//! ## Preconditions, not runtime checks
//!
//! The engine assumes finite reachable state spaces and fully expanded graphs
//! where documented. Recursive expansion and fixpoint labeling diverge on
//! genuinely infinite input; there is no cycle or size detection, no
//! cancellation and no timeouts. Precondition violations (querying an
//! unregistered vertex, exporting a multi-root graph) fail immediately.

pub mod action;
pub mod bisim;
pub mod bitset;
pub mod export;
pub mod formula;
pub mod graph;
pub mod model;
