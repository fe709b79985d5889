//! Bisimulation equivalence via partition refinement.
//!
//! Two graphs are compared by refining one partition over the disjoint union
//! of their vertex sets: starting from a single block holding every vertex,
//! blocks are split as long as some (splitter block, label) pair separates
//! vertices that can move under that label entirely into the splitter from
//! vertices that cannot. At the fixed point, the partition is the coarsest
//! bisimulation, and two roots are equivalent iff they share a block.
//!
//! The partition is recomputed from scratch each round, so the algorithm is
//! polynomial but unoptimized. That is a deliberate trade for protocol-sized
//! state spaces; it is not designed for large graphs.

use std::collections::{BTreeSet, HashSet};

use log::debug;

use crate::graph::{ActionValue, Graph, Label, State, Test, VertexId};

/// One vertex of the disjoint union of the two graphs under comparison.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
enum Node {
    Left(VertexId),
    Right(VertexId),
}

type Block = BTreeSet<Node>;

/// Decides whether every root of `g1` is behaviorally indistinguishable from
/// some root of `g2`, and symmetrically.
///
/// Both graphs are fully expanded from their roots first (equivalence over a
/// partially explored LTS is undefined), so this call diverges on an
/// infinite-state expander.
pub fn are_bisimilar<S, A, T>(g1: &Graph<S, A, T>, g2: &Graph<S, A, T>) -> bool
where
    S: State,
    A: ActionValue,
    T: Test,
{
    g1.expand_roots_recursively();
    g2.expand_roots_recursively();

    let mut nodes = Block::new();
    for i in 0..g1.vertex_count() {
        nodes.insert(Node::Left(VertexId::new(i)));
    }
    for i in 0..g2.vertex_count() {
        nodes.insert(Node::Right(VertexId::new(i)));
    }

    // The alphabet: every label observed in either graph, identified by name.
    let mut labels: Vec<Label<A, T>> = Vec::new();
    for &node in &nodes {
        for label in match node {
            Node::Left(v) => g1.labels(v),
            Node::Right(v) => g2.labels(v),
        } {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
    }

    let mut partition: HashSet<Block> = HashSet::new();
    partition.insert(nodes);

    loop {
        let mut next: HashSet<Block> = HashSet::new();

        for block in &partition {
            let mut intersection = Block::new();
            let mut complement = Block::new();
            let mut split = false;

            'pairs: for splitter in &partition {
                for label in &labels {
                    intersection.clear();
                    complement.clear();

                    for &node in block {
                        if moves_into(g1, g2, node, label, splitter) {
                            intersection.insert(node);
                        } else {
                            complement.insert(node);
                        }
                    }

                    if !intersection.is_empty() && !complement.is_empty() {
                        split = true;
                        break 'pairs;
                    }
                }
            }

            if split {
                next.insert(intersection);
                next.insert(complement);
            } else {
                next.insert(block.clone());
            }
        }

        if next == partition {
            break;
        }
        debug!("partition refined: {} -> {} blocks", partition.len(), next.len());
        partition = next;
    }

    let same_block = |a: Node, b: Node| {
        partition
            .iter()
            .any(|block| block.contains(&a) && block.contains(&b))
    };

    g1.roots().iter().all(|&r1| {
        g2.roots()
            .iter()
            .any(|&r2| same_block(Node::Left(r1), Node::Right(r2)))
    }) && g2.roots().iter().all(|&r2| {
        g1.roots()
            .iter()
            .any(|&r1| same_block(Node::Left(r1), Node::Right(r2)))
    })
}

/// True iff `node` carries `label` and all of its `label`-targets lie inside
/// `splitter`.
fn moves_into<S, A, T>(
    g1: &Graph<S, A, T>,
    g2: &Graph<S, A, T>,
    node: Node,
    label: &Label<A, T>,
    splitter: &Block,
) -> bool
where
    S: State,
    A: ActionValue,
    T: Test,
{
    let (graph, v, wrap): (_, _, fn(VertexId) -> Node) = match node {
        Node::Left(v) => (g1, v, Node::Left as fn(VertexId) -> Node),
        Node::Right(v) => (g2, v, Node::Right as fn(VertexId) -> Node),
    };
    if !graph.labels(v).contains(label) {
        return false;
    }
    graph
        .traverse_now(v, label)
        .into_iter()
        .all(|t| splitter.contains(&wrap(t)))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::graph::AcceptAll;

    type G = Graph<&'static str, char, AcceptAll>;

    fn graph_from(
        root: &'static str,
        edges: &'static [(&'static str, char, &'static str)],
    ) -> G {
        Graph::new([root], move |&s: &&'static str| {
            let mut out: Vec<(Label<char, AcceptAll>, Vec<&'static str>)> = Vec::new();
            for &(src, action, dst) in edges {
                if src == s {
                    out.push((
                        Label::new(action.to_string(), action, AcceptAll),
                        vec![dst],
                    ));
                }
            }
            out
        })
    }

    #[test]
    fn test_single_states_without_edges_are_equivalent() {
        let g1 = graph_from("p", &[]);
        let g2 = graph_from("q", &[]);
        assert!(are_bisimilar(&g1, &g2));
    }

    #[test]
    fn test_unmatched_edge_breaks_equivalence() {
        let g1 = graph_from("p", &[]);
        let g2 = graph_from("q", &[("q", 'a', "q1")]);
        assert!(!are_bisimilar(&g1, &g2));
        assert!(!are_bisimilar(&g2, &g1));
    }

    #[test]
    fn test_isomorphic_relabeled_structures_are_equivalent() {
        // Same branching shape over the same alphabet, different state names.
        let g1 = graph_from(
            "p",
            &[("p", 'a', "p1"), ("p", 'b', "p2"), ("p1", 'c', "p3")],
        );
        let g2 = graph_from(
            "x",
            &[("x", 'a', "y"), ("x", 'b', "z"), ("y", 'c', "w")],
        );
        assert!(are_bisimilar(&g1, &g2));
    }

    #[test]
    fn test_early_vs_late_choice_are_inequivalent() {
        // a;(b+c) versus a;b + a;c: the classic counterexample.
        let late = graph_from(
            "p",
            &[("p", 'a', "p1"), ("p1", 'b', "p2"), ("p1", 'c', "p3")],
        );
        let early = graph_from(
            "q",
            &[
                ("q", 'a', "q1"),
                ("q", 'a', "q2"),
                ("q1", 'b', "q3"),
                ("q2", 'c', "q4"),
            ],
        );
        assert!(!are_bisimilar(&late, &early));
    }

    #[test]
    fn test_cycle_folding() {
        // A 1-cycle and a 2-cycle under the same label are bisimilar.
        let one: G = Graph::new(["p"], |_s: &&'static str| {
            vec![(Label::new("a", 'a', AcceptAll), vec!["p"])]
        });
        let two = graph_from("q", &[("q", 'a', "r"), ("r", 'a', "q")]);
        assert!(are_bisimilar(&one, &two));
    }

    #[test]
    fn test_label_names_are_the_identity() {
        // Same shape but a differently named edge: the alphabets differ, so
        // the roots separate.
        let g1 = graph_from("p", &[("p", 'a', "p1")]);
        let g2 = graph_from("q", &[("q", 'b', "q1")]);
        assert!(!are_bisimilar(&g1, &g2));
    }
}
