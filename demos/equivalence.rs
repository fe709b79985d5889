//! Compares protocol variants for behavioral equivalence.
//!
//! Run with:
//! ```bash
//! cargo run --example equivalence
//! ```

use lts_rs::bisim::are_bisimilar;
use lts_rs::graph::{AcceptAll, Graph, Label};

type G = Graph<&'static str, &'static str, AcceptAll>;

/// Builds a graph from a static edge list: `(source, label, target)`.
fn graph_from(root: &'static str, edges: &'static [(&'static str, &'static str, &'static str)]) -> G {
    Graph::new([root], move |&s: &&'static str| {
        edges
            .iter()
            .filter(|(src, _, _)| *src == s)
            .map(|&(_, label, dst)| (Label::new(label, label, AcceptAll), vec![dst]))
            .collect()
    })
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Debug,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    // The same request-reply protocol, unrolled differently: one loops back
    // to its initial state, the other alternates between two copies.
    let looped = graph_from(
        "p0",
        &[("p0", "send(a,b)", "p1"), ("p1", "send(b,a)", "p0")],
    );
    let unrolled = graph_from(
        "q0",
        &[
            ("q0", "send(a,b)", "q1"),
            ("q1", "send(b,a)", "q2"),
            ("q2", "send(a,b)", "q3"),
            ("q3", "send(b,a)", "q0"),
        ],
    );
    println!(
        "looped ~ unrolled: {}",
        are_bisimilar(&looped, &unrolled)
    );

    // Moving the choice point changes behavior: a;(b+c) versus a;b + a;c.
    let late_choice = graph_from(
        "p",
        &[
            ("p", "send(a,b)", "p1"),
            ("p1", "send(b,a)", "p2"),
            ("p1", "close(a,b)", "p3"),
        ],
    );
    let early_choice = graph_from(
        "q",
        &[
            ("q", "send(a,b)", "q1"),
            ("q", "send(a,b)", "q2"),
            ("q1", "send(b,a)", "q3"),
            ("q2", "close(a,b)", "q4"),
        ],
    );
    println!(
        "late-choice ~ early-choice: {}",
        are_bisimilar(&late_choice, &early_choice)
    );

    Ok(())
}
