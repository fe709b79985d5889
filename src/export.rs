//! Textual export of a graph in the explicit-state `des` exchange format.
//!
//! The format is a compatibility surface for external model-checking tools:
//!
//! ```text
//! des (<root-id>,<edge-count>,<vertex-count>)
//! <edges of vertex 0>
//! <edges of vertex 1>
//! ...
//! ```
//!
//! The header is followed by one line per vertex in id order starting at 0;
//! each line lists the vertex's outgoing edges as `<label-name>(<target-id>)`
//! tokens, comma separated. A vertex without outgoing edges (terminal or
//! unexpanded) contributes an empty line.
//!
//! Exporting requires exactly one root and that root to have id 0; violating
//! either fails fast with an [`ExportError`]. [`parse_des`] reads the format
//! back into an adjacency structure, so exported graphs round-trip.

use thiserror::Error;

use crate::graph::{ActionValue, Graph, State, Test};

/// Why a graph could not be exported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportError {
    #[error("graph must have exactly one root, found {0}")]
    RootCount(usize),
    #[error("the root must have vertex id 0, found {0}")]
    RootId(usize),
}

/// Why a `des` document could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing `des (...)` header")]
    MissingHeader,
    #[error("malformed header: `{0}`")]
    MalformedHeader(String),
    #[error("line {line}: malformed edge token `{token}`")]
    MalformedEdge { line: usize, token: String },
    #[error("header declares {declared} edges, found {found}")]
    EdgeCountMismatch { declared: usize, found: usize },
    #[error("header declares {declared} vertices, found {found}")]
    VertexCountMismatch { declared: usize, found: usize },
}

impl<S: State, A: ActionValue, T: Test> Graph<S, A, T> {
    /// Renders the graph in the `des` format.
    ///
    /// The edge and vertex counts in the header reflect the current expansion
    /// state; callers that want the full LTS must expand first.
    pub fn to_des(&self) -> Result<String, ExportError> {
        if self.roots().len() != 1 {
            return Err(ExportError::RootCount(self.roots().len()));
        }
        let root = self.roots()[0];
        if root.index() != 0 {
            return Err(ExportError::RootId(root.index()));
        }

        let n = self.vertex_count();
        let mut lines = Vec::with_capacity(n + 1);
        lines.push(format!("des (0,{},{})", self.edge_count(), n));
        for i in 0..n {
            let tokens: Vec<String> = self
                .edges(crate::graph::VertexId::new(i))
                .iter()
                .map(|e| format!("{}({})", e.label.name, e.target))
                .collect();
            lines.push(tokens.join(","));
        }
        Ok(lines.join("\n"))
    }
}

/// The parsed form of a `des` document: header counts plus adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesGraph {
    pub root: usize,
    pub edge_count: usize,
    pub vertex_count: usize,
    /// Outgoing edges per vertex in id order: `(label name, target id)`.
    pub adjacency: Vec<Vec<(String, usize)>>,
}

/// Parses a `des` document produced by [`Graph::to_des`] (or external
/// tooling emitting the same format).
pub fn parse_des(input: &str) -> Result<DesGraph, ParseError> {
    let mut lines = input.lines();
    let header = lines.next().ok_or(ParseError::MissingHeader)?;
    let (root, edge_count, vertex_count) = parse_header(header)?;

    let mut adjacency = Vec::new();
    let mut found_edges = 0;
    for (i, line) in lines.enumerate() {
        let mut edges = Vec::new();
        for token in split_edge_tokens(line) {
            let edge = parse_edge_token(token).ok_or_else(|| ParseError::MalformedEdge {
                line: i + 2,
                token: token.to_string(),
            })?;
            edges.push(edge);
        }
        found_edges += edges.len();
        adjacency.push(edges);
    }

    // Trailing empty lines (terminal vertices at the end) are dropped by the
    // line iterator; restore them.
    if adjacency.len() < vertex_count {
        adjacency.resize(vertex_count, Vec::new());
    }

    if adjacency.len() != vertex_count {
        return Err(ParseError::VertexCountMismatch {
            declared: vertex_count,
            found: adjacency.len(),
        });
    }
    if found_edges != edge_count {
        return Err(ParseError::EdgeCountMismatch {
            declared: edge_count,
            found: found_edges,
        });
    }

    Ok(DesGraph {
        root,
        edge_count,
        vertex_count,
        adjacency,
    })
}

fn parse_header(header: &str) -> Result<(usize, usize, usize), ParseError> {
    let malformed = || ParseError::MalformedHeader(header.to_string());
    let body = header
        .strip_prefix("des (")
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(malformed)?;
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() != 3 {
        return Err(malformed());
    }
    let parse = |s: &str| s.trim().parse::<usize>().map_err(|_| malformed());
    Ok((parse(fields[0])?, parse(fields[1])?, parse(fields[2])?))
}

/// Splits a vertex line on commas at parenthesis depth zero, so label names
/// containing parenthesized role lists survive.
fn split_edge_tokens(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in line.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&line[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < line.len() {
        tokens.push(&line[start..]);
    }
    tokens.into_iter().filter(|t| !t.trim().is_empty()).collect()
}

/// Parses one `<label-name>(<target-id>)` token: the target id is the final
/// parenthesized group, everything before it is the name.
fn parse_edge_token(token: &str) -> Option<(String, usize)> {
    let token = token.trim();
    let inner = token.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let target = inner[open + 1..].parse::<usize>().ok()?;
    let name = &inner[..open];
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), target))
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::graph::{AcceptAll, Label};

    fn linear_graph() -> Graph<u32, char, AcceptAll> {
        // 0 -send(a,b)-> 1 -close(a,b)-> 2
        let graph = Graph::new([0u32], |&s: &u32| match s {
            0 => vec![(Label::new("send(a,b)", 's', AcceptAll), vec![1])],
            1 => vec![(Label::new("close(a,b)", 'c', AcceptAll), vec![2])],
            _ => vec![],
        });
        graph.expand_roots_recursively();
        graph
    }

    #[test]
    fn test_export_header_counts() {
        let graph = linear_graph();
        let des = graph.to_des().unwrap();
        let header = des.lines().next().unwrap();
        assert_eq!(header, "des (0,2,3)");
    }

    #[test]
    fn test_round_trip_preserves_adjacency() {
        let graph = linear_graph();
        let des = graph.to_des().unwrap();
        let parsed = parse_des(&des).unwrap();

        assert_eq!(parsed.root, 0);
        assert_eq!(parsed.edge_count, graph.edge_count());
        assert_eq!(parsed.vertex_count, graph.vertex_count());
        assert_eq!(
            parsed.adjacency,
            vec![
                vec![("send(a,b)".to_string(), 1)],
                vec![("close(a,b)".to_string(), 2)],
                vec![],
            ]
        );
    }

    #[test]
    fn test_round_trip_with_branching() {
        let graph: Graph<u32, char, AcceptAll> = Graph::new([0u32], |&s: &u32| match s {
            0 => vec![
                (Label::new("send(a,b)", 's', AcceptAll), vec![1, 2]),
                (Label::new("sync(b,c)", 'y', AcceptAll), vec![2]),
            ],
            1 => vec![(Label::new("close(a,b)", 'c', AcceptAll), vec![0])],
            _ => vec![],
        });
        graph.expand_roots_recursively();
        let parsed = parse_des(&graph.to_des().unwrap()).unwrap();
        assert_eq!(parsed.vertex_count, 3);
        assert_eq!(parsed.edge_count, 4);
        assert_eq!(
            parsed.adjacency[0],
            vec![
                ("send(a,b)".to_string(), 1),
                ("send(a,b)".to_string(), 2),
                ("sync(b,c)".to_string(), 2),
            ]
        );
        assert_eq!(parsed.adjacency[1], vec![("close(a,b)".to_string(), 0)]);
        assert!(parsed.adjacency[2].is_empty());
    }

    #[test]
    fn test_export_requires_single_root() {
        let graph: Graph<u32, char, AcceptAll> =
            Graph::new([0u32, 1], |_: &u32| Vec::new());
        assert_eq!(graph.to_des(), Err(ExportError::RootCount(2)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_des(""), Err(ParseError::MissingHeader));
        assert!(matches!(
            parse_des("nonsense"),
            Err(ParseError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_des("des (0,1,2)\nbroken token"),
            Err(ParseError::MalformedEdge { line: 2, .. })
        ));
        assert_eq!(
            parse_des("des (0,5,1)\n"),
            Err(ParseError::EdgeCountMismatch {
                declared: 5,
                found: 0
            })
        );
        assert_eq!(
            parse_des("des (0,1,1)\na(0)\nb(0)"),
            Err(ParseError::VertexCountMismatch {
                declared: 1,
                found: 2
            })
        );
    }
}
