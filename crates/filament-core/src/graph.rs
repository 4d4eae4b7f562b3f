use crate::{Error, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A directed graph with string node ids and `f32` edge weights.
///
/// Uses petgraph's directed graph internally for traversal; maintains an
/// id index for O(1) node lookup. Node positions are stable: the i-th
/// inserted node has position i, which is the row index used by feature
/// matrices and embedding tables.
///
/// # Example
///
/// ```rust
/// use filament_core::WeightedGraph;
///
/// let mut g = WeightedGraph::new();
/// g.add_edge("alice", "bob", 1.5).unwrap();
/// g.add_edge("bob", "carol", 0.5).unwrap();
///
/// assert_eq!(g.node_count(), 3);
/// assert_eq!(g.edge_count(), 2);
/// let neigh: Vec<_> = g.out_neighbors(0).collect();
/// assert_eq!(neigh, vec![(1, 1.5)]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WeightedGraph {
    /// The underlying directed graph; node weights are external ids.
    graph: DiGraph<String, f32>,
    /// Map from node id to node index.
    node_index: HashMap<String, NodeIndex>,
}

impl WeightedGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_index: HashMap::new(),
        }
    }

    /// Create a graph with estimated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            node_index: HashMap::with_capacity(nodes),
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Insert a node, returning its position. Idempotent per id.
    pub fn add_node(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.node_index.get(id) {
            return idx.index();
        }
        let idx = self.graph.add_node(id.to_string());
        self.node_index.insert(id.to_string(), idx);
        idx.index()
    }

    /// Insert a directed edge, creating endpoints on demand.
    ///
    /// Weights must be finite and non-negative.
    pub fn add_edge(&mut self, src: &str, dst: &str, weight: f32) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidWeight { weight });
        }
        let s = NodeIndex::new(self.add_node(src));
        let d = NodeIndex::new(self.add_node(dst));
        self.graph.add_edge(s, d, weight);
        Ok(())
    }

    /// External id of the node at `position`.
    pub fn node_id(&self, position: usize) -> Option<&str> {
        self.graph
            .node_weight(NodeIndex::new(position))
            .map(String::as_str)
    }

    /// Position of the node with the given id.
    pub fn node_position(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).map(|idx| idx.index())
    }

    /// All node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// Edge-index view: parallel (source, destination, weight) triples.
    pub fn edge_triples(&self) -> impl Iterator<Item = (usize, usize, f32)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }

    /// Out-edges of the node at `position` as (neighbor position, weight).
    pub fn out_neighbors(&self, position: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.graph
            .edges(NodeIndex::new(position))
            .map(|e| (e.target().index(), *e.weight()))
    }

    /// Maximum edge weight, or `None` for an edgeless graph.
    pub fn max_weight(&self) -> Option<f32> {
        self.graph
            .edge_references()
            .map(|e| *e.weight())
            .fold(None, |acc, w| Some(acc.map_or(w, |m: f32| m.max(w))))
    }

    /// Load from a whitespace-separated edgelist file.
    ///
    /// Each non-empty line is `src dst [weight]`; a missing weight defaults
    /// to 1.0. Blank lines and `#` comments are skipped.
    pub fn from_edgelist_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut graph = Self::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (src, dst) = match (parts.next(), parts.next()) {
                (Some(s), Some(d)) => (s, d),
                _ => {
                    return Err(Error::Parse {
                        path: path.to_path_buf(),
                        line: lineno + 1,
                        message: format!("expected `src dst [weight]`, got `{line}`"),
                    })
                }
            };
            let weight = match parts.next() {
                Some(w) => w.parse::<f32>().map_err(|e| Error::Parse {
                    path: path.to_path_buf(),
                    line: lineno + 1,
                    message: format!("bad weight `{w}`: {e}"),
                })?,
                None => 1.0,
            };
            graph.add_edge(src, dst, weight)?;
        }

        Ok(graph)
    }

    /// Write as a whitespace-separated edgelist file.
    pub fn write_edgelist_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        for (src, dst, w) in self.edge_triples() {
            let src_id = self.node_id(src).expect("edge source in graph");
            let dst_id = self.node_id(dst).expect("edge target in graph");
            writeln!(out, "{src_id} {dst_id} {w}")?;
        }
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn triangle() -> WeightedGraph {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 1.0).unwrap();
        g.add_edge("b", "c", 2.0).unwrap();
        g.add_edge("c", "a", 4.0).unwrap();
        g
    }

    #[test]
    fn test_add_edge_creates_nodes() {
        let g = triangle();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.node_position("a"), Some(0));
        assert_eq!(g.node_id(2), Some("c"));
    }

    #[test]
    fn test_add_node_idempotent() {
        let mut g = WeightedGraph::new();
        let first = g.add_node("x");
        let second = g.add_node("x");
        assert_eq!(first, second);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_out_neighbors_per_source() {
        let mut g = WeightedGraph::new();
        g.add_edge("a", "b", 1.0).unwrap();
        g.add_edge("a", "c", 2.0).unwrap();
        g.add_edge("b", "c", 3.0).unwrap();

        let mut a: Vec<_> = g.out_neighbors(0).collect();
        a.sort_by_key(|&(n, _)| n);
        assert_eq!(a, vec![(1, 1.0), (2, 2.0)]);

        let b: Vec<_> = g.out_neighbors(1).collect();
        assert_eq!(b, vec![(2, 3.0)]);

        // c has no out-edges
        assert_eq!(g.out_neighbors(2).count(), 0);
    }

    #[test]
    fn test_max_weight() {
        assert_eq!(triangle().max_weight(), Some(4.0));
        assert_eq!(WeightedGraph::new().max_weight(), None);
    }

    #[test]
    fn test_rejects_bad_weights() {
        let mut g = WeightedGraph::new();
        assert!(matches!(
            g.add_edge("a", "b", -1.0),
            Err(Error::InvalidWeight { .. })
        ));
        assert!(matches!(
            g.add_edge("a", "b", f32::NAN),
            Err(Error::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_edgelist_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.txt");

        triangle().write_edgelist_file(&path).unwrap();
        let g = WeightedGraph::from_edgelist_file(&path).unwrap();

        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.max_weight(), Some(4.0));
    }

    #[test]
    fn test_edgelist_skips_comments_and_defaults_weight() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.txt");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "# a comment").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "a b").unwrap();
        writeln!(f, "b c 2.5").unwrap();
        drop(f);

        let g = WeightedGraph::from_edgelist_file(&path).unwrap();
        assert_eq!(g.edge_count(), 2);
        let a: Vec<_> = g.out_neighbors(0).collect();
        assert_eq!(a, vec![(1, 1.0)]);
    }

    #[test]
    fn test_edgelist_parse_error_carries_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.txt");
        std::fs::write(&path, "a b 1.0\nbroken\n").unwrap();

        match WeightedGraph::from_edgelist_file(&path) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
