//! In-memory dependency graph backed by petgraph::DiGraph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::config::{AdjacencyOutput, EdgeKind, EdgeOutput, ImportType, Issue, Node, NodeKind};

/// Edge data stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeData {
    pub kind: EdgeKind,
    pub import_type: Option<ImportType>,
    pub raw: String,
    pub lineno: usize,
    pub col: usize,
}

impl EdgeData {
    pub fn import(import_type: ImportType, raw: &str, lineno: usize, col: usize) -> Self {
        Self {
            kind: EdgeKind::Imports,
            import_type: Some(import_type),
            raw: raw.to_string(),
            lineno,
            col,
        }
    }

    pub fn config_access(raw: &str, lineno: usize, col: usize) -> Self {
        Self {
            kind: EdgeKind::ConfigAccess,
            import_type: None,
            raw: raw.to_string(),
            lineno,
            col,
        }
    }
}

/// Wrapper around petgraph::DiGraph with typed node/edge methods.
///
/// Nodes live in an arena addressed by [`NodeIndex`]; edges are kept in
/// insertion order, which is the build order of the run.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<Node, EdgeData>,
    /// O(1) string ID → NodeIndex lookup.
    id_index: HashMap<String, NodeIndex>,
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
    issues: Vec<Issue>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a node. The first insertion for an id wins.
    pub fn ensure_node(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_index.insert(id, idx);
        idx
    }

    /// Append an edge and update both adjacency projections.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, data: EdgeData) {
        let source = self.graph[from].id.clone();
        let target = self.graph[to].id.clone();
        self.forward
            .entry(source.clone())
            .or_default()
            .insert(target.clone());
        self.reverse.entry(target).or_default().insert(source);
        self.graph.add_edge(from, to, data);
    }

    /// True if an edge of `kind` already joins the two nodes.
    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> bool {
        self.graph
            .edges_connecting(from, to)
            .any(|e| e.weight().kind == kind)
    }

    pub fn add_issue(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    // --- Queries ---

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.id_index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.graph.node_weights().filter(move |n| n.kind == kind)
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn edge_count_of_kind(&self, kind: EdgeKind) -> usize {
        self.graph
            .edge_weights()
            .filter(|e| e.kind == kind)
            .count()
    }

    /// Edges in build order.
    pub fn edge_outputs(&self) -> Vec<EdgeOutput> {
        self.graph
            .edge_references()
            .map(|e| {
                let data = e.weight();
                EdgeOutput {
                    source: self.graph[e.source()].id.clone(),
                    target: self.graph[e.target()].id.clone(),
                    kind: data.kind,
                    import_type: data.import_type,
                    raw: data.raw.clone(),
                    lineno: data.lineno,
                    col: data.col,
                }
            })
            .collect()
    }

    /// Forward and reverse adjacency with every node present as a key.
    pub fn adjacency_output(&self) -> AdjacencyOutput {
        let mut out = AdjacencyOutput::default();
        for node in self.graph.node_weights() {
            let fwd = self
                .forward
                .get(&node.id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            let rev = self
                .reverse
                .get(&node.id)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            out.forward.insert(node.id.clone(), fwd);
            out.reverse.insert(node.id.clone(), rev);
        }
        out
    }

    /// Internal-module labels mapped to the labels of the internal modules they import.
    ///
    /// Every internal module appears as a key, including modules with no edges.
    pub fn internal_adjacency(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut adjacency = BTreeMap::new();
        for node in self.nodes_of_kind(NodeKind::InternalModule) {
            let targets = self
                .forward
                .get(&node.id)
                .map(|targets| {
                    targets
                        .iter()
                        .filter_map(|t| self.get_node(t))
                        .filter(|t| t.kind == NodeKind::InternalModule)
                        .map(|t| t.label.clone())
                        .collect()
                })
                .unwrap_or_default();
            adjacency.insert(node.label.clone(), targets);
        }
        adjacency
    }
}
