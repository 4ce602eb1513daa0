//! The workflow graph and its routing index.

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::algo;
use super::edges::{Edge, HandleDirection, handle_direction};

/// Errors raised while loading an edge list into a graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// Two edges share the same `(source, sourceHandle)` key, which would
    /// make routing ambiguous.
    #[error("duplicate route key: component '{node}' handle '{handle}' has more than one outgoing edge")]
    #[diagnostic(
        code(simflow::graph::duplicate_route),
        help("Each output handle may feed at most one edge; split the flow over distinct handles.")
    )]
    DuplicateRoute { node: String, handle: String },

    /// A handle id does not end in `-in` or `-out`.
    #[error("handle '{handle}' on edge '{edge_id}' has no -in/-out direction suffix")]
    #[diagnostic(code(simflow::graph::invalid_handle))]
    InvalidHandle { handle: String, edge_id: String },

    /// A source handle is an input, or a target handle an output.
    #[error("handle '{handle}' on edge '{edge_id}' points the wrong way: expected a {expected} handle")]
    #[diagnostic(code(simflow::graph::misdirected_handle))]
    MisdirectedHandle {
        handle: String,
        edge_id: String,
        expected: &'static str,
    },
}

/// Directed workflow topology keyed for handle-directed routing.
///
/// Built once from an edge list and treated as immutable for the lifetime of
/// a simulation. See the [module docs](super) for the handle conventions.
#[derive(Clone, Debug, Default)]
pub struct WorkflowGraph {
    /// Edges in load order; the round-trip serialisation form.
    edges: Vec<Edge>,
    /// `source -> sourceHandle -> index into edges`. The routing hot path.
    route_index: FxHashMap<String, FxHashMap<String, usize>>,
    /// Node id -> indices of outgoing edges, in load order.
    outgoing: FxHashMap<String, Vec<usize>>,
    /// Node id -> indices of incoming edges, in load order.
    incoming: FxHashMap<String, Vec<usize>>,
    nodes: FxHashSet<String>,
}

impl WorkflowGraph {
    /// Build a graph from an edge list, validating the handle convention and
    /// routing determinism.
    pub fn from_edges(edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::default();
        for edge in edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }

    fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        match handle_direction(&edge.source_handle) {
            Some(HandleDirection::Out) => {}
            Some(HandleDirection::In) => {
                return Err(GraphError::MisdirectedHandle {
                    handle: edge.source_handle,
                    edge_id: edge.id,
                    expected: "-out",
                });
            }
            None => {
                return Err(GraphError::InvalidHandle {
                    handle: edge.source_handle,
                    edge_id: edge.id,
                });
            }
        }
        match handle_direction(&edge.target_handle) {
            Some(HandleDirection::In) => {}
            Some(HandleDirection::Out) => {
                return Err(GraphError::MisdirectedHandle {
                    handle: edge.target_handle,
                    edge_id: edge.id,
                    expected: "-in",
                });
            }
            None => {
                return Err(GraphError::InvalidHandle {
                    handle: edge.target_handle,
                    edge_id: edge.id,
                });
            }
        }

        if self
            .route_index
            .get(&edge.source)
            .is_some_and(|handles| handles.contains_key(&edge.source_handle))
        {
            return Err(GraphError::DuplicateRoute {
                node: edge.source,
                handle: edge.source_handle,
            });
        }

        let index = self.edges.len();
        self.nodes.insert(edge.source.clone());
        self.nodes.insert(edge.target.clone());
        self.outgoing
            .entry(edge.source.clone())
            .or_default()
            .push(index);
        self.incoming
            .entry(edge.target.clone())
            .or_default()
            .push(index);
        self.route_index
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.source_handle.clone(), index);
        self.edges.push(edge);
        Ok(())
    }

    /// Resolve the destination of `(source component, source handle)`.
    ///
    /// This is the dispatch hot path; the lookup is deterministic because
    /// duplicate route keys are rejected at load.
    #[must_use]
    pub fn route_from(&self, source: &str, source_handle: &str) -> Option<(&str, &str)> {
        self.route_index
            .get(source)
            .and_then(|handles| handles.get(source_handle))
            .map(|&i| {
                let edge = &self.edges[i];
                (edge.target.as_str(), edge.target_handle.as_str())
            })
    }

    /// Nodes with no incoming edges, sorted for deterministic iteration.
    #[must_use]
    pub fn roots(&self) -> Vec<&str> {
        let mut roots: Vec<&str> = self
            .nodes
            .iter()
            .filter(|node| !self.incoming.contains_key(node.as_str()))
            .map(String::as_str)
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Nodes with no outgoing edges, sorted for deterministic iteration.
    #[must_use]
    pub fn leaves(&self) -> Vec<&str> {
        let mut leaves: Vec<&str> = self
            .nodes
            .iter()
            .filter(|node| !self.outgoing.contains_key(node.as_str()))
            .map(String::as_str)
            .collect();
        leaves.sort_unstable();
        leaves
    }

    /// Incoming edges of a node, in load order.
    #[must_use]
    pub fn incoming(&self, node: &str) -> Vec<&Edge> {
        self.incoming
            .get(node)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Outgoing edges of a node, in load order.
    #[must_use]
    pub fn outgoing(&self, node: &str) -> Vec<&Edge> {
        self.outgoing
            .get(node)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// A topological ordering of all nodes, or an empty vector when the
    /// graph is cyclic. Ties break lexicographically so the ordering is
    /// deterministic.
    #[must_use]
    pub fn topological_order(&self) -> Vec<String> {
        let order = algo::topological_sort(&self.adjacency());
        if order.len() == self.nodes.len() {
            order
        } else {
            Vec::new()
        }
    }

    /// Whether the topology contains at least one directed cycle.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        algo::topological_sort(&self.adjacency()).len() != self.nodes.len()
    }

    /// A shortest path from `a` to `b` (inclusive), or empty when no path
    /// exists or either endpoint is unknown.
    #[must_use]
    pub fn path_between(&self, a: &str, b: &str) -> Vec<String> {
        if !self.nodes.contains(a) || !self.nodes.contains(b) {
            return Vec::new();
        }
        algo::shortest_path(&self.adjacency(), a, b)
    }

    /// All handles seen on a component, with their directions.
    #[must_use]
    pub fn handles_of(&self, node: &str) -> FxHashMap<&str, HandleDirection> {
        let mut handles = FxHashMap::default();
        for edge in self.outgoing(node) {
            handles.insert(edge.source_handle.as_str(), HandleDirection::Out);
        }
        for edge in self.incoming(node) {
            handles.insert(edge.target_handle.as_str(), HandleDirection::In);
        }
        handles
    }

    /// Edges in load order; parsing this list again yields an isomorphic
    /// graph (same edges keyed by `(source, sourceHandle)`).
    #[must_use]
    pub fn to_edge_list(&self) -> Vec<Edge> {
        self.edges.clone()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn adjacency(&self) -> FxHashMap<&str, Vec<&str>> {
        let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        for node in &self.nodes {
            adjacency.entry(node.as_str()).or_default();
        }
        for edge in &self.edges {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }
        adjacency
    }
}
