//! Workflow graph definition and routing.
//!
//! A simulation topology is a directed multigraph loaded from an edge list.
//! Each edge connects a named output handle of a source component to a named
//! input handle of a target component; the pair `(source, sourceHandle)`
//! uniquely keys an edge, which makes [`WorkflowGraph::route_from`], the hot
//! path of token dispatch, a deterministic O(1) lookup.
//!
//! Handle ids carry their direction in a suffix: names ending `-out` are
//! outputs, names ending `-in` are inputs. The suffix convention is
//! load-bearing for both routing and the default-handle rule, so it is
//! validated once at load time rather than inferred per edge.
//!
//! Cycles are permitted at runtime (tokens may revisit components);
//! [`WorkflowGraph::topological_order`] is only meaningful for acyclic
//! topologies and returns an empty ordering otherwise.
//!
//! # Examples
//!
//! ```
//! use simflow::graph::{Edge, WorkflowGraph};
//!
//! let graph = WorkflowGraph::from_edges(vec![
//!     Edge::new("gen", "order-out", "queue", "order-in", "e1"),
//!     Edge::new("queue", "order-out", "sink", "order-in", "e2"),
//! ])
//! .unwrap();
//!
//! assert_eq!(graph.route_from("gen", "order-out"), Some(("queue", "order-in")));
//! assert_eq!(graph.roots(), vec!["gen"]);
//! assert_eq!(graph.leaves(), vec!["sink"]);
//! assert!(!graph.has_cycles());
//! ```

mod algo;
mod edges;
mod workflow;

pub use edges::{Edge, HandleDirection, handle_channel, handle_direction, rotate_out};
pub use workflow::{GraphError, WorkflowGraph};
