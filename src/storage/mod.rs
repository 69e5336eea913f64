//! Graph storage layer
//!
//! Provides the per-graph CSR host representation and edge-list file loading.

pub mod csr;
pub mod loader;

pub use csr::{CsrHostData, GraphError, NodeId, UNVISITED};
pub use loader::{list_graph_files, load_directory, load_graph, parse_edge_list};
