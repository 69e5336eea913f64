//! CSR (Compressed Sparse Row) host representation of one input graph
//!
//! Based on `GraphBLAST` (Yang et al., ACM `ToMS` 2022) for GPU-optimized sparse layouts.
//!
//! # CSR Format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! CSR:
//!   offsets: [0, 2, 3, 3]  // Node 0: edges [0..2), Node 1: [2..3), Node 2: [3..3)
//!   edges:   [1, 2, 2]     // Edge 0 → node 1, edge 1 → node 2, edge 2 → node 2
//! ```
//!
//! Besides the adjacency, every graph carries its own BFS output arrays
//! (`distances`, `parents`). They start out as [`UNVISITED`] and are filled by
//! write-back after a device run.

use thiserror::Error;

/// Node identifier (zero-indexed, local to its graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Sentinel for "not yet visited", used for both distances and parents
pub const UNVISITED: u32 = u32::MAX;

/// Errors raised while constructing or validating graph input
///
/// All of these are configuration errors: they are reported before any
/// device work begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The batch contains no graphs
    #[error("batch contains no graphs")]
    EmptyBatch,

    /// A graph in the batch has zero nodes
    #[error("graph {graph} has no nodes")]
    EmptyGraph {
        /// Position of the graph in the batch
        graph: usize,
    },

    /// Offsets sequence is empty (must hold at least the leading 0)
    #[error("offsets sequence is empty")]
    MissingOffsets,

    /// First offset is not zero
    #[error("offsets must start at 0, found {found}")]
    OffsetsStart {
        /// The first offset
        found: u32,
    },

    /// Offsets decrease somewhere
    #[error("offsets decrease at node {node}: {prev} > {next}")]
    NonMonotonicOffsets {
        /// Node whose slice is inverted
        node: usize,
        /// `offsets[node]`
        prev: u32,
        /// `offsets[node + 1]`
        next: u32,
    },

    /// Last offset does not match the edge count
    #[error("last offset {last} does not match edge count {edges}")]
    OffsetsEnd {
        /// `offsets[num_nodes]`
        last: u32,
        /// `edges.len()`
        edges: usize,
    },

    /// An edge points outside the graph
    #[error("edge {edge} targets node {target} outside 0..{num_nodes}")]
    EdgeOutOfRange {
        /// Edge index
        edge: usize,
        /// Offending target
        target: u32,
        /// Node count of the graph
        num_nodes: usize,
    },

    /// Number of source nodes differs from number of graphs
    #[error("expected one source per graph ({expected}), got {got}")]
    SourceCountMismatch {
        /// Number of graphs
        expected: usize,
        /// Number of sources supplied
        got: usize,
    },

    /// A source node lies outside its graph
    #[error("source {source_node} of graph {graph} outside 0..{num_nodes}")]
    SourceOutOfRange {
        /// Position of the graph in the batch
        graph: usize,
        /// Offending source node
        source_node: u32,
        /// Node count of the graph
        num_nodes: usize,
    },

    /// A BFS level is wider than the per-group frontier capacity
    #[error("graph {graph}: level {level} holds {width} nodes, group width is {capacity}")]
    FrontierTooWide {
        /// Position of the graph in the batch
        graph: usize,
        /// BFS level (distance from source)
        level: usize,
        /// Number of nodes on that level
        width: usize,
        /// Configured work-group size
        capacity: u32,
    },

    /// Node or edge totals do not fit the 32-bit device index space
    #[error("{what} count {count} exceeds the 32-bit index space")]
    IndexOverflow {
        /// "node" or "edge"
        what: &'static str,
        /// Offending total
        count: usize,
    },
}

/// Per-graph CSR adjacency plus BFS result arrays
///
/// Invariants (checked by every constructor):
/// - `offsets.len() == num_nodes + 1`, `offsets[0] == 0`
/// - `offsets` is non-decreasing, `offsets[num_nodes] == edges.len()`
/// - every edge target is `< num_nodes`
///
/// # Example
///
/// ```
/// use trueno_multibfs::{CsrHostData, NodeId, UNVISITED};
///
/// // 0 → 1, 0 → 2
/// let graph = CsrHostData::new(vec![0, 2, 2, 2], vec![1, 2]).unwrap();
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.neighbors(NodeId(0)), &[1, 2]);
/// assert_eq!(graph.distances(), &[UNVISITED; 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrHostData {
    /// node i's edges are `edges[offsets[i]..offsets[i + 1]]`
    offsets: Vec<u32>,

    /// Edge targets (graph-local node ids)
    edges: Vec<u32>,

    /// BFS distance per node (`UNVISITED` if unreachable)
    distances: Vec<u32>,

    /// BFS parent per node (`UNVISITED` if unreachable, itself for the source)
    parents: Vec<u32>,
}

impl CsrHostData {
    /// Build from raw CSR arrays
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the offsets are malformed or an edge points
    /// outside the graph.
    pub fn new(offsets: Vec<u32>, edges: Vec<u32>) -> Result<Self, GraphError> {
        validate_csr(&offsets, &edges)?;
        let num_nodes = offsets.len() - 1;

        Ok(Self {
            offsets,
            edges,
            distances: vec![UNVISITED; num_nodes],
            parents: vec![UNVISITED; num_nodes],
        })
    }

    /// Build from an edge list with a fixed node count
    ///
    /// Edges keep their relative order per source node (counting sort).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EdgeOutOfRange`] if an endpoint is `>= num_nodes`,
    /// or [`GraphError::IndexOverflow`] if the graph exceeds 32-bit indexing.
    pub fn from_edge_list(num_nodes: usize, edges: &[(NodeId, NodeId)]) -> Result<Self, GraphError> {
        if u32::try_from(edges.len()).is_err() {
            return Err(GraphError::IndexOverflow {
                what: "edge",
                count: edges.len(),
            });
        }
        if u32::try_from(num_nodes).is_err() {
            return Err(GraphError::IndexOverflow {
                what: "node",
                count: num_nodes,
            });
        }

        // Count out-degree per node
        let mut offsets = vec![0_u32; num_nodes + 1];
        for (edge, (src, dst)) in edges.iter().enumerate() {
            for endpoint in [src.0, dst.0] {
                if endpoint as usize >= num_nodes {
                    return Err(GraphError::EdgeOutOfRange {
                        edge,
                        target: endpoint,
                        num_nodes,
                    });
                }
            }
            offsets[src.0 as usize + 1] += 1;
        }

        // Prefix sum
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        // Scatter targets
        let mut cursor: Vec<u32> = offsets[..num_nodes].to_vec();
        let mut targets = vec![0_u32; edges.len()];
        for (src, dst) in edges {
            let slot = &mut cursor[src.0 as usize];
            targets[*slot as usize] = dst.0;
            *slot += 1;
        }

        Ok(Self {
            offsets,
            edges: targets,
            distances: vec![UNVISITED; num_nodes],
            parents: vec![UNVISITED; num_nodes],
        })
    }

    /// Get number of nodes
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Get number of edges
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Row offsets (length `num_nodes + 1`)
    #[must_use]
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Edge targets
    #[must_use]
    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    /// BFS distances written back by the last run
    #[must_use]
    pub fn distances(&self) -> &[u32] {
        &self.distances
    }

    /// BFS parents written back by the last run
    #[must_use]
    pub fn parents(&self) -> &[u32] {
        &self.parents
    }

    /// Outgoing neighbors of `node`
    ///
    /// # Panics
    ///
    /// Panics if `node` is out of bounds.
    #[must_use]
    pub fn neighbors(&self, node: NodeId) -> &[u32] {
        let idx = node.0 as usize;
        let start = self.offsets[idx] as usize;
        let end = self.offsets[idx + 1] as usize;
        &self.edges[start..end]
    }

    /// Distance to `node`, `None` if unreachable or out of bounds
    #[must_use]
    pub fn distance(&self, node: NodeId) -> Option<u32> {
        self.distances
            .get(node.0 as usize)
            .copied()
            .filter(|&d| d != UNVISITED)
    }

    /// Parent of `node` in the BFS tree, `None` if unreachable or out of bounds
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents
            .get(node.0 as usize)
            .copied()
            .filter(|&p| p != UNVISITED)
            .map(NodeId)
    }

    /// Check if node was reached by the last run
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.distance(node).is_some()
    }

    /// Reset both result arrays to [`UNVISITED`]
    pub fn reset_results(&mut self) {
        self.distances.fill(UNVISITED);
        self.parents.fill(UNVISITED);
    }

    /// Overwrite the result arrays (write-back target)
    ///
    /// Both slices must have length `num_nodes`.
    pub(crate) fn store_results(&mut self, distances: &[u32], parents: &[u32]) {
        self.distances.copy_from_slice(distances);
        self.parents.copy_from_slice(parents);
    }

    /// Mutable result arrays, for devices that download straight into them
    pub(crate) fn results_mut(&mut self) -> (&mut [u32], &mut [u32]) {
        (&mut self.distances, &mut self.parents)
    }
}

/// Check the CSR invariants on raw arrays
pub(crate) fn validate_csr(offsets: &[u32], edges: &[u32]) -> Result<(), GraphError> {
    let first = *offsets.first().ok_or(GraphError::MissingOffsets)?;
    if first != 0 {
        return Err(GraphError::OffsetsStart { found: first });
    }

    for (node, pair) in offsets.windows(2).enumerate() {
        if pair[0] > pair[1] {
            return Err(GraphError::NonMonotonicOffsets {
                node,
                prev: pair[0],
                next: pair[1],
            });
        }
    }

    let last = offsets[offsets.len() - 1];
    if last as usize != edges.len() {
        return Err(GraphError::OffsetsEnd {
            last,
            edges: edges.len(),
        });
    }

    let num_nodes = offsets.len() - 1;
    if let Some((edge, &target)) = edges
        .iter()
        .enumerate()
        .find(|&(_, &t)| t as usize >= num_nodes)
    {
        return Err(GraphError::EdgeOutOfRange {
            edge,
            target,
            num_nodes,
        });
    }

    Ok(())
}
