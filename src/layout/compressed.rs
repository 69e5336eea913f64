//! Compressed layout: every graph concatenated into flat arrays
//!
//! ```text
//! graph 0: offsets [0, 1, 2]      edges [1, 0]
//! graph 1: offsets [0, 2, 2, 3]   edges [1, 2, 0]
//!
//! graphs_offsets:     [0, 2, 5]
//! nodes_count:        [2, 3]
//! compressed_offsets: [0, 1, 2, 4, 4, 5]   // graph 1 shifted by 2 edges, junction shared
//! compressed_edges:   [1, 0, 1, 2, 0]      // targets stay graph-local
//! ```

use super::{validate_batch, ResultStaging, SegmentView};
use crate::storage::{CsrHostData, GraphError, UNVISITED};

/// Flat arrays plus per-graph offset tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLayout {
    graphs_offsets: Vec<u32>,
    nodes_count: Vec<u32>,
    compressed_offsets: Vec<u32>,
    compressed_edges: Vec<u32>,
    compressed_distances: Vec<u32>,
    compressed_parents: Vec<u32>,
}

impl CompressedLayout {
    /// Build from a batch of graphs
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the batch is empty, a graph is invalid, or
    /// totals exceed 32-bit indexing.
    #[allow(clippy::cast_possible_truncation)] // validate_batch bounds totals by u32::MAX
    pub fn build(graphs: &[CsrHostData]) -> Result<Self, GraphError> {
        validate_batch(graphs)?;

        let total_nodes: usize = graphs.iter().map(CsrHostData::num_nodes).sum();
        let total_edges: usize = graphs.iter().map(CsrHostData::num_edges).sum();

        let mut graphs_offsets = Vec::with_capacity(graphs.len() + 1);
        let mut nodes_count = Vec::with_capacity(graphs.len());
        let mut compressed_offsets = Vec::with_capacity(total_nodes + 1);
        let mut compressed_edges = Vec::with_capacity(total_edges);

        let mut node_base = 0_u32;
        let mut edge_base = 0_u32;
        graphs_offsets.push(node_base);
        compressed_offsets.push(edge_base);

        for graph in graphs {
            // offsets[0] == 0 coincides with the previous graph's last entry
            compressed_offsets.extend(graph.offsets()[1..].iter().map(|&off| edge_base + off));
            compressed_edges.extend_from_slice(graph.edges());

            let n = graph.num_nodes() as u32;
            node_base += n;
            edge_base += graph.num_edges() as u32;
            nodes_count.push(n);
            graphs_offsets.push(node_base);
        }

        Ok(Self {
            graphs_offsets,
            nodes_count,
            compressed_offsets,
            compressed_edges,
            compressed_distances: vec![UNVISITED; total_nodes],
            compressed_parents: vec![UNVISITED; total_nodes],
        })
    }

    /// Number of graphs
    #[must_use]
    pub fn num_graphs(&self) -> usize {
        self.nodes_count.len()
    }

    /// Node base per graph, length `graphs + 1`
    #[must_use]
    pub fn graphs_offsets(&self) -> &[u32] {
        &self.graphs_offsets
    }

    /// Node count per graph
    #[must_use]
    pub fn nodes_count(&self) -> &[u32] {
        &self.nodes_count
    }

    /// Concatenated, edge-shifted offsets, length `total nodes + 1`
    #[must_use]
    pub fn compressed_offsets(&self) -> &[u32] {
        &self.compressed_offsets
    }

    /// Concatenated edge targets
    #[must_use]
    pub fn compressed_edges(&self) -> &[u32] {
        &self.compressed_edges
    }

    /// Flat distances (all `UNVISITED` after build)
    #[must_use]
    pub fn compressed_distances(&self) -> &[u32] {
        &self.compressed_distances
    }

    /// Flat parents (all `UNVISITED` after build)
    #[must_use]
    pub fn compressed_parents(&self) -> &[u32] {
        &self.compressed_parents
    }

    /// The single segment covering the whole batch
    #[must_use]
    pub fn segment(&self) -> SegmentView<'_> {
        SegmentView {
            first_graph: 0,
            graph_offsets: &self.graphs_offsets,
            node_counts: &self.nodes_count,
            offsets: &self.compressed_offsets,
            edges: &self.compressed_edges,
            distances: &self.compressed_distances,
            parents: &self.compressed_parents,
        }
    }

    pub(super) fn into_staging(self) -> ResultStaging {
        ResultStaging::Compressed {
            graphs_offsets: self.graphs_offsets,
            distances: self.compressed_distances,
            parents: self.compressed_parents,
        }
    }
}
