//! Vectorized layout: one array set per graph

use super::{validate_batch, SegmentView};
use crate::storage::{CsrHostData, GraphError};

/// One graph's arrays plus its single-entry graph table
#[derive(Debug)]
struct VectorizedGraph<'a> {
    graph: &'a CsrHostData,
    graph_offsets: [u32; 2],
    node_counts: [u32; 1],
}

/// Independent per-graph array sets, borrowed from the caller
///
/// Each graph keeps its own 0-based node indexing; nothing is copied on the
/// host. The device binding layer uploads one segment per graph.
#[derive(Debug)]
pub struct VectorizedLayout<'a> {
    graphs: Vec<VectorizedGraph<'a>>,
}

impl<'a> VectorizedLayout<'a> {
    /// Build from a batch of graphs
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the batch is empty or a graph is invalid.
    pub fn build(graphs: &'a [CsrHostData]) -> Result<Self, GraphError> {
        validate_batch(graphs)?;

        let graphs = graphs
            .iter()
            .map(|graph| {
                // validate_batch bounds every count by u32::MAX
                #[allow(clippy::cast_possible_truncation)]
                let n = graph.num_nodes() as u32;
                VectorizedGraph {
                    graph,
                    graph_offsets: [0, n],
                    node_counts: [n],
                }
            })
            .collect();

        Ok(Self { graphs })
    }

    /// Number of graphs
    #[must_use]
    pub fn num_graphs(&self) -> usize {
        self.graphs.len()
    }

    /// One single-graph segment per graph
    pub fn segments(&self) -> impl Iterator<Item = SegmentView<'_>> + '_ {
        self.graphs
            .iter()
            .enumerate()
            .map(|(index, entry)| SegmentView {
                first_graph: index,
                graph_offsets: &entry.graph_offsets,
                node_counts: &entry.node_counts,
                offsets: entry.graph.offsets(),
                edges: entry.graph.edges(),
                distances: entry.graph.distances(),
                parents: entry.graph.parents(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NodeId;

    #[test]
    fn test_vectorized_borrows_graph_arrays() {
        let graphs = vec![
            CsrHostData::from_edge_list(3, &[(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2))])
                .unwrap(),
            CsrHostData::from_edge_list(2, &[(NodeId(1), NodeId(0))]).unwrap(),
        ];

        let layout = VectorizedLayout::build(&graphs).unwrap();
        assert_eq!(layout.num_graphs(), 2);

        for (segment, graph) in layout.segments().zip(&graphs) {
            assert_eq!(segment.num_graphs(), 1);
            assert_eq!(segment.offsets, graph.offsets());
            assert_eq!(segment.edges, graph.edges());
            assert_eq!(segment.node_counts[0] as usize, graph.num_nodes());
            assert!(std::ptr::eq(segment.edges, graph.edges()));
        }
    }
}
