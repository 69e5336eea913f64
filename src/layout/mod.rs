//! Aggregate device layouts for a batch of graphs
//!
//! Two strategies pack a batch into arrays a fixed grid of workgroups can
//! address:
//!
//! - [`VectorizedLayout`]: one independent array set per graph (graph-local
//!   indexing, one device allocation set per graph)
//! - [`CompressedLayout`]: every graph concatenated into single flat arrays,
//!   addressed through per-graph offset tables
//!
//! Both present themselves to the device as [`SegmentView`]s. A segment is a
//! bundle of node/edge/result arrays covering one or more graphs plus the
//! table mapping each graph to its node range. A vectorized layout is N
//! single-graph segments, a compressed layout is one N-graph segment, so the
//! same kernels serve both.

mod compressed;
mod vectorized;

pub use compressed::CompressedLayout;
pub use vectorized::VectorizedLayout;

use crate::storage::csr::validate_csr;
use crate::storage::{CsrHostData, GraphError};
use std::fmt;
use std::str::FromStr;

/// Which aggregate layout a run uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayoutKind {
    /// One array set per graph
    Vectorized,
    /// All graphs in single flat arrays
    #[default]
    Compressed,
}

impl LayoutKind {
    /// Both kinds, vectorized first
    pub const ALL: [Self; 2] = [Self::Vectorized, Self::Compressed];

    /// Lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vectorized => "vectorized",
            Self::Compressed => "compressed",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vectorized" | "vector" => Ok(Self::Vectorized),
            "compressed" | "flat" => Ok(Self::Compressed),
            other => Err(format!(
                "unknown layout {other:?} (expected `vectorized` or `compressed`)"
            )),
        }
    }
}

/// Device-ready view of one segment
///
/// Node-indexed arrays (`offsets`, `distances`, `parents`) use segment-global
/// indices: graph `g`'s local node `i` lives at `graph_offsets[g] + i`. Edge
/// targets stay graph-local.
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    /// Index of this segment's first graph within the batch
    pub first_graph: usize,

    /// Node base per graph, length `graphs + 1`, last entry = segment nodes
    pub graph_offsets: &'a [u32],

    /// Node count per graph
    pub node_counts: &'a [u32],

    /// Edge offsets by segment-global node index, length `nodes + 1`
    pub offsets: &'a [u32],

    /// Edge targets (graph-local ids)
    pub edges: &'a [u32],

    /// Initial distances, one per segment node
    pub distances: &'a [u32],

    /// Initial parents, one per segment node
    pub parents: &'a [u32],
}

impl SegmentView<'_> {
    /// Number of graphs covered
    #[must_use]
    pub fn num_graphs(&self) -> usize {
        self.node_counts.len()
    }

    /// Total nodes in the segment
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.distances.len()
    }

    /// Total edges in the segment
    #[must_use]
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

/// Host-side state kept after upload, needed to route results back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultStaging {
    /// Results download straight into each graph's own arrays
    Vectorized,
    /// Results download into flat arrays, then get sliced per graph
    Compressed {
        /// Node base per graph (length `graphs + 1`)
        graphs_offsets: Vec<u32>,
        /// Flat distance staging
        distances: Vec<u32>,
        /// Flat parent staging
        parents: Vec<u32>,
    },
}

/// A built layout of either kind
#[derive(Debug)]
pub enum GraphLayout<'a> {
    /// Per-graph arrays borrowed from the caller
    Vectorized(VectorizedLayout<'a>),
    /// Owned flat arrays
    Compressed(CompressedLayout),
}

impl<'a> GraphLayout<'a> {
    /// Build the layout of `kind` for `graphs`
    ///
    /// O(total nodes + total edges). Caller arrays are never mutated.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] if the batch is empty, a graph has no nodes or
    /// malformed offsets, or totals exceed 32-bit indexing.
    pub fn build(kind: LayoutKind, graphs: &'a [CsrHostData]) -> Result<Self, GraphError> {
        Ok(match kind {
            LayoutKind::Vectorized => Self::Vectorized(VectorizedLayout::build(graphs)?),
            LayoutKind::Compressed => Self::Compressed(CompressedLayout::build(graphs)?),
        })
    }

    /// Layout kind
    #[must_use]
    pub const fn kind(&self) -> LayoutKind {
        match self {
            Self::Vectorized(_) => LayoutKind::Vectorized,
            Self::Compressed(_) => LayoutKind::Compressed,
        }
    }

    /// Number of graphs in the batch
    #[must_use]
    pub fn num_graphs(&self) -> usize {
        match self {
            Self::Vectorized(layout) => layout.num_graphs(),
            Self::Compressed(layout) => layout.num_graphs(),
        }
    }

    /// Segments to upload, in batch order
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentView<'_>> {
        match self {
            Self::Vectorized(layout) => layout.segments().collect(),
            Self::Compressed(layout) => vec![layout.segment()],
        }
    }

    /// Drop borrowed inputs, keeping what write-back needs
    #[must_use]
    pub fn into_staging(self) -> ResultStaging {
        match self {
            Self::Vectorized(_) => ResultStaging::Vectorized,
            Self::Compressed(layout) => layout.into_staging(),
        }
    }
}

/// Checks shared by both layouts
pub(crate) fn validate_batch(graphs: &[CsrHostData]) -> Result<(), GraphError> {
    if graphs.is_empty() {
        return Err(GraphError::EmptyBatch);
    }

    let mut total_nodes = 0_usize;
    let mut total_edges = 0_usize;
    for (graph, data) in graphs.iter().enumerate() {
        if data.num_nodes() == 0 {
            return Err(GraphError::EmptyGraph { graph });
        }
        validate_csr(data.offsets(), data.edges())?;
        total_nodes += data.num_nodes();
        total_edges += data.num_edges();
    }

    // Node indices must stay below the UNVISITED sentinel
    if u32::try_from(total_nodes).map_or(true, |n| n == u32::MAX) {
        return Err(GraphError::IndexOverflow {
            what: "node",
            count: total_nodes,
        });
    }
    if u32::try_from(total_edges).is_err() {
        return Err(GraphError::IndexOverflow {
            what: "edge",
            count: total_edges,
        });
    }

    Ok(())
}
