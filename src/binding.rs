//! Device binding of a batch
//!
//! [`BoundBatch`] owns the device copies of one layout for the duration of a
//! run and holds the caller's graphs mutably so results can be written back
//! into them. Device memory is released when the batch is dropped.

use crate::device::{ComputeDevice, Kernel};
use crate::layout::{GraphLayout, LayoutKind, ResultStaging};
use crate::storage::{CsrHostData, GraphError, NodeId};
use anyhow::{Context, Result};

/// A layout uploaded to a device, tied to the graphs it came from
pub struct BoundBatch<'g, 'd, D: ComputeDevice> {
    device: &'d D,
    program: D::Program,
    graphs: &'g mut [CsrHostData],
    kind: LayoutKind,
    staging: ResultStaging,
    segments: Vec<D::Segment>,
}

impl<'g, 'd, D: ComputeDevice> BoundBatch<'g, 'd, D> {
    /// Build the layout of `kind`, compile the kernels and upload every segment
    ///
    /// `sources[g]` is the graph-local BFS source of `graphs[g]`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError`] for an invalid batch or sources, or a device
    /// error if compilation or upload fails.
    pub fn bind(
        device: &'d D,
        graphs: &'g mut [CsrHostData],
        sources: &[NodeId],
        kind: LayoutKind,
        work_group_size: u32,
    ) -> Result<Self> {
        let program = device.compile(work_group_size)?;

        let layout = GraphLayout::build(kind, graphs)?;
        let sources = validate_sources(graphs, sources)?;

        let segments = {
            let views = layout.segments();
            views
                .iter()
                .map(|view| {
                    let range = view.first_graph..view.first_graph + view.num_graphs();
                    device.upload(&program, view, &sources[range])
                })
                .collect::<Result<Vec<_>>>()?
        };

        tracing::debug!(
            layout = %kind,
            graphs = graphs.len(),
            segments = segments.len(),
            work_group_size,
            "batch bound to {}",
            device.describe()
        );

        let staging = layout.into_staging();
        Ok(Self {
            device,
            program,
            graphs,
            kind,
            staging,
            segments,
        })
    }

    /// Layout kind this batch was bound with
    #[must_use]
    pub const fn kind(&self) -> LayoutKind {
        self.kind
    }

    /// Number of graphs in the batch
    #[must_use]
    pub fn num_graphs(&self) -> usize {
        self.graphs.len()
    }

    /// The bound graphs, as of the last write-back
    #[must_use]
    pub fn graphs(&self) -> &[CsrHostData] {
        &*self.graphs
    }

    /// Submit `kernel` over every graph of the batch
    ///
    /// # Errors
    ///
    /// Returns error if the device rejects the launch.
    pub fn launch(&self, kernel: Kernel) -> Result<D::Event> {
        self.device.launch(&self.program, kernel, &self.segments)
    }

    /// Status word of every graph, in batch order
    ///
    /// # Errors
    ///
    /// Returns error if the device read fails.
    pub async fn status(&self) -> Result<Vec<u32>> {
        let mut status = Vec::with_capacity(self.graphs.len());
        for segment in &self.segments {
            status.extend(self.device.read_status(segment).await?);
        }
        Ok(status)
    }

    /// Copy device results into each graph's `distances`/`parents`
    ///
    /// Safe to call repeatedly; every call copies the current device state.
    ///
    /// # Errors
    ///
    /// Returns error if a device read fails.
    pub async fn write_back(&mut self) -> Result<()> {
        match &mut self.staging {
            ResultStaging::Vectorized => {
                for (segment, graph) in self.segments.iter().zip(self.graphs.iter_mut()) {
                    let (distances, parents) = graph.results_mut();
                    self.device.download(segment, distances, parents).await?;
                }
            }
            ResultStaging::Compressed {
                graphs_offsets,
                distances,
                parents,
            } => {
                let segment = self
                    .segments
                    .first()
                    .context("compressed batch has no device segment")?;
                self.device.download(segment, distances, parents).await?;

                for (graph, bounds) in self.graphs.iter_mut().zip(graphs_offsets.windows(2)) {
                    let range = bounds[0] as usize..bounds[1] as usize;
                    graph.store_results(&distances[range.clone()], &parents[range]);
                }
            }
        }
        Ok(())
    }
}

/// Check one in-range source per graph, returning them as raw ids
pub(crate) fn validate_sources(
    graphs: &[CsrHostData],
    sources: &[NodeId],
) -> Result<Vec<u32>, GraphError> {
    if sources.len() != graphs.len() {
        return Err(GraphError::SourceCountMismatch {
            expected: graphs.len(),
            got: sources.len(),
        });
    }

    graphs
        .iter()
        .zip(sources)
        .enumerate()
        .map(|(graph, (data, &NodeId(source)))| {
            if (source as usize) < data.num_nodes() {
                Ok(source)
            } else {
                Err(GraphError::SourceOutOfRange {
                    graph,
                    source_node: source,
                    num_nodes: data.num_nodes(),
                })
            }
        })
        .collect()
}
