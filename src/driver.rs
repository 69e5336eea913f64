//! Benchmark driver: one timed multi-graph BFS run
//!
//! A run validates the batch, binds it to the device, then times the two
//! kernel launches:
//!
//! ```text
//! bind ─┬─ wall clock start
//!       ├─ launch Init
//!       ├─ launch FrontierBfs
//!       ├─ wait
//!       └─ wall clock stop ── status check ── write-back
//! ```
//!
//! Kernel time is the sum of both launches' device-measured durations.

use crate::algorithms::max_level_width;
use crate::binding::{validate_sources, BoundBatch};
use crate::config::RunConfig;
use crate::device::{ComputeDevice, Kernel};
use crate::layout::validate_batch;
use crate::storage::{CsrHostData, GraphError, NodeId};
use anyhow::Result;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures detected on the device during a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiBfsError {
    /// A level produced more nodes than the group frontier holds
    #[error("graph {graph}: a BFS level produced {produced} nodes, frontier capacity is {capacity}")]
    FrontierOverflow {
        /// Position of the graph in the batch
        graph: usize,
        /// Nodes claimed on the overflowing level
        produced: u32,
        /// Work-group size of the run
        capacity: u32,
    },
}

/// Timing of one run, in microseconds
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BenchTime {
    /// Device time of both kernels
    pub kernel_time_us: f64,
    /// Host wall clock from first submission to completion
    pub total_time_us: f64,
}

impl BenchTime {
    fn from_durations(kernel: Duration, total: Duration) -> Self {
        Self {
            kernel_time_us: kernel.as_secs_f64() * 1e6,
            total_time_us: total.as_secs_f64() * 1e6,
        }
    }
}

/// Runs BFS over a batch of graphs on one device
///
/// ```
/// use trueno_multibfs::{CpuDevice, CsrHostData, MultiGraphBfs, NodeId, RunConfig};
///
/// # async fn example() -> anyhow::Result<()> {
/// let device = CpuDevice::new()?;
/// let mut graphs = vec![CsrHostData::from_edge_list(
///     3,
///     &[(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2))],
/// )?];
///
/// let time = MultiGraphBfs::new(&device, RunConfig::default())
///     .run(&mut graphs, &[NodeId(0)])
///     .await?;
///
/// assert_eq!(graphs[0].distances(), &[0, 1, 2]);
/// assert!(time.kernel_time_us <= time.total_time_us);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MultiGraphBfs<'d, D: ComputeDevice> {
    device: &'d D,
    config: RunConfig,
}

impl<'d, D: ComputeDevice> MultiGraphBfs<'d, D> {
    /// Driver for `device` with `config`
    #[must_use]
    pub const fn new(device: &'d D, config: RunConfig) -> Self {
        Self { device, config }
    }

    /// Configuration in use
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run BFS from `sources[g]` on every `graphs[g]`
    ///
    /// With write-back enabled each graph's `distances`/`parents` hold its
    /// BFS tree afterwards; otherwise the caller's arrays are untouched.
    ///
    /// # Errors
    ///
    /// - [`GraphError`] for an invalid batch or sources, or (with the frontier
    ///   check on) a level wider than the work-group size
    /// - [`MultiBfsError::FrontierOverflow`] if the device saw a level too wide
    /// - device errors from compilation, upload, launch or transfer
    pub async fn run(&self, graphs: &mut [CsrHostData], sources: &[NodeId]) -> Result<BenchTime> {
        let config = self.config;
        config.validate()?;

        validate_batch(graphs)?;
        validate_sources(graphs, sources)?;
        if config.check_frontier_bound {
            check_frontier_width(graphs, sources, config.work_group_size)?;
        }

        let mut batch = BoundBatch::bind(
            self.device,
            graphs,
            sources,
            config.layout,
            config.work_group_size,
        )?;

        let wall_clock = Instant::now();
        let events = [batch.launch(Kernel::Init)?, batch.launch(Kernel::FrontierBfs)?];
        self.device.wait().await?;
        let total = wall_clock.elapsed();

        let mut kernel = Duration::ZERO;
        for event in &events {
            kernel += self.device.elapsed(event).await?;
        }

        let status = batch.status().await?;
        if let Some((graph, &produced)) = status.iter().enumerate().find(|&(_, &s)| s != 0) {
            tracing::warn!(graph, produced, capacity = config.work_group_size, "frontier overflow");
            return Err(MultiBfsError::FrontierOverflow {
                graph,
                produced,
                capacity: config.work_group_size,
            }
            .into());
        }

        if config.write_back {
            batch.write_back().await?;
        }

        let time = BenchTime::from_durations(kernel, total);
        tracing::info!(
            layout = %config.layout,
            graphs = batch.num_graphs(),
            work_group_size = config.work_group_size,
            kernel_us = time.kernel_time_us,
            total_us = time.total_time_us,
            "multi-graph BFS complete"
        );
        Ok(time)
    }
}

/// Host check that no BFS level outgrows the per-group frontier
fn check_frontier_width(
    graphs: &[CsrHostData],
    sources: &[NodeId],
    capacity: u32,
) -> Result<(), GraphError> {
    for (graph, (data, &source)) in graphs.iter().zip(sources).enumerate() {
        let (level, width) = max_level_width(data, source);
        if width > capacity as usize {
            return Err(GraphError::FrontierTooWide {
                graph,
                level,
                width,
                capacity,
            });
        }
    }
    Ok(())
}
