//! Data-parallel devices that run the BFS kernels
//!
//! A device executes two kernels over uploaded [`SegmentView`]s, one
//! workgroup per graph:
//!
//! - [`Kernel::Init`]: reset distances/parents to `UNVISITED`, seed the source
//! - [`Kernel::FrontierBfs`]: level-synchronous frontier expansion
//!
//! Implementations:
//! - [`CpuDevice`]: always available, emulates workgroups on a rayon pool
//! - `GpuDevice` (feature `gpu`): wgpu compute shaders

mod cpu;

pub use cpu::{CpuDevice, CpuEvent, CpuProgram, CpuSegment, CPU_MAX_WORK_GROUP_SIZE};

use crate::layout::SegmentView;
use anyhow::Result;
use std::time::Duration;
use thiserror::Error;

/// Device initialization and execution errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No compatible GPU adapter found
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(String),

    /// Failed to set up the execution queue
    #[error("Failed to acquire device queue: {0}")]
    QueueAcquisition(String),

    /// Work-group size outside what the device supports
    #[error("Work-group size {requested} not supported (device maximum {max})")]
    UnsupportedWorkGroupSize {
        /// Requested lanes per group
        requested: u32,
        /// Device limit
        max: u32,
    },

    /// More graphs in one segment than the device can dispatch at once
    #[error("{graphs} graphs exceed the per-launch workgroup limit {max}")]
    TooManyGroups {
        /// Graphs in the segment
        graphs: usize,
        /// Device limit
        max: u32,
    },

    /// Host/device transfer failed
    #[error("Buffer transfer failed: {0}")]
    Transfer(String),
}

/// The two kernels of a run, in submission order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Reset result arrays and seed the source
    Init,
    /// Frontier-based traversal
    FrontierBfs,
}

impl Kernel {
    /// Shader entry point / log label
    #[must_use]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Self::Init => "init_graphs",
            Self::FrontierBfs => "frontier_bfs",
        }
    }
}

/// How kernels may touch a device array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Kernels only read
    ReadOnly,
    /// Kernels read and write
    ReadWrite,
}

/// One device-resident array of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceArray {
    /// Name (also the buffer label)
    pub name: &'static str,
    /// Binding slot in the kernel interface
    pub binding: u32,
    /// Kernel access mode
    pub access: AccessMode,
}

const fn array(name: &'static str, binding: u32, access: AccessMode) -> DeviceArray {
    DeviceArray {
        name,
        binding,
        access,
    }
}

/// Arrays bound for every segment, in binding order
pub const SEGMENT_ARRAYS: [DeviceArray; 8] = [
    array("graph_offsets", 0, AccessMode::ReadOnly),
    array("node_counts", 1, AccessMode::ReadOnly),
    array("sources", 2, AccessMode::ReadOnly),
    array("offsets", 3, AccessMode::ReadOnly),
    array("edges", 4, AccessMode::ReadOnly),
    array("distances", 5, AccessMode::ReadWrite),
    array("parents", 6, AccessMode::ReadWrite),
    array("status", 7, AccessMode::ReadWrite),
];

/// A data-parallel device able to run the BFS kernels
///
/// Lifecycle per run: [`compile`](Self::compile) for the group width,
/// [`upload`](Self::upload) every segment, [`launch`](Self::launch) `Init`
/// then `FrontierBfs`, [`wait`](Self::wait), then read timings, status and
/// results. Launches on one device execute in submission order.
#[allow(async_fn_in_trait)]
pub trait ComputeDevice {
    /// Kernels compiled for one work-group size
    type Program;
    /// Device-resident copy of one segment
    type Segment;
    /// Profiling handle of one launch
    type Event;

    /// Human-readable device name
    fn describe(&self) -> String;

    /// Largest supported work-group size
    fn max_work_group_size(&self) -> u32;

    /// Prepare both kernels for `work_group_size` lanes per group
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnsupportedWorkGroupSize`] for a zero or
    /// too-large width, or a compilation error.
    fn compile(&self, work_group_size: u32) -> Result<Self::Program>;

    /// Copy one segment and its per-graph sources to the device
    ///
    /// `sources` holds one graph-local source per graph of the segment.
    ///
    /// # Errors
    ///
    /// Returns error if allocation fails or the segment has more graphs than
    /// one launch can cover.
    fn upload(
        &self,
        program: &Self::Program,
        segment: &SegmentView<'_>,
        sources: &[u32],
    ) -> Result<Self::Segment>;

    /// Submit one kernel over all segments, one workgroup per graph
    ///
    /// # Errors
    ///
    /// Returns error if the launch is rejected.
    fn launch(
        &self,
        program: &Self::Program,
        kernel: Kernel,
        segments: &[Self::Segment],
    ) -> Result<Self::Event>;

    /// Block until every submitted launch has completed
    async fn wait(&self) -> Result<()>;

    /// Device-measured execution time of a completed launch
    async fn elapsed(&self, event: &Self::Event) -> Result<Duration>;

    /// Per-graph status words (0 = ok, otherwise the overflowing level size)
    async fn read_status(&self, segment: &Self::Segment) -> Result<Vec<u32>>;

    /// Copy a segment's result arrays into host slices of segment length
    async fn download(
        &self,
        segment: &Self::Segment,
        distances: &mut [u32],
        parents: &mut [u32],
    ) -> Result<()>;
}

/// Reject widths a device cannot run
pub(crate) fn check_work_group_size(requested: u32, max: u32) -> Result<(), DeviceError> {
    if requested == 0 || requested > max {
        return Err(DeviceError::UnsupportedWorkGroupSize { requested, max });
    }
    Ok(())
}
