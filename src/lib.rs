//! trueno-multibfs: batched breadth-first search over many graphs at once
//!
//! # Overview
//!
//! Runs one BFS per graph for a whole batch of CSR graphs on a data-parallel
//! device, one workgroup per graph. The batch is packed into one of two
//! aggregate layouts, the kernels are timed, and each graph receives its own
//! distance and parent arrays.
//!
//! # Quick Start
//!
//! ```no_run
//! use trueno_multibfs::{CpuDevice, CsrHostData, LayoutKind, MultiGraphBfs, NodeId, RunConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut graphs = vec![
//!     CsrHostData::from_edge_list(3, &[(NodeId(0), NodeId(1)), (NodeId(1), NodeId(2))])?,
//!     CsrHostData::from_edge_list(2, &[(NodeId(1), NodeId(0))])?,
//! ];
//!
//! let device = CpuDevice::new()?;
//! let config = RunConfig::new().with_layout(LayoutKind::Vectorized);
//! let time = MultiGraphBfs::new(&device, config)
//!     .run(&mut graphs, &[NodeId(0), NodeId(1)])
//!     .await?;
//!
//! assert_eq!(graphs[0].distance(NodeId(2)), Some(2));
//! println!("kernels: {:.1} us", time.kernel_time_us);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: per-graph CSR host data plus edge-list loading
//! - **Layout**: vectorized (per-graph arrays) or compressed (flat arrays)
//! - **Device**: [`ComputeDevice`] trait; rayon CPU device, wgpu GPU device
//!   behind the `gpu` feature
//! - **Driver**: bind, launch, time, check overflow, write back

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod binding;
pub mod config;
pub mod device;
pub mod driver;
pub mod layout;
pub mod storage;

// GPU acceleration (optional)
#[cfg(feature = "gpu")]
pub mod gpu;

// Re-export core types
pub use algorithms::{bfs_reference, level_widths, max_level_width, verify_bfs_tree, BfsTree};
pub use binding::BoundBatch;
pub use config::{ConfigError, RunConfig, DEFAULT_WORK_GROUP_SIZE};
pub use device::{
    AccessMode, ComputeDevice, CpuDevice, DeviceArray, DeviceError, Kernel, SEGMENT_ARRAYS,
};
pub use driver::{BenchTime, MultiBfsError, MultiGraphBfs};
pub use layout::{CompressedLayout, GraphLayout, LayoutKind, SegmentView, VectorizedLayout};
pub use storage::{CsrHostData, GraphError, NodeId, UNVISITED};

#[cfg(feature = "gpu")]
pub use gpu::{GpuDevice, GpuSegmentBuffers};

// Error type
pub use anyhow::{Error, Result};
