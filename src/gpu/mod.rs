//! GPU acceleration for multi-graph BFS
//!
//! # Architecture
//!
//! - `device`: GPU device initialization, limits and timestamp support
//! - `buffer`: segment upload and result readback
//! - `shaders`: WGSL kernel template
//! - `bfs`: pipelines, dispatch and the [`ComputeDevice`](crate::ComputeDevice) impl
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```

mod bfs;
mod buffer;
mod device;
pub mod shaders;

pub use bfs::{GpuKernelEvent, GpuProgram};
pub use buffer::GpuSegmentBuffers;
pub use device::GpuDevice;
