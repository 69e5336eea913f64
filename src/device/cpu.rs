//! CPU device: workgroups emulated on a dedicated rayon pool
//!
//! Groups run as independent parallel tasks. Within a group, the lanes of a
//! level run as a parallel iterator and the level barrier is the join at its
//! end. Device memory is owned atomics, so lanes race exactly the way device
//! invocations do: the distance claim is an atomic min and the frontier
//! slot is a fetch-and-add on a group-local counter.

use super::{check_work_group_size, ComputeDevice, DeviceError, Kernel};
use crate::layout::SegmentView;
use crate::storage::UNVISITED;
use anyhow::{ensure, Result};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

/// Largest work-group size the CPU device accepts
pub const CPU_MAX_WORK_GROUP_SIZE: u32 = 1024;

/// CPU compute device
#[derive(Debug)]
pub struct CpuDevice {
    pool: rayon::ThreadPool,
    epoch: Instant,
}

/// Compiled "kernels": just the group width
#[derive(Debug, Clone, Copy)]
pub struct CpuProgram {
    work_group_size: u32,
}

/// Device copy of one segment
#[derive(Debug)]
pub struct CpuSegment {
    graph_offsets: Box<[u32]>,
    node_counts: Box<[u32]>,
    sources: Box<[u32]>,
    offsets: Box<[u32]>,
    edges: Box<[u32]>,
    distances: Box<[AtomicU32]>,
    parents: Box<[AtomicU32]>,
    status: Box<[AtomicU32]>,
}

/// Start/end of one launch on the device clock
#[derive(Debug, Clone, Copy)]
pub struct CpuEvent {
    kernel: Kernel,
    start: Duration,
    end: Duration,
}

impl CpuEvent {
    /// Kernel this event profiles
    #[must_use]
    pub const fn kernel(&self) -> Kernel {
        self.kernel
    }
}

impl CpuDevice {
    /// Device backed by one worker per available core
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::QueueAcquisition`] if the pool cannot start.
    pub fn new() -> Result<Self, DeviceError> {
        Self::with_threads(0)
    }

    /// Device backed by `threads` workers (0 = one per core)
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::QueueAcquisition`] if the pool cannot start.
    pub fn with_threads(threads: usize) -> Result<Self, DeviceError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("multibfs-cpu-{i}"))
            .build()
            .map_err(|e| DeviceError::QueueAcquisition(e.to_string()))?;

        tracing::info!(threads = pool.current_num_threads(), "CPU device ready");

        Ok(Self {
            pool,
            epoch: Instant::now(),
        })
    }

    /// Worker threads in the pool
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl CpuSegment {
    fn num_graphs(&self) -> usize {
        self.node_counts.len()
    }
}

fn atomics(values: &[u32]) -> Box<[AtomicU32]> {
    values.iter().map(|&v| AtomicU32::new(v)).collect()
}

fn snapshot(values: &[AtomicU32], out: &mut [u32]) {
    for (dst, src) in out.iter_mut().zip(values) {
        *dst = src.load(Ordering::Relaxed);
    }
}

impl ComputeDevice for CpuDevice {
    type Program = CpuProgram;
    type Segment = CpuSegment;
    type Event = CpuEvent;

    fn describe(&self) -> String {
        format!("cpu ({} threads)", self.threads())
    }

    fn max_work_group_size(&self) -> u32 {
        CPU_MAX_WORK_GROUP_SIZE
    }

    fn compile(&self, work_group_size: u32) -> Result<CpuProgram> {
        check_work_group_size(work_group_size, CPU_MAX_WORK_GROUP_SIZE)?;
        Ok(CpuProgram { work_group_size })
    }

    fn upload(
        &self,
        _program: &CpuProgram,
        segment: &SegmentView<'_>,
        sources: &[u32],
    ) -> Result<CpuSegment> {
        ensure!(
            sources.len() == segment.num_graphs(),
            "segment has {} graphs but {} sources",
            segment.num_graphs(),
            sources.len()
        );

        Ok(CpuSegment {
            graph_offsets: segment.graph_offsets.into(),
            node_counts: segment.node_counts.into(),
            sources: sources.into(),
            offsets: segment.offsets.into(),
            edges: segment.edges.into(),
            distances: atomics(segment.distances),
            parents: atomics(segment.parents),
            status: (0..segment.num_graphs()).map(|_| AtomicU32::new(0)).collect(),
        })
    }

    fn launch(&self, program: &CpuProgram, kernel: Kernel, segments: &[CpuSegment]) -> Result<CpuEvent> {
        let width = program.work_group_size as usize;
        let start = self.epoch.elapsed();

        self.pool.install(|| {
            segments.par_iter().for_each(|segment| {
                (0..segment.num_graphs())
                    .into_par_iter()
                    .for_each(|group| match kernel {
                        Kernel::Init => init_group(segment, group, width),
                        Kernel::FrontierBfs => frontier_group(segment, group, width),
                    });
            });
        });

        let end = self.epoch.elapsed();
        tracing::debug!(
            kernel = kernel.entry_point(),
            micros = (end - start).as_micros(),
            "cpu launch complete"
        );
        Ok(CpuEvent { kernel, start, end })
    }

    async fn wait(&self) -> Result<()> {
        // Launches run to completion inside `launch`
        Ok(())
    }

    async fn elapsed(&self, event: &CpuEvent) -> Result<Duration> {
        Ok(event.end.saturating_sub(event.start))
    }

    async fn read_status(&self, segment: &CpuSegment) -> Result<Vec<u32>> {
        let mut status = vec![0; segment.status.len()];
        snapshot(&segment.status, &mut status);
        Ok(status)
    }

    async fn download(
        &self,
        segment: &CpuSegment,
        distances: &mut [u32],
        parents: &mut [u32],
    ) -> Result<()> {
        ensure!(
            distances.len() == segment.distances.len() && parents.len() == segment.parents.len(),
            "download target holds {} nodes, segment has {}",
            distances.len(),
            segment.distances.len()
        );
        snapshot(&segment.distances, distances);
        snapshot(&segment.parents, parents);
        Ok(())
    }
}

/// Initialization kernel, one group: lanes stride over the graph's nodes
fn init_group(segment: &CpuSegment, group: usize, width: usize) {
    let base = segment.graph_offsets[group] as usize;
    let num_nodes = segment.node_counts[group] as usize;
    let source = segment.sources[group];

    (0..width).into_par_iter().for_each(|lane| {
        for node in (lane..num_nodes).step_by(width) {
            let (distance, parent) = if node == source as usize {
                (0, source)
            } else {
                (UNVISITED, UNVISITED)
            };
            segment.distances[base + node].store(distance, Ordering::Relaxed);
            segment.parents[base + node].store(parent, Ordering::Relaxed);
        }
        if lane == 0 {
            segment.status[group].store(0, Ordering::Relaxed);
        }
    });
}

/// Frontier BFS kernel, one group
///
/// The frontier holds two halves of `width` slots; level `l` reads half
/// `l % 2` and appends to the other. A reservation past `width` is dropped
/// and reported through the group's status word.
fn frontier_group(segment: &CpuSegment, group: usize, width: usize) {
    let base = segment.graph_offsets[group] as usize;
    let source = segment.sources[group];

    let frontier: Vec<AtomicU32> = (0..2 * width).map(|_| AtomicU32::new(0)).collect();
    let next_size = AtomicU32::new(0);

    // Seed (lane 0)
    segment.distances[base + source as usize].store(0, Ordering::Relaxed);
    segment.parents[base + source as usize].store(source, Ordering::Relaxed);
    frontier[0].store(source, Ordering::Relaxed);
    let mut current_size = 1_usize;
    let mut level = 0_u32;

    while current_size > 0 {
        let (current, next) = if level % 2 == 0 { (0, width) } else { (width, 0) };
        let next_distance = level + 1;

        (0..current_size).into_par_iter().for_each(|lane| {
            let node = frontier[current + lane].load(Ordering::Relaxed);
            let at = base + node as usize;
            let start = segment.offsets[at] as usize;
            let end = segment.offsets[at + 1] as usize;

            for &neighbor in &segment.edges[start..end] {
                let target = base + neighbor as usize;
                let claimed = segment.distances[target].fetch_min(next_distance, Ordering::AcqRel)
                    == UNVISITED;
                if !claimed {
                    continue;
                }
                segment.parents[target].store(node, Ordering::Relaxed);
                let slot = next_size.fetch_add(1, Ordering::AcqRel) as usize;
                if slot < width {
                    frontier[next + slot].store(neighbor, Ordering::Relaxed);
                }
            }
        });

        // Barrier: every lane of this level has finished
        let produced = next_size.swap(0, Ordering::AcqRel);
        if produced as usize > width {
            segment.status[group].store(produced, Ordering::Relaxed);
            tracing::debug!(group, level, produced, width, "frontier overflow");
            return;
        }
        current_size = produced as usize;
        level += 1;
    }
}
