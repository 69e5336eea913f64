//! GPU multi-graph BFS
//!
//! Both kernels run one workgroup per graph. A vectorized batch records one
//! dispatch per segment inside a single compute pass; a compressed batch is a
//! single dispatch over every graph. Each pass is bracketed by timestamp
//! queries when the adapter supports them.

use super::buffer::{map_staging, read_buffer};
use super::shaders::multi_bfs_shader;
use super::{GpuDevice, GpuSegmentBuffers};
use crate::device::{check_work_group_size, AccessMode, ComputeDevice, DeviceError, Kernel, SEGMENT_ARRAYS};
use crate::layout::SegmentView;
use anyhow::{bail, ensure, Result};
use std::time::{Duration, Instant};

const DISTANCES: u32 = 5;
const PARENTS: u32 = 6;
const STATUS: u32 = 7;

/// Both kernels compiled for one work-group size
#[derive(Debug)]
pub struct GpuProgram {
    work_group_size: u32,
    bind_group_layout: wgpu::BindGroupLayout,
    init_pipeline: wgpu::ComputePipeline,
    frontier_pipeline: wgpu::ComputePipeline,
}

impl GpuProgram {
    /// Compile the kernels for `work_group_size` lanes per group
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::UnsupportedWorkGroupSize`] if the width exceeds
    /// the device's workgroup limits.
    pub fn new(device: &GpuDevice, work_group_size: u32) -> Result<Self> {
        check_work_group_size(work_group_size, device.workgroup_limit())?;

        let source = multi_bfs_shader(work_group_size);
        let shader_module = device
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Multi-BFS Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let entries: Vec<wgpu::BindGroupLayoutEntry> = SEGMENT_ARRAYS
            .iter()
            .map(|array| wgpu::BindGroupLayoutEntry {
                binding: array.binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage {
                        read_only: array.access == AccessMode::ReadOnly,
                    },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            })
            .collect();

        let bind_group_layout =
            device
                .device()
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Multi-BFS Bind Group Layout"),
                    entries: &entries,
                });

        let pipeline_layout = device
            .device()
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Multi-BFS Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = |kernel: Kernel| {
            device
                .device()
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.entry_point()),
                    layout: Some(&pipeline_layout),
                    module: &shader_module,
                    entry_point: kernel.entry_point(),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
        };
        let init_pipeline = pipeline(Kernel::Init);
        let frontier_pipeline = pipeline(Kernel::FrontierBfs);

        tracing::debug!(work_group_size, "multi-BFS kernels compiled");

        Ok(Self {
            work_group_size,
            bind_group_layout,
            init_pipeline,
            frontier_pipeline,
        })
    }

    /// Lanes per group
    #[must_use]
    pub const fn work_group_size(&self) -> u32 {
        self.work_group_size
    }

    /// Layout every segment bind group follows
    #[must_use]
    pub const fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Pipeline of `kernel`
    #[must_use]
    pub const fn pipeline(&self, kernel: Kernel) -> &wgpu::ComputePipeline {
        match kernel {
            Kernel::Init => &self.init_pipeline,
            Kernel::FrontierBfs => &self.frontier_pipeline,
        }
    }
}

/// Profiling handle of one GPU launch
#[derive(Debug)]
pub struct GpuKernelEvent {
    kernel: Kernel,
    timing: KernelTiming,
}

#[derive(Debug)]
enum KernelTiming {
    /// Resolved begin/end timestamps, copied to a mappable buffer
    Device(wgpu::Buffer),
    /// Submit-to-idle host time
    Host(Duration),
}

impl GpuKernelEvent {
    /// Kernel this event profiles
    #[must_use]
    pub const fn kernel(&self) -> Kernel {
        self.kernel
    }
}

impl ComputeDevice for GpuDevice {
    type Program = GpuProgram;
    type Segment = GpuSegmentBuffers;
    type Event = GpuKernelEvent;

    fn describe(&self) -> String {
        let info = self.info();
        format!("{} ({:?})", info.name, info.backend)
    }

    fn max_work_group_size(&self) -> u32 {
        self.workgroup_limit()
    }

    fn compile(&self, work_group_size: u32) -> Result<GpuProgram> {
        GpuProgram::new(self, work_group_size)
    }

    fn upload(
        &self,
        program: &GpuProgram,
        segment: &SegmentView<'_>,
        sources: &[u32],
    ) -> Result<GpuSegmentBuffers> {
        ensure!(
            sources.len() == segment.num_graphs(),
            "segment has {} graphs but {} sources",
            segment.num_graphs(),
            sources.len()
        );
        let max = self.dispatch_limit();
        if u32::try_from(segment.num_graphs()).map_or(true, |graphs| graphs > max) {
            return Err(DeviceError::TooManyGroups {
                graphs: segment.num_graphs(),
                max,
            }
            .into());
        }

        Ok(GpuSegmentBuffers::upload(
            self,
            program.bind_group_layout(),
            segment,
            sources,
        ))
    }

    #[allow(clippy::cast_possible_truncation)] // group counts checked at upload
    fn launch(
        &self,
        program: &GpuProgram,
        kernel: Kernel,
        segments: &[GpuSegmentBuffers],
    ) -> Result<GpuKernelEvent> {
        let queries = self.has_timestamps().then(|| {
            let query_set = self.device().create_query_set(&wgpu::QuerySetDescriptor {
                label: Some("Kernel Timestamps"),
                ty: wgpu::QueryType::Timestamp,
                count: 2,
            });
            let resolve = self.create_buffer(
                "Timestamp Resolve",
                16,
                wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            );
            let staging = self.create_buffer(
                "Timestamp Staging",
                16,
                wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            );
            (query_set, resolve, staging)
        });

        let mut encoder = self
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Multi-BFS Command Encoder"),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.entry_point()),
                timestamp_writes: queries.as_ref().map(|(query_set, _, _)| {
                    wgpu::ComputePassTimestampWrites {
                        query_set,
                        beginning_of_pass_write_index: Some(0),
                        end_of_pass_write_index: Some(1),
                    }
                }),
            });

            compute_pass.set_pipeline(program.pipeline(kernel));
            for segment in segments {
                compute_pass.set_bind_group(0, segment.bind_group(), &[]);
                compute_pass.dispatch_workgroups(segment.num_graphs as u32, 1, 1);
            }
        }

        if let Some((query_set, resolve, staging)) = &queries {
            encoder.resolve_query_set(query_set, 0..2, resolve, 0);
            encoder.copy_buffer_to_buffer(resolve, 0, staging, 0, 16);
        }

        let submitted = Instant::now();
        self.queue().submit(Some(encoder.finish()));

        let timing = match queries {
            Some((_, _, staging)) => KernelTiming::Device(staging),
            None => {
                self.device().poll(wgpu::Maintain::Wait);
                KernelTiming::Host(submitted.elapsed())
            }
        };

        Ok(GpuKernelEvent { kernel, timing })
    }

    async fn wait(&self) -> Result<()> {
        self.device().poll(wgpu::Maintain::Wait);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    async fn elapsed(&self, event: &GpuKernelEvent) -> Result<Duration> {
        match &event.timing {
            KernelTiming::Host(elapsed) => Ok(*elapsed),
            KernelTiming::Device(staging) => {
                let ticks: Vec<u64> = map_staging(self, staging).await?;
                let &[start, end] = ticks.as_slice() else {
                    bail!("expected 2 timestamps, got {}", ticks.len());
                };
                let period = f64::from(self.queue().get_timestamp_period());
                let nanos = end.saturating_sub(start) as f64 * period;
                Ok(Duration::from_nanos(nanos as u64))
            }
        }
    }

    async fn read_status(&self, segment: &GpuSegmentBuffers) -> Result<Vec<u32>> {
        read_buffer(self, segment.buffer(STATUS), segment.num_graphs).await
    }

    async fn download(
        &self,
        segment: &GpuSegmentBuffers,
        distances: &mut [u32],
        parents: &mut [u32],
    ) -> Result<()> {
        ensure!(
            distances.len() == segment.num_nodes && parents.len() == segment.num_nodes,
            "download target holds {} nodes, segment has {}",
            distances.len(),
            segment.num_nodes
        );
        let device_distances: Vec<u32> =
            read_buffer(self, segment.buffer(DISTANCES), segment.num_nodes).await?;
        let device_parents: Vec<u32> =
            read_buffer(self, segment.buffer(PARENTS), segment.num_nodes).await?;

        distances.copy_from_slice(&device_distances);
        parents.copy_from_slice(&device_parents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CsrHostData, NodeId, UNVISITED};
    use crate::{LayoutKind, MultiBfsError, MultiGraphBfs, RunConfig};

    fn chain(n: u32) -> CsrHostData {
        let edges: Vec<_> = (0..n - 1).map(|i| (NodeId(i), NodeId(i + 1))).collect();
        CsrHostData::from_edge_list(n as usize, &edges).unwrap()
    }

    #[tokio::test]
    async fn test_gpu_bfs_chains() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_bfs_chains: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        for layout in LayoutKind::ALL {
            let mut graphs = vec![chain(3), chain(5)];
            let config = RunConfig::new().with_layout(layout).with_work_group_size(64);
            MultiGraphBfs::new(&device, config)
                .run(&mut graphs, &[NodeId(0), NodeId(2)])
                .await
                .unwrap();

            assert_eq!(graphs[0].distances(), &[0, 1, 2]);
            assert_eq!(graphs[0].parents(), &[0, 0, 1]);
            assert_eq!(graphs[1].distances(), &[UNVISITED, UNVISITED, 0, 1, 2]);
            assert_eq!(graphs[1].parents(), &[UNVISITED, UNVISITED, 2, 2, 3]);
        }
    }

    #[tokio::test]
    async fn test_gpu_overflow_detected() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_overflow_detected: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let edges: Vec<_> = (1..=100).map(|i| (NodeId(0), NodeId(i))).collect();
        let mut graphs = vec![CsrHostData::from_edge_list(101, &edges).unwrap()];

        let config = RunConfig::new()
            .with_work_group_size(64)
            .with_frontier_check(false);
        let err = MultiGraphBfs::new(&device, config)
            .run(&mut graphs, &[NodeId(0)])
            .await
            .unwrap_err();

        assert_eq!(
            err.downcast_ref::<MultiBfsError>(),
            Some(&MultiBfsError::FrontierOverflow {
                graph: 0,
                produced: 100,
                capacity: 64
            })
        );
    }

    #[tokio::test]
    async fn test_gpu_rejects_oversized_group() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_rejects_oversized_group: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let too_wide = device.workgroup_limit() + 1;
        let err = GpuProgram::new(&device, too_wide).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeviceError>(),
            Some(DeviceError::UnsupportedWorkGroupSize { .. })
        ));
    }
}
