//! GPU buffer management for BFS segments
//!
//! Handles uploading a segment (graph tables, CSR arrays, sources, results)
//! to GPU and reading results back.

use super::GpuDevice;
use crate::device::{AccessMode, DeviceError, SEGMENT_ARRAYS};
use crate::layout::SegmentView;
use anyhow::{Context, Result};

/// GPU buffers for one segment
///
/// One storage buffer per entry of [`SEGMENT_ARRAYS`], in binding order,
/// plus the bind group tying them to the kernels.
#[derive(Debug)]
pub struct GpuSegmentBuffers {
    /// Number of graphs in the segment
    pub num_graphs: usize,

    /// Number of nodes in the segment
    pub num_nodes: usize,

    /// Number of edges in the segment
    pub num_edges: usize,

    buffers: Vec<wgpu::Buffer>,
    bind_group: wgpu::BindGroup,
}

impl GpuSegmentBuffers {
    /// Upload `segment` and its per-graph `sources`, binding them to `layout`
    pub fn upload(
        device: &GpuDevice,
        layout: &wgpu::BindGroupLayout,
        segment: &SegmentView<'_>,
        sources: &[u32],
    ) -> Self {
        let status = vec![0_u32; segment.num_graphs()];
        let contents: [&[u32]; 8] = [
            segment.graph_offsets,
            segment.node_counts,
            sources,
            segment.offsets,
            segment.edges,
            segment.distances,
            segment.parents,
            &status,
        ];

        let buffers: Vec<wgpu::Buffer> = SEGMENT_ARRAYS
            .iter()
            .zip(contents)
            .map(|(array, data)| {
                let usage = match array.access {
                    AccessMode::ReadOnly => wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                    AccessMode::ReadWrite => {
                        wgpu::BufferUsages::STORAGE
                            | wgpu::BufferUsages::COPY_SRC
                            | wgpu::BufferUsages::COPY_DST
                    }
                };
                // Zero-sized bindings are invalid (edgeless segments)
                let data = if data.is_empty() { &[0_u32][..] } else { data };
                device.create_buffer_init(array.name, bytemuck::cast_slice(data), usage)
            })
            .collect();

        let entries: Vec<wgpu::BindGroupEntry<'_>> = SEGMENT_ARRAYS
            .iter()
            .zip(&buffers)
            .map(|(array, buffer)| wgpu::BindGroupEntry {
                binding: array.binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        let bind_group = device
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Segment Bind Group"),
                layout,
                entries: &entries,
            });

        Self {
            num_graphs: segment.num_graphs(),
            num_nodes: segment.num_nodes(),
            num_edges: segment.num_edges(),
            buffers,
            bind_group,
        }
    }

    /// Bind group for both kernels
    #[must_use]
    pub const fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Buffer bound at `binding`
    ///
    /// # Panics
    ///
    /// Panics if `binding` is not a slot of [`SEGMENT_ARRAYS`].
    #[must_use]
    pub fn buffer(&self, binding: u32) -> &wgpu::Buffer {
        &self.buffers[binding as usize]
    }
}

/// Copy `count` elements of `buffer` into a fresh staging buffer and read them
pub(crate) async fn read_buffer<T: bytemuck::Pod>(
    device: &GpuDevice,
    buffer: &wgpu::Buffer,
    count: usize,
) -> Result<Vec<T>> {
    let size = (count * std::mem::size_of::<T>()) as u64;
    if size == 0 {
        return Ok(Vec::new());
    }

    let staging_buffer = device.create_buffer(
        "Readback Staging",
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(buffer, 0, &staging_buffer, 0, size);
    device.queue().submit(Some(encoder.finish()));

    map_staging(device, &staging_buffer).await
}

/// Map a `MAP_READ` buffer and copy out its contents
pub(crate) async fn map_staging<T: bytemuck::Pod>(
    device: &GpuDevice,
    staging_buffer: &wgpu::Buffer,
) -> Result<Vec<T>> {
    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();

    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.device().poll(wgpu::Maintain::Wait);
    rx.receive()
        .await
        .context("Failed to receive map result")?
        .map_err(|e| DeviceError::Transfer(e.to_string()))?;

    let data = buffer_slice.get_mapped_range();
    let values: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging_buffer.unmap();

    Ok(values)
}
