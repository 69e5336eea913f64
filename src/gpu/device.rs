//! GPU device initialization and management
//!
//! Handles wgpu device creation, adapter selection, feature/limit negotiation
//! and buffer creation.

use super::shaders::workgroup_storage_bytes;
use crate::device::DeviceError;
use wgpu::util::DeviceExt;

/// GPU device wrapper for multi-graph BFS
///
/// # Example
///
/// ```ignore
/// # use trueno_multibfs::gpu::GpuDevice;
/// let device = GpuDevice::new().await?;
/// println!("{}", device.info().name);
/// ```
#[derive(Debug)]
pub struct GpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter: wgpu::Adapter,
    timestamps: bool,
}

impl GpuDevice {
    /// Check if GPU is available without keeping a device
    ///
    /// This is useful for tests to skip gracefully when GPU is not available.
    pub async fn is_gpu_available() -> bool {
        Self::new().await.is_ok()
    }

    /// Initialize GPU device with default settings
    ///
    /// # Errors
    ///
    /// Returns `DeviceError` if:
    /// - No compatible GPU adapter found
    /// - Device request fails
    pub async fn new() -> Result<Self, DeviceError> {
        Self::new_with_backend(wgpu::Backends::all()).await
    }

    /// Initialize GPU device with specific backend
    ///
    /// Timestamp queries are enabled when the adapter offers them.
    ///
    /// # Errors
    ///
    /// Returns `DeviceError` if device initialization fails
    pub async fn new_with_backend(backends: wgpu::Backends) -> Result<Self, DeviceError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(DeviceError::NoAdapter)?;

        let timestamps = adapter.features().contains(wgpu::Features::TIMESTAMP_QUERY);
        let required_features = if timestamps {
            wgpu::Features::TIMESTAMP_QUERY
        } else {
            wgpu::Features::empty()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("trueno-multibfs GPU device"),
                    required_features,
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| DeviceError::DeviceRequest(e.to_string()))?;

        let info = adapter.get_info();
        tracing::info!(
            adapter = %info.name,
            backend = ?info.backend,
            timestamps,
            "GPU device ready"
        );
        if !timestamps {
            tracing::warn!("adapter lacks timestamp queries, kernel time is host-measured");
        }

        Ok(Self {
            device,
            queue,
            adapter,
            timestamps,
        })
    }

    /// Get adapter info (GPU name, backend, etc.)
    #[must_use]
    pub fn info(&self) -> wgpu::AdapterInfo {
        self.adapter.get_info()
    }

    /// Whether kernel passes are timed on the device
    #[must_use]
    pub const fn has_timestamps(&self) -> bool {
        self.timestamps
    }

    /// Largest workgroup the BFS kernels can use on this device
    ///
    /// Bounded by the x dimension, total invocations and the workgroup memory
    /// the frontier needs.
    #[must_use]
    pub fn workgroup_limit(&self) -> u32 {
        let limits = self.device.limits();
        let mut width = limits
            .max_compute_workgroup_size_x
            .min(limits.max_compute_invocations_per_workgroup);
        while width > 0 && workgroup_storage_bytes(width) > limits.max_compute_workgroup_storage_size {
            width /= 2;
        }
        width
    }

    /// Most workgroups one dispatch may launch
    #[must_use]
    pub fn dispatch_limit(&self) -> u32 {
        self.device.limits().max_compute_workgroups_per_dimension
    }

    /// Create GPU buffer with initial data
    pub fn create_buffer_init(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    /// Create empty GPU buffer
    pub fn create_buffer(&self, label: &str, size: u64, usage: wgpu::BufferUsages) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        })
    }

    /// Get device reference
    #[must_use]
    pub const fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Get queue reference
    #[must_use]
    pub const fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gpu_device_creation() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_device_creation: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        assert!(!device.info().name.is_empty(), "Adapter name should not be empty");
        assert!(device.workgroup_limit() >= 64);
        assert!(device.dispatch_limit() >= 1);
    }

    #[tokio::test]
    async fn test_gpu_device_with_invalid_backend() {
        // No backends, no adapter
        let device = GpuDevice::new_with_backend(wgpu::Backends::empty()).await;
        assert!(
            device.is_err(),
            "Device creation should fail with empty backends"
        );
    }

    #[tokio::test]
    async fn test_create_buffers() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_create_buffers: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let data: Vec<u32> = vec![1, 2, 3, 4];

        let buffer =
            device.create_buffer_init("test_init", bytemuck::cast_slice(&data), wgpu::BufferUsages::STORAGE);
        assert_eq!(buffer.size(), (data.len() * 4) as u64);

        let buffer = device.create_buffer(
            "test_buffer",
            1024,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        assert_eq!(buffer.size(), 1024);
    }
}
