//! quadbatch GPU backend
//!
//! wgpu implementation of [`quadbatch_core::RenderBackend`]. Quads are drawn
//! into an offscreen RGBA8 target with one of two pipelines, depending on
//! whether a stream carries per-vertex tint.

pub mod backend;
pub mod error;
pub mod readback;
pub mod shaders;
pub mod texture;

pub use backend::WgpuBackend;
pub use error::GpuError;
pub use texture::{GpuTexture, TextureBinder};

fn preferred_backends() -> wgpu::Backends {
    #[cfg(target_os = "macos")]
    {
        wgpu::Backends::METAL
    }
    #[cfg(target_os = "windows")]
    {
        wgpu::Backends::DX12
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        wgpu::Backends::all()
    }
}

/// Request a device and queue with no surface attached.
pub async fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: preferred_backends(),
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .ok_or(GpuError::AdapterNotFound)?;

    let info = adapter.get_info();
    tracing::info!(name = %info.name, backend = ?info.backend, "using GPU adapter");

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("quadbatch Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        )
        .await?;

    Ok((device, queue))
}

/// Blocking form of [`request_headless_device`]
pub fn headless_device() -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    pollster::block_on(request_headless_device())
}
