use anyhow::{anyhow, Context};
use winit::window::Window;

pub fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        dx12_shader_compiler: Default::default(),
        gles_minor_version: wgpu::Gles3MinorVersion::Automatic,
        flags: wgpu::InstanceFlags::empty(),
    })
}

/// Requests a high performance adapter and a device for it.
///
/// The storage buffer limits are raised to what the adapter supports, the sphere and
/// presented-image buffers can outgrow the defaults on large viewports.
pub async fn request_device(
    instance: &wgpu::Instance,
    compatible_surface: Option<&wgpu::Surface<'_>>,
) -> anyhow::Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        })
        .await
        .ok_or_else(|| anyhow!("No suitable GPU adapter found"))?;

    log::info!("Using adapter: {}", adapter.get_info().name);

    let adapter_limits = adapter.limits();
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Raytracer Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                    max_buffer_size: adapter_limits.max_buffer_size,
                    max_texture_dimension_2d: adapter_limits.max_texture_dimension_2d,
                    ..Default::default()
                },
            },
            None,
        )
        .await
        .context("Failed to create device")?;

    Ok((adapter, device, queue))
}

/// Creates the window surface, the device and a surface configuration matching the window size.
pub async fn setup_gpu(
    window: &Window,
) -> anyhow::Result<(wgpu::Surface<'static>, wgpu::Device, wgpu::Queue, wgpu::SurfaceConfiguration)> {
    let instance = create_instance();

    // The surface must not outlive the window, the caller keeps both and drops the surface first.
    let surface = unsafe {
        let target = wgpu::SurfaceTargetUnsafe::from_window(window).context("Failed to get window handle")?;
        instance.create_surface_unsafe(target)
    }
    .context("Failed to create surface")?;

    let (adapter, device, queue) = request_device(&instance, Some(&surface)).await?;

    let surface_caps = surface.get_capabilities(&adapter);
    let format = surface_caps
        .formats
        .iter()
        .copied()
        .find(|format| !format.is_srgb())
        .or_else(|| surface_caps.formats.first().copied())
        .ok_or_else(|| anyhow!("Surface is not supported by the adapter"))?;

    let size = window.inner_size();
    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &config);

    Ok((surface, device, queue, config))
}
