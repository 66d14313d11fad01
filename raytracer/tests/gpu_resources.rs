//! Tests against a real adapter. Each test returns early when no GPU is available.
use pollster::block_on;
use raytracing_lib::{
    AccumulationController, Compositor, GpuAllocator, OutputTargets, RenderError, RenderSession, WgpuAllocator,
};
use scene::{Camera, Config, Projection};

const CONFIG: &str = r#"
[camera]
position = [0.0, 35.0, 140.0]
rotation = [0.0, -15.0]
fov = 60.0

[spheres]
max_count = 20
radius = [3.0, 8.0]
placement_radius = 100.0
seed = 7

[light]
direction = [0.3, -1.0, 0.5]
intensity = 1.0
"#;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn gpu() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu_utils::create_instance();
    match block_on(wgpu_utils::request_device(&instance, None)) {
        Ok((_adapter, device, queue)) => Some((device, queue)),
        Err(error) => {
            eprintln!("skipping GPU test: {}", error);
            None
        }
    }
}

fn target(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn camera_for(config: &Config, width: u32, height: u32) -> (Camera, Projection) {
    (
        Camera::from_config(&config.camera),
        Projection::from_config(width, height, &config.camera),
    )
}

fn read_presented(device: &wgpu::Device, queue: &wgpu::Queue, output: &OutputTargets) -> Vec<f32> {
    let size = output.presented.size();
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Buffer"),
        size,
        usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    encoder.copy_buffer_to_buffer(&output.presented, 0, &staging, 0, size);
    queue.submit(std::iter::once(encoder.finish()));

    let slice = staging.slice(..);
    slice.map_async(wgpu::MapMode::Read, |_| ());
    device.poll(wgpu::Maintain::Wait);
    let data = slice.get_mapped_range();
    bytemuck::cast_slice::<u8, f32>(&data).to_vec()
}

#[test]
fn test_session_accumulates_frames() {
    let Some((device, queue)) = gpu() else { return };
    let config = Config::from_str(CONFIG).unwrap();
    let mut session = RenderSession::new(&device, &queue, &config, TARGET_FORMAT).unwrap();
    let (camera, projection) = camera_for(&config, 64, 48);
    let view = target(&device, 64, 48);

    session.on_activate(&device).unwrap();
    assert!(session.resources().sphere_count() > 0);
    for frame in 0..3 {
        session.prepare_frame(&device, 64, 48).unwrap();
        session.render_frame(&device, &queue, &camera, &projection, &view).unwrap();
        assert_eq!(session.sample_count(), frame + 1);
    }

    let output = session.resources().output().expect("output should be allocated");
    let pixels = read_presented(&device, &queue, output);
    assert_eq!(pixels.len(), 64 * 48 * 4);
    assert!(pixels.iter().all(|value| value.is_finite()));
    // Every raw sample has alpha 1, so does their average
    assert!(pixels.chunks(4).all(|pixel| (pixel[3] - 1.0).abs() < 1e-5));
    assert!(pixels.chunks(4).any(|pixel| pixel[0] > 0.0 || pixel[1] > 0.0 || pixel[2] > 0.0));
}

#[test]
fn test_resize_recreates_output_and_resets() {
    let Some((device, queue)) = gpu() else { return };
    let config = Config::from_str(CONFIG).unwrap();
    let mut session = RenderSession::new(&device, &queue, &config, TARGET_FORMAT).unwrap();
    session.on_activate(&device).unwrap();

    let (camera, projection) = camera_for(&config, 64, 48);
    let view = target(&device, 64, 48);
    for _ in 0..2 {
        session.prepare_frame(&device, 64, 48).unwrap();
        session.render_frame(&device, &queue, &camera, &projection, &view).unwrap();
    }
    assert_eq!(session.sample_count(), 2);

    let (camera, projection) = camera_for(&config, 32, 32);
    let view = target(&device, 32, 32);
    session.prepare_frame(&device, 32, 32).unwrap();
    assert_eq!(session.resources().output_extent(), Some((32, 32)));
    session.render_frame(&device, &queue, &camera, &projection, &view).unwrap();
    assert_eq!(session.sample_count(), 1);
}

#[test]
fn test_view_change_restarts_accumulation() {
    let Some((device, queue)) = gpu() else { return };
    let config = Config::from_str(CONFIG).unwrap();
    let mut session = RenderSession::new(&device, &queue, &config, TARGET_FORMAT).unwrap();
    session.on_activate(&device).unwrap();
    let (camera, projection) = camera_for(&config, 16, 16);
    let view = target(&device, 16, 16);

    for _ in 0..4 {
        session.prepare_frame(&device, 16, 16).unwrap();
        session.render_frame(&device, &queue, &camera, &projection, &view).unwrap();
    }
    session.on_view_changed();
    session.prepare_frame(&device, 16, 16).unwrap();
    session.render_frame(&device, &queue, &camera, &projection, &view).unwrap();
    assert_eq!(session.sample_count(), 1);
}

#[test]
fn test_deactivate_releases_resources() {
    let Some((device, queue)) = gpu() else { return };
    let config = Config::from_str(CONFIG).unwrap();
    let mut session = RenderSession::new(&device, &queue, &config, TARGET_FORMAT).unwrap();
    session.on_activate(&device).unwrap();
    session.prepare_frame(&device, 16, 16).unwrap();

    session.on_deactivate();
    assert!(!session.is_active());
    assert!(session.resources().output().is_none());
    assert!(session.resources().geometry().is_none());
    assert!(matches!(
        session.prepare_frame(&device, 16, 16),
        Err(RenderError::Inactive)
    ));

    // Second teardown is a no-op
    session.on_deactivate();
    assert!(session.resources().output().is_none());
}

#[test]
fn test_oversized_output_is_rejected() {
    let Some((device, queue)) = gpu() else { return };
    let config = Config::from_str(CONFIG).unwrap();
    let mut session = RenderSession::new(&device, &queue, &config, TARGET_FORMAT).unwrap();
    session.on_activate(&device).unwrap();

    let too_wide = device.limits().max_texture_dimension_2d + 1;
    let error = session.prepare_frame(&device, too_wide, 1).unwrap_err();
    assert!(matches!(error, RenderError::ResourceExhausted { .. }));
    assert!(error.is_frame_local());

    // The next frame with a valid size works again
    session.prepare_frame(&device, 16, 16).unwrap();
}

#[test]
fn test_missing_light_is_rejected() {
    let Some((device, queue)) = gpu() else { return };
    let without_light = CONFIG.replace("[light]\ndirection = [0.3, -1.0, 0.5]\nintensity = 1.0\n", "");
    let config = Config::from_str(&without_light).unwrap();
    assert!(config.light.is_none());
    assert!(matches!(
        RenderSession::new(&device, &queue, &config, TARGET_FORMAT),
        Err(RenderError::MissingLight)
    ));
}

#[test]
fn test_invalid_kernel_is_rejected() {
    let Some((device, queue)) = gpu() else { return };
    let path = std::env::temp_dir().join(format!("invalid_kernel_{}.wgsl", std::process::id()));
    std::fs::write(&path, "fn main( {").unwrap();
    let with_kernel = format!("{}\n[kernel]\npath = {:?}\n", CONFIG, path.to_string_lossy());
    let config = Config::from_str(&with_kernel).unwrap();

    let result = RenderSession::new(&device, &queue, &config, TARGET_FORMAT);
    let _ = std::fs::remove_file(&path);
    assert!(matches!(result, Err(RenderError::InvalidKernel(_))));
}

fn write_raw(queue: &wgpu::Queue, output: &OutputTargets, pixels: &[f32]) {
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: output.raw_texture(),
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        bytemuck::cast_slice(pixels),
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(output.width * 16),
            rows_per_image: Some(output.height),
        },
        wgpu::Extent3d {
            width: output.width,
            height: output.height,
            depth_or_array_layers: 1,
        },
    );
}

// Varies by frame and texel
fn raw_frame(frame: u32, width: u32, height: u32) -> Vec<f32> {
    (0..width * height * 4)
        .map(|i| ((frame * 37 + i * 11) % 23) as f32 * 0.25)
        .collect()
}

fn composite(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    compositor: &Compositor,
    accumulation: &mut AccumulationController,
    output: &OutputTargets,
    view: &wgpu::TextureView,
    raw: &[f32],
) {
    let blend = accumulation.begin_frame();
    write_raw(queue, output, raw);
    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    compositor.encode(device, queue, &mut encoder, blend, output, view);
    queue.submit(std::iter::once(encoder.finish()));
    accumulation.complete_frame();
}

#[test]
fn test_blend_shader_computes_running_mean() {
    let Some((device, queue)) = gpu() else { return };
    let (width, height) = (16, 8);
    let compositor = Compositor::new(&device, TARGET_FORMAT);
    let output = WgpuAllocator::new(&device).allocate_output(width, height).unwrap();
    let view = target(&device, width, height);
    let mut accumulation = AccumulationController::new();
    accumulation.on_output_recreated(width, height);

    let frames: Vec<Vec<f32>> = (0..6).map(|frame| raw_frame(frame, width, height)).collect();
    for raw in &frames {
        composite(&device, &queue, &compositor, &mut accumulation, &output, &view, raw);
    }
    assert_eq!(accumulation.sample_count(), 6);

    let presented = read_presented(&device, &queue, &output);
    for (i, value) in presented.iter().enumerate() {
        let mean = frames.iter().map(|raw| raw[i]).sum::<f32>() / frames.len() as f32;
        assert!((value - mean).abs() < 1e-4, "texel {i}: {value} != mean {mean}");
    }

    // After a reset only the newest raw image is left
    accumulation.on_view_changed();
    let latest = raw_frame(100, width, height);
    composite(&device, &queue, &compositor, &mut accumulation, &output, &view, &latest);
    assert_eq!(accumulation.sample_count(), 1);
    assert_eq!(read_presented(&device, &queue, &output), latest);
}
