use bytemuck::Zeroable;
use cgmath::{Matrix4, SquareMatrix};
use rand::Rng;
use wgpu_utils::{create_bind_group, BindGroupLayoutTemplate, BindingKind, BufferInitDescriptor};

use crate::error::{RenderError, Result};
use crate::resources::{GeometryBuffer, OutputTargets, RAW_FORMAT};

/// Local size of the kernel, must match `@workgroup_size` in the shader.
pub const WORKGROUP_SIZE: u32 = 8;

/// Uniform written once per frame, group 0 binding 0 of the kernel.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParameters {
    camera_to_world: [[f32; 4]; 4],
    camera_inverse_projection: [[f32; 4]; 4],
    directional_light: [f32; 4],
    pixel_jitter: [f32; 2],
    sphere_count: u32,
    _padding: u32,
}

impl KernelParameters {
    pub fn new(
        camera_to_world: Matrix4<f32>,
        projection: Matrix4<f32>,
        directional_light: [f32; 4],
        pixel_jitter: [f32; 2],
        sphere_count: u32,
    ) -> Result<Self> {
        let inverse_projection = projection.invert().ok_or(RenderError::DegenerateProjection)?;
        Ok(Self {
            camera_to_world: camera_to_world.into(),
            camera_inverse_projection: inverse_projection.into(),
            directional_light,
            pixel_jitter,
            sphere_count,
            _padding: 0,
        })
    }

    pub fn sphere_count(&self) -> u32 {
        self.sphere_count
    }

    pub fn pixel_jitter(&self) -> [f32; 2] {
        self.pixel_jitter
    }
}

/// Number of 8x8 work groups covering an image.
pub fn workgroup_count(width: u32, height: u32) -> (u32, u32) {
    (
        (width + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
        (height + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE,
    )
}

/// Sub-pixel offset in [0, 1)² for anti-aliasing.
pub fn draw_jitter<R: Rng + ?Sized>(rng: &mut R) -> [f32; 2] {
    [rng.gen::<f32>(), rng.gen::<f32>()]
}

/// Encodes one ray tracing dispatch per frame into the raw sample image.
pub struct FrameDispatcher {
    pipeline: wgpu::ComputePipeline,
    parameters_buffer: wgpu::Buffer,
    parameters_bind_group: wgpu::BindGroup,
    output_layout: wgpu::BindGroupLayout,
    geometry_layout: wgpu::BindGroupLayout,
    environment_bind_group: wgpu::BindGroup,
}

impl FrameDispatcher {
    /// Builds the kernel pipeline. `kernel_source` is WGSL with a `main` entry point.
    pub fn new(device: &wgpu::Device, kernel_source: &str, environment: &wgpu::Texture) -> Result<Self> {
        let parameters_layout = BindGroupLayoutTemplate::new(
            Some("kernel_parameters"),
            wgpu::ShaderStages::COMPUTE,
            vec![BindingKind::UniformBuffer],
        )
        .create_layout(device);
        let output_layout = BindGroupLayoutTemplate::new(
            Some("raw_output"),
            wgpu::ShaderStages::COMPUTE,
            vec![BindingKind::StorageTexture {
                format: RAW_FORMAT,
                view_dimension: wgpu::TextureViewDimension::D2,
            }],
        )
        .create_layout(device);
        let geometry_layout = BindGroupLayoutTemplate::new(
            Some("geometry"),
            wgpu::ShaderStages::COMPUTE,
            vec![BindingKind::StorageBuffer { read_only: true }],
        )
        .create_layout(device);
        let environment_layout = BindGroupLayoutTemplate::new(
            Some("environment"),
            wgpu::ShaderStages::COMPUTE,
            vec![
                BindingKind::Sampler { filtering: true },
                BindingKind::Texture {
                    filterable: true,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
            ],
        )
        .create_layout(device);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let kernel = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Ray Tracing Kernel"),
            source: wgpu::ShaderSource::Wgsl(kernel_source.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Ray Tracing Pipeline Layout"),
            bind_group_layouts: &[&parameters_layout, &output_layout, &geometry_layout, &environment_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Ray Tracing Pipeline"),
            layout: Some(&pipeline_layout),
            module: &kernel,
            entry_point: "main",
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::InvalidKernel(error.to_string()));
        }

        let parameters_buffer = BufferInitDescriptor::new(
            Some("Kernel Parameters Buffer"),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )
        .create_new_buffer(device, &[KernelParameters::zeroed()]);
        let parameters_bind_group = create_bind_group(
            device,
            Some("kernel_parameters"),
            &parameters_layout,
            vec![parameters_buffer.as_entire_binding()],
        );

        // Equirectangular map, wraps horizontally
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let environment_view = environment.create_view(&wgpu::TextureViewDescriptor::default());
        let environment_bind_group = create_bind_group(
            device,
            Some("environment"),
            &environment_layout,
            vec![
                wgpu::BindingResource::Sampler(&sampler),
                wgpu::BindingResource::TextureView(&environment_view),
            ],
        );

        log::info!("Ray tracing pipeline ready");
        Ok(Self {
            pipeline,
            parameters_buffer,
            parameters_bind_group,
            output_layout,
            geometry_layout,
            environment_bind_group,
        })
    }

    /// Writes one raw sample per pixel into `output`. Does not read the accumulated image.
    pub fn dispatch(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        parameters: &KernelParameters,
        output: &OutputTargets,
        geometry: &GeometryBuffer,
    ) {
        queue.write_buffer(&self.parameters_buffer, 0, bytemuck::cast_slice(&[*parameters]));

        let output_bind_group = create_bind_group(
            device,
            Some("raw_output"),
            &self.output_layout,
            vec![wgpu::BindingResource::TextureView(&output.raw_view)],
        );
        let geometry_bind_group = create_bind_group(
            device,
            Some("geometry"),
            &self.geometry_layout,
            vec![geometry.buffer.as_entire_binding()],
        );

        let (groups_x, groups_y) = workgroup_count(output.width, output.height);
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Ray Tracing Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.parameters_bind_group, &[]);
        compute_pass.set_bind_group(1, &output_bind_group, &[]);
        compute_pass.set_bind_group(2, &geometry_bind_group, &[]);
        compute_pass.set_bind_group(3, &self.environment_bind_group, &[]);
        compute_pass.dispatch_workgroups(groups_x, groups_y, 1);
    }
}
