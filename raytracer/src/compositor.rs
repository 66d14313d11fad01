use bytemuck::Zeroable;
use wgpu_utils::{create_bind_group, BindGroupLayoutTemplate, BindingKind, BufferInitDescriptor};

use crate::accumulation::FrameBlend;
use crate::dispatch::workgroup_count;
use crate::resources::OutputTargets;

/// Shared by the blend and present shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CompositeUniform {
    weight: f32,
    sample_index: u32,
    width: u32,
    height: u32,
    encode_gamma: u32,
    _padding: [u32; 3],
}

impl CompositeUniform {
    pub fn new(blend: FrameBlend, width: u32, height: u32, encode_gamma: bool) -> Self {
        Self {
            weight: blend.weight,
            sample_index: blend.sample_index,
            width,
            height,
            encode_gamma: encode_gamma as u32,
            _padding: [0; 3],
        }
    }
}

/// Folds the raw sample into the presented image and draws it to the surface.
pub struct Compositor {
    blend_pipeline: wgpu::ComputePipeline,
    blend_layout: wgpu::BindGroupLayout,
    present_pipeline: wgpu::RenderPipeline,
    present_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    encode_gamma: bool,
}

impl Compositor {
    pub fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let uniform_buffer = BufferInitDescriptor::new(
            Some("Composite Uniform Buffer"),
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        )
        .create_new_buffer(device, &[CompositeUniform::zeroed()]);

        //----------Blend-------------
        let blend_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Accumulate Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../res/shader/accumulate.wgsl").into()),
        });
        let blend_layout = BindGroupLayoutTemplate::new(
            Some("accumulate"),
            wgpu::ShaderStages::COMPUTE,
            vec![
                BindingKind::UniformBuffer,
                BindingKind::Texture {
                    filterable: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
                BindingKind::StorageBuffer { read_only: false },
            ],
        )
        .create_layout(device);
        let blend_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Accumulate Pipeline Layout"),
            bind_group_layouts: &[&blend_layout],
            push_constant_ranges: &[],
        });
        let blend_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Accumulate Pipeline"),
            layout: Some(&blend_pipeline_layout),
            module: &blend_shader,
            entry_point: "main",
        });

        //----------Transfer to screen-------------
        let screen_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Screen Transfer Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../../res/shader/screen-shader.wgsl").into()),
        });
        let present_layout = BindGroupLayoutTemplate::new(
            Some("screen_transfer"),
            wgpu::ShaderStages::FRAGMENT,
            vec![BindingKind::UniformBuffer, BindingKind::StorageBuffer { read_only: true }],
        )
        .create_layout(device);
        let screen_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Screen Transfer Pipeline Layout"),
            bind_group_layouts: &[&present_layout],
            push_constant_ranges: &[],
        });
        let present_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Screen Transfer Pipeline"),
            layout: Some(&screen_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &screen_shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &screen_shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            multiview: None,
        });
        log::info!("Accumulation and screen transfer pipelines ready");

        Self {
            blend_pipeline,
            blend_layout,
            present_pipeline,
            present_layout,
            uniform_buffer,
            encode_gamma: !surface_format.is_srgb(),
        }
    }

    /// Encodes the blend pass and the draw into `destination`.
    pub fn encode(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        blend: FrameBlend,
        output: &OutputTargets,
        destination: &wgpu::TextureView,
    ) {
        let uniform = CompositeUniform::new(blend, output.width, output.height, self.encode_gamma);
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let blend_bind_group = create_bind_group(
            device,
            Some("accumulate"),
            &self.blend_layout,
            vec![
                self.uniform_buffer.as_entire_binding(),
                wgpu::BindingResource::TextureView(&output.raw_view),
                output.presented.as_entire_binding(),
            ],
        );
        let present_bind_group = create_bind_group(
            device,
            Some("screen_transfer"),
            &self.present_layout,
            vec![self.uniform_buffer.as_entire_binding(), output.presented.as_entire_binding()],
        );

        {
            let (groups_x, groups_y) = workgroup_count(output.width, output.height);
            let mut blend_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Accumulate Pass"),
                timestamp_writes: None,
            });
            blend_pass.set_pipeline(&self.blend_pipeline);
            blend_pass.set_bind_group(0, &blend_bind_group, &[]);
            blend_pass.dispatch_workgroups(groups_x, groups_y, 1);
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: destination,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        render_pass.set_pipeline(&self.present_pipeline);
        render_pass.set_bind_group(0, &present_bind_group, &[]);
        // Fullscreen triangle
        render_pass.draw(0..3, 0..1);
    }
}
