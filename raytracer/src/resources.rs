use bytemuck::Zeroable;
use scene::{Scene, SphereUniform};
use wgpu_utils::BufferInitDescriptor;

use crate::error::{RenderError, Result};

/// Format of the raw sample image written by the kernel.
pub const RAW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
/// Bytes per pixel of the presented image (`vec4<f32>`).
pub const PRESENTED_TEXEL_SIZE: u64 = 16;

/// Creates the GPU objects owned by the [`ResourceManager`].
///
/// Handles release their GPU memory when dropped.
pub trait GpuAllocator {
    type OutputImage;
    type GeometryBuffer;

    fn allocate_output(&self, width: u32, height: u32) -> Result<Self::OutputImage>;
    fn allocate_geometry(&self, records: &[SphereUniform]) -> Result<Self::GeometryBuffer>;
}

/// Owns the viewport sized output images and the sphere buffer.
///
/// No other component keeps a handle past the current frame, bind groups are rebuilt every frame
/// from the borrowed handles.
pub struct ResourceManager<O, G> {
    output: Option<O>,
    extent: (u32, u32),
    geometry: Option<G>,
    sphere_count: u32,
}

impl<O, G> Default for ResourceManager<O, G> {
    fn default() -> Self {
        Self {
            output: None,
            extent: (0, 0),
            geometry: None,
            sphere_count: 0,
        }
    }
}

impl<O, G> ResourceManager<O, G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure an output image of the given size exists. Returns whether it was (re)created.
    pub fn ensure_output_buffer<A>(&mut self, allocator: &A, width: u32, height: u32) -> Result<bool>
    where
        A: GpuAllocator<OutputImage = O, GeometryBuffer = G>,
    {
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyExtent { width, height });
        }
        if self.output.is_some() && self.extent == (width, height) {
            return Ok(false);
        }

        // The old image is gone before the new one is requested, a failed allocation leaves none.
        self.output.take();
        self.extent = (0, 0);

        let output = allocator.allocate_output(width, height)?;
        log::debug!("Allocated output image {}x{}", width, height);
        self.output = Some(output);
        self.extent = (width, height);
        Ok(true)
    }

    /// Replaces the geometry buffer with the spheres of `scene`, in generation order.
    pub fn upload_scene<A>(&mut self, allocator: &A, scene: &Scene) -> Result<()>
    where
        A: GpuAllocator<OutputImage = O, GeometryBuffer = G>,
    {
        self.geometry.take();
        self.sphere_count = 0;

        let mut records = scene.to_uniforms();
        if records.is_empty() {
            // Storage bindings can't be empty
            records.push(SphereUniform::zeroed());
        }

        let geometry = allocator.allocate_geometry(&records)?;
        log::debug!(
            "Uploaded {} spheres ({} bytes)",
            scene.len(),
            records.len() as u64 * SphereUniform::STRIDE
        );
        self.geometry = Some(geometry);
        self.sphere_count = scene.len() as u32;
        Ok(())
    }

    /// Releases every buffer. Calling it again is a no-op.
    pub fn release(&mut self) {
        let had_output = self.output.take().is_some();
        let had_geometry = self.geometry.take().is_some();
        if had_output || had_geometry {
            log::debug!("Released GPU resources");
        }
        self.extent = (0, 0);
        self.sphere_count = 0;
    }

    pub fn output(&self) -> Option<&O> {
        self.output.as_ref()
    }

    pub fn geometry(&self) -> Option<&G> {
        self.geometry.as_ref()
    }

    pub fn output_extent(&self) -> Option<(u32, u32)> {
        self.output.as_ref().map(|_| self.extent)
    }

    /// Number of spheres in the geometry buffer, padding excluded.
    pub fn sphere_count(&self) -> u32 {
        self.sphere_count
    }
}

/// Raw sample image and running average, both sized by the viewport.
pub struct OutputTargets {
    raw_texture: wgpu::Texture,
    pub raw_view: wgpu::TextureView,
    pub presented: wgpu::Buffer,
    pub width: u32,
    pub height: u32,
}

impl OutputTargets {
    /// The texture the kernel writes each frame's raw sample into.
    pub fn raw_texture(&self) -> &wgpu::Texture {
        &self.raw_texture
    }
}

impl Drop for OutputTargets {
    fn drop(&mut self) {
        self.raw_texture.destroy();
        self.presented.destroy();
    }
}

pub struct GeometryBuffer {
    pub buffer: wgpu::Buffer,
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        self.buffer.destroy();
    }
}

pub type WgpuResources = ResourceManager<OutputTargets, GeometryBuffer>;

/// Allocates the real GPU objects.
pub struct WgpuAllocator<'a> {
    device: &'a wgpu::Device,
}

impl<'a> WgpuAllocator<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self { device }
    }

    /// Resolves the out-of-memory scope pushed before an allocation.
    fn finish_allocation(&self) -> Result<()> {
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(error) => Err(RenderError::AllocationFailed(error.to_string())),
            None => Ok(()),
        }
    }
}

fn check_limit(what: &'static str, requested: u64, limit: u64) -> Result<()> {
    if requested > limit {
        return Err(RenderError::ResourceExhausted { what, requested, limit });
    }
    Ok(())
}

impl GpuAllocator for WgpuAllocator<'_> {
    type OutputImage = OutputTargets;
    type GeometryBuffer = GeometryBuffer;

    fn allocate_output(&self, width: u32, height: u32) -> Result<OutputTargets> {
        let limits = self.device.limits();
        let presented_size = width as u64 * height as u64 * PRESENTED_TEXEL_SIZE;
        check_limit("output image width", width as u64, limits.max_texture_dimension_2d as u64)?;
        check_limit("output image height", height as u64, limits.max_texture_dimension_2d as u64)?;
        check_limit(
            "presented image bytes",
            presented_size,
            (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size),
        )?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let raw_texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Raw Sample Texture"),
            view_formats: &[],
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RAW_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
        });
        let presented = BufferInitDescriptor::new(Some("Presented Image Buffer"), wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC)
            .create_empty_buffer(self.device, presented_size);
        self.finish_allocation()?;

        let raw_view = raw_texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(OutputTargets {
            raw_texture,
            raw_view,
            presented,
            width,
            height,
        })
    }

    fn allocate_geometry(&self, records: &[SphereUniform]) -> Result<GeometryBuffer> {
        let limits = self.device.limits();
        let size = records.len() as u64 * SphereUniform::STRIDE;
        check_limit(
            "geometry buffer bytes",
            size,
            (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size),
        )?;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = BufferInitDescriptor::new(Some("Sphere Buffer"), wgpu::BufferUsages::STORAGE)
            .create_new_buffer(self.device, records);
        self.finish_allocation()?;

        Ok(GeometryBuffer { buffer })
    }
}
