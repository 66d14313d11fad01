use bytemuck::Pod;
use wgpu::util::DeviceExt;

/// A struct representing the initial descriptor for a buffer.
///
/// This struct is used to create a new buffer with specified label and usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferInitDescriptor<'a> {
    /// Debug label of a buffer. This will show up in graphics debuggers for easy identification.
    pub label: wgpu::Label<'a>,
    /// Usages of a buffer. If the buffer is used in any way that isn't specified here, the operation
    /// will panic.
    pub usage: wgpu::BufferUsages,
}

impl<'a> BufferInitDescriptor<'a> {
    pub fn new(label: wgpu::Label<'a>, usage: wgpu::BufferUsages) -> Self {
        Self { label, usage }
    }

    /// Creates a buffer filled with `data`.
    pub fn create_new_buffer<T: Pod>(&self, device: &wgpu::Device, data: &[T]) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: self.label,
            contents: bytemuck::cast_slice(data),
            usage: self.usage,
        })
    }

    /// Creates a zero-initialized buffer of `size` bytes.
    pub fn create_empty_buffer(&self, device: &wgpu::Device, size: wgpu::BufferAddress) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: self.label,
            size,
            usage: self.usage,
            mapped_at_creation: false,
        })
    }
}

impl<'a> Default for BufferInitDescriptor<'a> {
    fn default() -> Self {
        Self {
            label: Some("Default BufferInitDescriptor"),
            usage: wgpu::BufferUsages::COPY_DST,
        }
    }
}

/// The kind of resource bound at one slot of a bind group.
/// This shortens the amount of code needed to create a bind group layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    StorageBuffer { read_only: bool },
    UniformBuffer,
    /// Write-only storage texture.
    StorageTexture {
        format: wgpu::TextureFormat,
        view_dimension: wgpu::TextureViewDimension,
    },
    Texture {
        filterable: bool,
        view_dimension: wgpu::TextureViewDimension,
    },
    Sampler { filtering: bool },
}

impl BindingKind {
    pub fn binding_type(&self) -> wgpu::BindingType {
        match *self {
            BindingKind::StorageBuffer { read_only } => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::UniformBuffer => wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            BindingKind::StorageTexture { format, view_dimension } => wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format,
                view_dimension,
            },
            BindingKind::Texture { filterable, view_dimension } => wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable },
                view_dimension,
                multisampled: false,
            },
            BindingKind::Sampler { filtering: true } => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            BindingKind::Sampler { filtering: false } => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
        }
    }
}

/// Describes a bind group layout as an ordered list of bindings.
///
/// Binding indices are assigned in order, starting at 0, so the list has to match the
/// `@binding` order declared in the shader.
#[derive(Clone, Debug)]
pub struct BindGroupLayoutTemplate<'a> {
    pub label: wgpu::Label<'a>,
    pub vis: wgpu::ShaderStages,
    pub bindings: Vec<BindingKind>,
}

impl<'a> BindGroupLayoutTemplate<'a> {
    pub fn new(label: wgpu::Label<'a>, vis: wgpu::ShaderStages, bindings: Vec<BindingKind>) -> Self {
        Self { label, vis, bindings }
    }

    fn layout_label(&self) -> Option<String> {
        self.label.map(|label| format!("{}_bind_group_layout", label))
    }

    pub fn entries(&self) -> Vec<wgpu::BindGroupLayoutEntry> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(index, binding)| wgpu::BindGroupLayoutEntry {
                binding: index as u32,
                visibility: self.vis,
                ty: binding.binding_type(),
                count: None,
            })
            .collect()
    }

    pub fn create_layout(&self, device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let label = self.layout_label();
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: label.as_deref(),
            entries: &self.entries(),
        })
    }
}

/// Creates a bind group whose entries are numbered in the order of `resources`.
pub fn create_bind_group(
    device: &wgpu::Device,
    label: wgpu::Label,
    layout: &wgpu::BindGroupLayout,
    resources: Vec<wgpu::BindingResource>,
) -> wgpu::BindGroup {
    let entries = resources
        .into_iter()
        .enumerate()
        .map(|(index, resource)| wgpu::BindGroupEntry {
            binding: index as u32,
            resource,
        })
        .collect::<Vec<_>>();

    let mod_label = label.map(|label| format!("{}_bind_group", label));
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: mod_label.as_deref(),
        layout,
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_numbered_in_order() {
        let template = BindGroupLayoutTemplate::new(
            Some("Scene"),
            wgpu::ShaderStages::COMPUTE,
            vec![
                BindingKind::Sampler { filtering: true },
                BindingKind::Texture {
                    filterable: true,
                    view_dimension: wgpu::TextureViewDimension::D2,
                },
            ],
        );
        let entries = template.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].binding, 0);
        assert_eq!(entries[1].binding, 1);
        assert_eq!(entries[0].ty, wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering));
        assert!(entries.iter().all(|entry| entry.visibility == wgpu::ShaderStages::COMPUTE));
    }

    #[test]
    fn test_storage_texture_is_write_only() {
        let kind = BindingKind::StorageTexture {
            format: wgpu::TextureFormat::Rgba32Float,
            view_dimension: wgpu::TextureViewDimension::D2,
        };
        assert_eq!(
            kind.binding_type(),
            wgpu::BindingType::StorageTexture {
                access: wgpu::StorageTextureAccess::WriteOnly,
                format: wgpu::TextureFormat::Rgba32Float,
                view_dimension: wgpu::TextureViewDimension::D2,
            }
        );
    }

    #[test]
    fn test_storage_buffer_access() {
        let read_only = BindingKind::StorageBuffer { read_only: true }.binding_type();
        let read_write = BindingKind::StorageBuffer { read_only: false }.binding_type();
        assert_ne!(read_only, read_write);
        assert_eq!(
            BindingKind::UniformBuffer.binding_type(),
            wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            }
        );
    }

    #[test]
    fn test_layout_label() {
        let template = BindGroupLayoutTemplate::new(Some("Geometry"), wgpu::ShaderStages::COMPUTE, vec![]);
        assert_eq!(template.layout_label().as_deref(), Some("Geometry_bind_group_layout"));
        let unnamed = BindGroupLayoutTemplate::new(None, wgpu::ShaderStages::COMPUTE, vec![]);
        assert_eq!(unnamed.layout_label(), None);
    }
}
