mod buffer;
mod gpu;

pub use buffer::{create_bind_group, BindGroupLayoutTemplate, BindingKind, BufferInitDescriptor};
pub use gpu::{create_instance, request_device, setup_gpu};
