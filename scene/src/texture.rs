use image::{DynamicImage, GenericImageView};
use wgpu::{Device, Queue, Texture, TextureDimension, TextureFormat};

/// Format of the environment texture sampled by the kernel.
pub const ENVIRONMENT_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

pub fn create_texture(device: &Device, texture_width: u32, texture_height: u32) -> Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Environment Texture"),
        view_formats: &[],
        size: wgpu::Extent3d {
            width: texture_width,
            height: texture_height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: ENVIRONMENT_FORMAT,
        usage: wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::TEXTURE_BINDING,
    })
}

fn write_texture(queue: &Queue, texture: &Texture, image: &DynamicImage) {
    let (width, height) = image.dimensions();
    let bytes_per_pixel = 4; // Rgba8Unorm
    let bytes_per_row = width * bytes_per_pixel;
    let data = image.to_rgba8().into_raw();

    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(bytes_per_row),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Uploads `image` into a new texture, shrinking it first if it exceeds `max_dimension`.
pub fn load_texture_from_image(device: &Device, queue: &Queue, image: &DynamicImage, max_dimension: u32) -> Texture {
    let (width, height) = image.dimensions();
    let image = if width > max_dimension || height > max_dimension {
        log::warn!(
            "Environment image {}x{} exceeds the device limit of {}, scaling it down",
            width,
            height,
            max_dimension
        );
        scale_texture(image, max_dimension, max_dimension)
    } else {
        image.clone()
    };
    let (width, height) = image.dimensions();
    let texture = create_texture(device, width, height);
    write_texture(queue, &texture, &image);
    texture
}

/// Resizes the image to fit in the given bounds, preserving the aspect ratio.
pub fn scale_texture(texture: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    texture.resize(width, height, image::imageops::FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    #[test]
    fn test_scale_texture_fits_bounds() {
        let image = DynamicImage::ImageRgba8(ImageBuffer::from_pixel(4096, 2048, Rgba([0u8, 0, 0, 255])));
        let scaled = scale_texture(&image, 1024, 1024);
        assert_eq!(scaled.dimensions(), (1024, 512));
    }
}
