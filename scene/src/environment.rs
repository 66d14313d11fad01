use anyhow::{anyhow, bail, Context};
use image::{DynamicImage, ImageBuffer, Rgba};
use std::path::Path;

/// Color of the fallback sky used when no environment map is configured.
pub const FLAT_SKY_COLOR: [u8; 4] = [156, 186, 224, 255];

/// Loads an equirectangular environment map.
///
/// `.hdr` and `.exr` files are tone mapped into 8 bit, anything else is handed to `image`.
pub fn load_environment<P: AsRef<Path>>(path: P) -> anyhow::Result<DynamicImage> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension.to_ascii_lowercase())
        .ok_or_else(|| anyhow!("No file extension found on {}", path.display()))?;
    match extension.as_str() {
        "hdr" => load_hdri(path),
        "exr" => load_exr(path),
        "png" | "jpg" | "jpeg" => image::open(path).with_context(|| format!("failed to read {}", path.display())),
        _ => bail!("Unsupported file format for environment image. Supported formats are: .hdr, .exr, .png, .jpg"),
    }
}

/// Single-texel sky used when the config has no environment path.
pub fn flat_sky() -> DynamicImage {
    DynamicImage::ImageRgba8(ImageBuffer::from_pixel(1, 1, Rgba(FLAT_SKY_COLOR)))
}

fn load_hdri(path: &Path) -> anyhow::Result<DynamicImage> {
    let contents = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut data = zune_hdr::HdrDecoder::new(contents);
    let pix: Vec<f32> = data
        .decode()
        .map_err(|error| anyhow!("failed to decode {}: {:?}", path.display(), error))?;
    let (width, height) = data
        .get_dimensions()
        .ok_or_else(|| anyhow!("{} has no dimensions", path.display()))?;

    let image = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_fn(width as u32, height as u32, |x, y| {
        let index = (y as usize * width + x as usize) * 3;
        Rgba([
            tone_map(pix[index]),
            tone_map(pix[index + 1]),
            tone_map(pix[index + 2]),
            255,
        ])
    });
    Ok(DynamicImage::ImageRgba8(image))
}

fn load_exr(path: &Path) -> anyhow::Result<DynamicImage> {
    use exr::prelude as exrs;
    use exr::prelude::*;

    // read from the exr file directly into an `RgbaImage` without intermediate buffers
    let reader = exrs::read()
        .no_deep_data()
        .largest_resolution_level()
        .rgba_channels(
            |resolution, _channels: &RgbaChannels| -> image::RgbaImage {
                image::ImageBuffer::new(resolution.width() as u32, resolution.height() as u32)
            },
            |pixels, position, (r, g, b, a): (f32, f32, f32, f32)| {
                pixels.put_pixel(
                    position.x() as u32,
                    position.y() as u32,
                    image::Rgba([tone_map(r), tone_map(g), tone_map(b), (a.clamp(0.0, 1.0) * 255.0) as u8]),
                );
            },
        )
        .first_valid_layer()
        .all_attributes();

    let image: Image<Layer<SpecificChannels<image::RgbaImage, RgbaChannels>>> = reader
        .from_file(path)
        .map_err(|error| anyhow!("failed to read exr file {}: {}", path.display(), error))?;

    Ok(DynamicImage::ImageRgba8(image.layer_data.channel_data.pixels))
}

/// Compresses any linear value into a byte, keeping mid tones roughly linear.
fn tone_map(linear: f32) -> u8 {
    let mapped = (linear - 0.5).tanh() * 0.5 + 0.5;
    (mapped.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    #[test]
    fn test_unsupported_extension() {
        let error = load_environment("sky.tga").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Unsupported file format for environment image. Supported formats are: .hdr, .exr, .png, .jpg"
        );
    }

    #[test]
    fn test_missing_extension() {
        assert!(load_environment("sky").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(load_environment("does/not/exist.hdr").is_err());
        assert!(load_environment("does/not/exist.png").is_err());
    }

    #[test]
    fn test_load_png() {
        let path = std::env::temp_dir().join(format!("environment_test_{}.png", std::process::id()));
        let source = ImageBuffer::from_pixel(4, 2, Rgba([10u8, 20, 30, 255]));
        source.save(&path).expect("Could not write test image");

        let loaded = load_environment(&path).expect("Could not load test image");
        assert_eq!(loaded.dimensions(), (4, 2));
        assert_eq!(loaded.to_rgba8().get_pixel(3, 1), &Rgba([10, 20, 30, 255]));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_flat_sky() {
        let sky = flat_sky();
        assert_eq!(sky.dimensions(), (1, 1));
        assert_eq!(sky.to_rgba8().get_pixel(0, 0), &Rgba(FLAT_SKY_COLOR));
    }

    #[test]
    fn test_tone_map_is_monotonic_and_bounded() {
        assert_eq!(tone_map(-100.0), 0);
        assert_eq!(tone_map(1000.0), 255);
        assert!(tone_map(0.2) < tone_map(0.5));
        assert!(tone_map(0.5) < tone_map(0.9));
    }
}
