use scene::{flat_sky, load_environment, load_texture_from_image, Camera, CameraController, Config, Projection};
use wgpu::SurfaceConfiguration;

use crate::error::{RenderError, Result};

/// Sets up the camera for the rendering scene.
///
/// The camera starts at the configured pose, the projection matches the surface size and the
/// controller moves with a speed of 4.0 and a sensitivity of 1.6.
///
/// # Example
///
/// ```ignore
/// let userconfig = Config::new("res/config.toml")?;
/// let (camera, projection, camera_controller) = setup_camera(&surface_config, &userconfig);
/// ```
pub fn setup_camera(config: &SurfaceConfiguration, userconfig: &Config) -> (Camera, Projection, CameraController) {
    let camera = Camera::from_config(&userconfig.camera);
    let projection = Projection::from_config(config.width, config.height, &userconfig.camera);
    let camera_controller = CameraController::new(4.0, 1.6);

    (camera, projection, camera_controller)
}

/// Loads the configured environment map into a texture, or a flat sky when none is configured.
///
/// Images larger than the device allows are scaled down.
pub fn setup_environment(userconfig: &Config, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<wgpu::Texture> {
    let image = match &userconfig.environment_path {
        Some(path) => {
            log::info!("Loading environment map {}", path);
            load_environment(path).map_err(RenderError::Environment)?
        }
        None => {
            log::info!("No environment map configured, using a flat sky");
            flat_sky()
        }
    };
    Ok(load_texture_from_image(device, queue, &image, device.limits().max_texture_dimension_2d))
}
