use std::fs;
use thiserror::Error;
use toml;

use crate::generator::{SceneError, SceneSettings};
use crate::structs::DirectionalLight;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Start pose and lens of the fly camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Yaw and pitch in degrees.
    pub rotation: [f32; 2],
    pub near_far: [f32; 2],
    pub fov: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub camera: CameraConfig,
    pub scene: SceneSettings,
    /// `None` when the config has no `[light]` section. Rendering refuses to start without one.
    pub light: Option<DirectionalLight>,
    pub environment_path: Option<String>,
    /// `None` selects the built-in kernel.
    pub kernel_path: Option<String>,
}

impl Config {
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let toml_str = fs::read_to_string(config_path).map_err(|source| ConfigError::Io {
            path: config_path.to_string(),
            source,
        })?;
        Self::from_str(&toml_str)
    }

    pub fn from_str(toml_str: &str) -> Result<Self, ConfigError> {
        let toml: toml::Value = toml::from_str(toml_str)?;

        let camera = load_camera_config(toml.get("camera"))?;
        let scene = load_spheres_config(toml.get("spheres"))?;
        // Degenerate scenes never reach the render loop
        scene.validate()?;
        let light = load_light_config(toml.get("light"))?;
        let environment_path = load_path(toml.get("environment"), "environment path")?;
        let kernel_path = load_path(toml.get("kernel"), "kernel path")?;

        Ok(Self {
            camera,
            scene,
            light,
            environment_path,
            kernel_path,
        })
    }
}

fn parse_array<const N: usize>(value: &toml::Value, field: &'static str) -> Result<[f32; N], ConfigError> {
    let array = value.as_array().ok_or(ConfigError::Invalid {
        field,
        reason: "expected array".to_string(),
    })?;
    let floats = array
        .iter()
        .map(|v| as_f32(v, field))
        .collect::<Result<Vec<f32>, _>>()?;
    floats.try_into().map_err(|floats: Vec<f32>| ConfigError::Invalid {
        field,
        reason: format!("expected {} elements, got {}", N, floats.len()),
    })
}

// Integers are accepted wherever a float is expected
fn as_f32(value: &toml::Value, field: &'static str) -> Result<f32, ConfigError> {
    match value {
        toml::Value::Float(f) => Ok(*f as f32),
        toml::Value::Integer(i) => Ok(*i as f32),
        _ => Err(ConfigError::Invalid {
            field,
            reason: "expected number".to_string(),
        }),
    }
}

fn load_camera_config(value: Option<&toml::Value>) -> Result<CameraConfig, ConfigError> {
    let toml_camera = value.ok_or(ConfigError::Missing("camera section"))?;
    let position = parse_array::<3>(
        toml_camera.get("position").ok_or(ConfigError::Missing("camera position"))?,
        "camera position",
    )?;
    let rotation = parse_array::<2>(
        toml_camera.get("rotation").ok_or(ConfigError::Missing("camera rotation"))?,
        "camera rotation",
    )?;
    // Near and far only matter in edge cases, so they fall back to defaults
    let near_far = match toml_camera.get("near_far") {
        Some(value) => parse_array::<2>(value, "camera near_far")?,
        None => {
            log::debug!("No near_far defined in config, using default values");
            [0.1, 1000.0]
        }
    };
    let [near, far] = near_far;
    if !(near.is_finite() && far.is_finite()) || near <= 0.0 || far <= near {
        return Err(ConfigError::Invalid {
            field: "camera near_far",
            reason: format!("[{}, {}] needs 0 < near < far", near, far),
        });
    }
    let fov = as_f32(
        toml_camera.get("fov").ok_or(ConfigError::Missing("camera fov"))?,
        "camera fov",
    )?;
    if !(fov > 0.0 && fov < 180.0) {
        return Err(ConfigError::Invalid {
            field: "camera fov",
            reason: format!("{} is outside (0, 180)", fov),
        });
    }

    Ok(CameraConfig {
        position,
        rotation,
        near_far,
        fov,
    })
}

// makes the sphere section optional, every missing key falls back to its default
fn load_spheres_config(value: Option<&toml::Value>) -> Result<SceneSettings, ConfigError> {
    let mut settings = SceneSettings::default();
    let value = match value {
        Some(value) => value,
        None => {
            log::debug!("No spheres section in config, using defaults");
            return Ok(settings);
        }
    };

    if let Some(max_count) = value.get("max_count") {
        let max_count = max_count.as_integer().ok_or(ConfigError::Invalid {
            field: "spheres max_count",
            reason: "expected integer".to_string(),
        })?;
        settings.max_count = u32::try_from(max_count).map_err(|_| ConfigError::Invalid {
            field: "spheres max_count",
            reason: format!("{} is out of range", max_count),
        })?;
    }
    if let Some(radius) = value.get("radius") {
        settings.radius_range = parse_array::<2>(radius, "spheres radius")?;
    }
    if let Some(placement_radius) = value.get("placement_radius") {
        settings.placement_radius = as_f32(placement_radius, "spheres placement_radius")?;
    }
    if let Some(seed) = value.get("seed") {
        let seed = seed.as_integer().ok_or(ConfigError::Invalid {
            field: "spheres seed",
            reason: "expected integer".to_string(),
        })?;
        settings.seed = Some(seed as u64);
    }
    Ok(settings)
}

fn load_light_config(value: Option<&toml::Value>) -> Result<Option<DirectionalLight>, ConfigError> {
    let value = match value {
        Some(value) => value,
        None => {
            log::warn!("No light defined in config");
            return Ok(None);
        }
    };
    let direction = parse_array::<3>(
        value.get("direction").ok_or(ConfigError::Missing("light direction"))?,
        "light direction",
    )?;
    let intensity = match value.get("intensity") {
        Some(intensity) => as_f32(intensity, "light intensity")?,
        None => 1.0,
    };
    Ok(Some(DirectionalLight::new(direction, intensity)))
}

// Reads the optional `path` key of a section; an empty string counts as unset
fn load_path(value: Option<&toml::Value>, field: &'static str) -> Result<Option<String>, ConfigError> {
    let path = match value.and_then(|section| section.get("path")) {
        Some(path) => path.as_str().ok_or(ConfigError::Invalid {
            field,
            reason: "expected string".to_string(),
        })?,
        None => return Ok(None),
    };
    if path.is_empty() {
        Ok(None)
    } else {
        Ok(Some(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERA: &str = "[camera]\nposition = [0.0, 1.0, 2.0]\nrotation = [0.0, 0.0]\nnear_far = [0.1, 100.0]\nfov = 45.0\n";

    #[test]
    fn test_camera_missing() {
        let config = Config::from_str("[light]\ndirection = [0.0, -1.0, 0.0]\nintensity = 1.0");
        assert!(matches!(config, Err(ConfigError::Missing("camera section"))));
    }

    #[test]
    fn test_camera_missing_position() {
        let config = Config::from_str("[camera]\nrotation = [0.0, 0.0]\nnear_far = [0.1, 100.0]\nfov = 45.0");
        assert!(config.is_err());
    }

    #[test]
    fn test_camera_missing_rotation() {
        let config = Config::from_str("[camera]\nposition = [0.0, 1.0, 2.0]\nnear_far = [0.1, 100.0]\nfov = 45.0");
        assert!(config.is_err());
    }

    #[test]
    fn test_camera_short_position() {
        let config = Config::from_str("[camera]\nposition = [0.0, 1.0]\nrotation = [0.0, 0.0]\nfov = 45.0");
        assert!(matches!(config, Err(ConfigError::Invalid { field: "camera position", .. })));
    }

    #[test]
    fn test_camera_missing_near_far() {
        let config = Config::from_str("[camera]\nposition = [0.0, 1.0, 2.0]\nrotation = [0.0, 0.0]\nfov = 45.0");
        let config = config.expect("Could not unwrap config");
        assert_eq!(config.camera.near_far, [0.1, 1000.0]);
    }

    #[test]
    fn test_camera_degenerate_near_far_rejected() {
        for near_far in ["[0.0, 100.0]", "[-1.0, 100.0]", "[100.0, 0.1]", "[5.0, 5.0]", "[0.1, inf]", "[nan, 100.0]"] {
            let config = Config::from_str(&format!(
                "[camera]\nposition = [0.0, 1.0, 2.0]\nrotation = [0.0, 0.0]\nnear_far = {near_far}\nfov = 45.0"
            ));
            assert!(
                matches!(config, Err(ConfigError::Invalid { field: "camera near_far", .. })),
                "near_far = {near_far} was accepted"
            );
        }
    }

    #[test]
    fn test_camera_missing_fov() {
        let config = Config::from_str("[camera]\nposition = [0.0, 1.0, 2.0]\nrotation = [0.0, 0.0]\nnear_far = [0.1, 100.0]");
        assert!(config.is_err());
    }

    #[test]
    fn test_camera_integer_values() {
        let config = Config::from_str("[camera]\nposition = [0, 35, 140]\nrotation = [0, -15]\nfov = 60");
        let config = config.expect("Could not unwrap config");
        assert_eq!(config.camera.position, [0.0, 35.0, 140.0]);
        assert_eq!(config.camera.fov, 60.0);
    }

    #[test]
    fn test_spheres_missing_uses_defaults() {
        let config = Config::from_str(CAMERA).expect("Could not unwrap config");
        assert_eq!(config.scene, SceneSettings::default());
    }

    #[test]
    fn test_spheres_correct() {
        let config = Config::from_str(&format!(
            "{CAMERA}[spheres]\nmax_count = 20\nradius = [1.0, 2.5]\nplacement_radius = 30.0\nseed = 9"
        ))
        .expect("Could not unwrap config");
        assert_eq!(config.scene.max_count, 20);
        assert_eq!(config.scene.radius_range, [1.0, 2.5]);
        assert_eq!(config.scene.placement_radius, 30.0);
        assert_eq!(config.scene.seed, Some(9));
    }

    #[test]
    fn test_spheres_zero_count_rejected() {
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nmax_count = 0"));
        assert!(matches!(config, Err(ConfigError::Scene(SceneError::ZeroSphereCount))));
    }

    #[test]
    fn test_spheres_negative_count_rejected() {
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nmax_count = -3"));
        assert!(matches!(config, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_spheres_huge_count_rejected() {
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nmax_count = 4294967295"));
        assert!(matches!(config, Err(ConfigError::Scene(SceneError::TooManySpheres { .. }))));
    }

    #[test]
    fn test_spheres_degenerate_radius_rejected() {
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nradius = [-1.0, 2.0]"));
        assert!(matches!(config, Err(ConfigError::Scene(SceneError::InvalidRadiusRange { .. }))));
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nradius = [4.0, 2.0]"));
        assert!(matches!(config, Err(ConfigError::Scene(SceneError::InvalidRadiusRange { .. }))));
    }

    #[test]
    fn test_spheres_degenerate_placement_rejected() {
        let config = Config::from_str(&format!("{CAMERA}[spheres]\nplacement_radius = 0.0"));
        assert!(matches!(config, Err(ConfigError::Scene(SceneError::InvalidPlacementRadius(_)))));
    }

    #[test]
    fn test_light_missing() {
        let config = Config::from_str(CAMERA).expect("Could not unwrap config");
        assert!(config.light.is_none());
    }

    #[test]
    fn test_light_correct() {
        let config = Config::from_str(&format!("{CAMERA}[light]\ndirection = [0.3, -1.0, 0.5]\nintensity = 0.8"))
            .expect("Could not unwrap config");
        assert_eq!(config.light, Some(DirectionalLight::new([0.3, -1.0, 0.5], 0.8)));
    }

    #[test]
    fn test_light_missing_direction() {
        let config = Config::from_str(&format!("{CAMERA}[light]\nintensity = 0.8"));
        assert!(matches!(config, Err(ConfigError::Missing("light direction"))));
    }

    #[test]
    fn test_light_default_intensity() {
        let config = Config::from_str(&format!("{CAMERA}[light]\ndirection = [0.0, -1.0, 0.0]"))
            .expect("Could not unwrap config");
        assert_eq!(config.light.map(|light| light.intensity), Some(1.0));
    }

    #[test]
    fn test_paths() {
        let config = Config::from_str(&format!(
            "{CAMERA}[environment]\npath = \"res/sky.hdr\"\n[kernel]\npath = \"res/shader/raytrace.wgsl\""
        ))
        .expect("Could not unwrap config");
        assert_eq!(config.environment_path.as_deref(), Some("res/sky.hdr"));
        assert_eq!(config.kernel_path.as_deref(), Some("res/shader/raytrace.wgsl"));
    }

    #[test]
    fn test_paths_empty_or_missing() {
        let config = Config::from_str(&format!("{CAMERA}[environment]\npath = \"\"\n[kernel]"))
            .expect("Could not unwrap config");
        assert!(config.environment_path.is_none());
        assert!(config.kernel_path.is_none());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(Config::from_str("[camera"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(Config::new("does/not/exist.toml"), Err(ConfigError::Io { .. })));
    }
}
