//! # Scene
//!
//! This crate contains everything that describes what is rendered: the procedurally generated spheres,
//! the camera, the configuration file and the environment map.
//!
//! ## Modules
//!
//! - `camera`: Contains the `Camera` struct and related functions for controlling the camera.
//! - `config`: Loads the configuration file and validates the scene outline.
//! - `generator`: Places non-overlapping spheres with random materials on the ground plane.
//! - `environment`: Loads the HDR/EXR environment map.
//! - `structs`: Contains the scene value types like `Sphere` and their GPU records.
//! - `texture`: Uploads the environment map to the gpu.
//!
//! ## Usage
//!
//! ```no_run
//! use rand::SeedableRng;
//! use scene::{generate, Config};
//!
//! let config = Config::new("res/config.toml").unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let scene = generate(&config.scene, &mut rng).unwrap();
//! println!("{} spheres", scene.len());
//! ```
mod camera;
mod config;
mod environment;
mod generator;
mod structs;
mod texture;

pub use camera::{Camera, CameraController, Projection};
pub use config::{CameraConfig, Config, ConfigError};
pub use environment::{flat_sky, load_environment, FLAT_SKY_COLOR};
pub use generator::{generate, Scene, SceneError, SceneSettings, MAX_SPHERE_COUNT};
pub use structs::{DirectionalLight, Sphere, SphereMaterial, SphereUniform, DIELECTRIC_SPECULAR};
pub use texture::{create_texture, load_texture_from_image, scale_texture, ENVIRONMENT_FORMAT};
