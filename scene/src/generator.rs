use std::f32::consts::PI;

use cgmath::{Point3, Vector3};
use rand::Rng;
use thiserror::Error;

use crate::structs::{Sphere, SphereUniform};

/// Largest `max_count` whose geometry records fit a storage buffer binding under the default
/// wgpu limit of 128 MiB.
pub const MAX_SPHERE_COUNT: u32 = ((128 << 20) / SphereUniform::STRIDE) as u32;

/// Settings for [`generate`], read from the `[spheres]` section of the config.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneSettings {
    pub max_count: u32,
    pub radius_range: [f32; 2],
    pub placement_radius: f32,
    pub seed: Option<u64>,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            max_count: 100,
            radius_range: [3.0, 8.0],
            placement_radius: 100.0,
            seed: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("maximum sphere count must be at least 1")]
    ZeroSphereCount,

    #[error("maximum sphere count {requested} exceeds the limit of {limit}")]
    TooManySpheres { requested: u32, limit: u32 },

    #[error("invalid sphere radius range [{min}, {max}]: radii must be positive and min <= max")]
    InvalidRadiusRange { min: f32, max: f32 },

    #[error("invalid placement radius {0}: must be positive")]
    InvalidPlacementRadius(f32),
}

impl SceneSettings {
    pub fn validate(&self) -> Result<(), SceneError> {
        if self.max_count == 0 {
            return Err(SceneError::ZeroSphereCount);
        }
        if self.max_count > MAX_SPHERE_COUNT {
            return Err(SceneError::TooManySpheres {
                requested: self.max_count,
                limit: MAX_SPHERE_COUNT,
            });
        }
        let [min, max] = self.radius_range;
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || max < min {
            return Err(SceneError::InvalidRadiusRange { min, max });
        }
        if !self.placement_radius.is_finite() || self.placement_radius <= 0.0 {
            return Err(SceneError::InvalidPlacementRadius(self.placement_radius));
        }
        Ok(())
    }
}

/// An ordered, non-overlapping set of spheres.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    spheres: Vec<Sphere>,
}

impl Scene {
    pub fn spheres(&self) -> &[Sphere] {
        &self.spheres
    }

    pub fn len(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spheres.is_empty()
    }

    /// GPU records in generation order.
    pub fn to_uniforms(&self) -> Vec<SphereUniform> {
        self.spheres.iter().map(SphereUniform::new).collect()
    }
}

impl FromIterator<Sphere> for Scene {
    fn from_iter<I: IntoIterator<Item = Sphere>>(iter: I) -> Self {
        Self {
            spheres: iter.into_iter().collect(),
        }
    }
}

/// Places up to `settings.max_count` spheres on the ground plane inside the placement disc.
///
/// Each candidate gets one chance: a candidate overlapping an already accepted sphere is
/// dropped and the next index is tried. Dense settings therefore yield fewer spheres than
/// requested, but the work is bounded by `max_count²` overlap tests.
pub fn generate<R: Rng + ?Sized>(settings: &SceneSettings, rng: &mut R) -> Result<Scene, SceneError> {
    settings.validate()?;

    let [min_radius, max_radius] = settings.radius_range;
    // Dense settings accept far fewer spheres than requested
    let mut spheres: Vec<Sphere> = Vec::with_capacity(settings.max_count.min(1024) as usize);

    for _ in 0..settings.max_count {
        let radius = min_radius + rng.gen::<f32>() * (max_radius - min_radius);
        let [x, z] = sample_disc(rng, settings.placement_radius);
        let position = Point3::new(x, radius, z);

        // Only the geometry matters for the overlap test
        let candidate = Sphere::diffuse(position, radius, Vector3::new(0.0, 0.0, 0.0));
        if spheres.iter().any(|other| candidate.overlaps(other)) {
            continue;
        }

        let color = random_color(rng);
        let sphere = if rng.gen_bool(0.5) {
            Sphere::metal(position, radius, color)
        } else {
            Sphere::diffuse(position, radius, color)
        };
        spheres.push(sphere);
    }

    log::info!("Scene generated with {} of {} spheres", spheres.len(), settings.max_count);
    Ok(Scene { spheres })
}

/// Uniform point inside a disc of the given radius.
fn sample_disc<R: Rng + ?Sized>(rng: &mut R, radius: f32) -> [f32; 2] {
    let r = radius * rng.gen::<f32>().sqrt();
    let theta = 2.0 * PI * rng.gen::<f32>();
    [r * theta.cos(), r * theta.sin()]
}

/// Random hue, saturation and value, converted to linear RGB.
fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f32> {
    let hue: f32 = rng.gen();
    let saturation: f32 = rng.gen();
    let value: f32 = rng.gen();
    hsv_to_rgb(hue, saturation, value)
}

fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> Vector3<f32> {
    let h = (hue.fract() * 6.0).min(5.999_999);
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));
    match sector as u32 {
        0 => Vector3::new(value, t, p),
        1 => Vector3::new(q, value, p),
        2 => Vector3::new(p, value, t),
        3 => Vector3::new(p, q, value),
        4 => Vector3::new(t, p, value),
        _ => Vector3::new(value, p, q),
    }
}
