use cgmath::{InnerSpace, Point3, Vector3, Zero};
use serde::Deserialize;

/// Flat specular reflectance of a dielectric surface (roughly 4% at normal incidence).
pub const DIELECTRIC_SPECULAR: [f32; 3] = [0.04, 0.04, 0.04];

//-----------Sphere-----------------

/// Which of the two shading models a sphere uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SphereMaterial {
    /// Colored albedo with a flat dielectric specular.
    Diffuse,
    /// Black albedo with a colored specular tint.
    Metal,
}

/// A sphere resting in the scene.
///
/// Spheres are immutable once built. The material is encoded the way the kernel expects it:
/// a metal has a zero albedo and carries its color in `specular`, a diffuse sphere carries its
/// color in `albedo` and uses [`DIELECTRIC_SPECULAR`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    position: Point3<f32>,
    radius: f32,
    albedo: Vector3<f32>,
    specular: Vector3<f32>,
}

impl Sphere {
    pub fn diffuse(position: Point3<f32>, radius: f32, color: Vector3<f32>) -> Self {
        Self {
            position,
            radius,
            albedo: color,
            specular: DIELECTRIC_SPECULAR.into(),
        }
    }

    pub fn metal(position: Point3<f32>, radius: f32, color: Vector3<f32>) -> Self {
        Self {
            position,
            radius,
            albedo: Vector3::zero(),
            specular: color,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn albedo(&self) -> Vector3<f32> {
        self.albedo
    }

    pub fn specular(&self) -> Vector3<f32> {
        self.specular
    }

    pub fn material(&self) -> SphereMaterial {
        if self.albedo == Vector3::zero() && self.specular != Vector3::from(DIELECTRIC_SPECULAR) {
            SphereMaterial::Metal
        } else {
            SphereMaterial::Diffuse
        }
    }

    /// Whether the two spheres interpenetrate. Touching spheres do not overlap.
    pub fn overlaps(&self, other: &Sphere) -> bool {
        let min_distance = self.radius + other.radius;
        (self.position - other.position).magnitude2() < min_distance * min_distance
    }
}

/// GPU record of a [`Sphere`].
///
/// The kernel declares the sphere with scalar fields only, so the array stride is 40 bytes
/// and no padding is inserted between records.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct SphereUniform {
    position: [f32; 3],
    radius: f32,
    albedo: [f32; 3],
    specular: [f32; 3],
}

impl SphereUniform {
    pub const STRIDE: u64 = std::mem::size_of::<SphereUniform>() as u64;

    pub fn new(sphere: &Sphere) -> Self {
        Self {
            position: sphere.position.into(),
            radius: sphere.radius,
            albedo: sphere.albedo.into(),
            specular: sphere.specular.into(),
        }
    }
}

impl From<&Sphere> for SphereUniform {
    fn from(sphere: &Sphere) -> Self {
        Self::new(sphere)
    }
}

//-----------Light-----------------

/// Directional light shining along `direction`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct DirectionalLight {
    pub direction: [f32; 3],
    pub intensity: f32,
}

impl DirectionalLight {
    pub fn new(direction: [f32; 3], intensity: f32) -> Self {
        Self { direction, intensity }
    }

    /// Packs the light as `(direction.xyz, intensity)` with a normalized direction.
    pub fn to_vec4(&self) -> [f32; 4] {
        let direction = Vector3::from(self.direction);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            Vector3::new(0.0, -1.0, 0.0)
        };
        [direction.x, direction.y, direction.z, self.intensity]
    }
}
