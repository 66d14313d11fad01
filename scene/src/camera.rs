use cgmath::*;
use std::time::Duration;
use winit::dpi::PhysicalPosition;
use winit::event::*;
use winit::keyboard::{Key, NamedKey};

use crate::config::CameraConfig;

/// Represents a camera in 3D space.
///
/// The camera has a position and a rotation. The position is a point in 3D space, and the rotation is a quaternion that represents the orientation of the camera.
/// In camera space the camera looks down -Z with +Y up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, Y: Into<Rad<f32>>, P: Into<Rad<f32>>>(position: V, yaw: Y, pitch: P) -> Self {
        let quaternion = Quaternion::from_angle_y(yaw) * Quaternion::from_angle_x(pitch);
        Self {
            position: position.into(),
            rotation: quaternion,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.position, Deg(config.rotation[0]), Deg(config.rotation[1]))
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation.rotate_vector(-Vector3::unit_z())
    }

    /// Transform from camera space to world space.
    pub fn camera_to_world(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position.to_vec()) * Matrix4::from(self.rotation)
    }

    /// Transform from world space to camera space.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.forward(), Vector3::unit_y())
    }
}

/// Represents a projection of a 3D scene onto the 2D plane of the camera.
///
/// The projection is defined by an aspect ratio, a field of view, and near and far clipping planes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    pub fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn from_config(width: u32, height: u32, config: &CameraConfig) -> Self {
        Self::new(width, height, Deg(config.fov), config.near_far[0], config.near_far[1])
    }

    /// Updates the aspect ratio. Returns whether it changed.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let aspect = width as f32 / height.max(1) as f32;
        let changed = aspect != self.aspect;
        self.aspect = aspect;
        changed
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Controls the movement and rotation of a camera.
///
/// The controller keeps track of the amount of movement in each direction (left, right, forward, backward, up, down), the amount of rotation (horizontal and vertical), and the amount of scrolling.
/// It also has a speed and a sensitivity, which control how fast the camera moves and how sensitive it is to rotation.
/// Scrolling scales the movement speed.
#[derive(Debug)]
pub struct CameraController {
    amount_left: f32,
    amount_right: f32,
    amount_forward: f32,
    amount_backward: f32,
    amount_up: f32,
    amount_down: f32,
    rotate_horizontal: f32,
    rotate_vertical: f32,
    scroll: f32,
    speed: f32,
    sensitivity: f32,
}

impl CameraController {
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            amount_left: 0.0,
            amount_right: 0.0,
            amount_forward: 0.0,
            amount_backward: 0.0,
            amount_up: 0.0,
            amount_down: 0.0,
            rotate_horizontal: 0.0,
            rotate_vertical: 0.0,
            scroll: 0.0,
            speed,
            sensitivity,
        }
    }

    pub fn process_keyboard(&mut self, key: &Key, state: &ElementState) -> bool {
        let amount = if state == &ElementState::Pressed { 1.0 } else { 0.0 };
        match key {
            Key::Character(c) if c.to_lowercase() == "w" => {
                self.amount_forward = amount;
                true
            }
            Key::Character(c) if c.to_lowercase() == "s" => {
                self.amount_backward = amount;
                true
            }
            Key::Character(c) if c.to_lowercase() == "a" => {
                self.amount_left = amount;
                true
            }
            Key::Character(c) if c.to_lowercase() == "d" => {
                self.amount_right = amount;
                true
            }
            Key::Named(NamedKey::ArrowUp) => {
                self.amount_forward = amount;
                true
            }
            Key::Named(NamedKey::ArrowDown) => {
                self.amount_backward = amount;
                true
            }
            Key::Named(NamedKey::ArrowLeft) => {
                self.amount_left = amount;
                true
            }
            Key::Named(NamedKey::ArrowRight) => {
                self.amount_right = amount;
                true
            }
            Key::Named(NamedKey::Space) => {
                self.amount_up = amount;
                true
            }
            Key::Named(NamedKey::Shift) => {
                self.amount_down = amount;
                true
            }
            _ => false,
        }
    }

    pub fn process_mouse(&mut self, mouse_dx: f64, mouse_dy: f64) {
        self.rotate_horizontal = -mouse_dx as f32;
        self.rotate_vertical = mouse_dy as f32;
    }

    pub fn process_scroll(&mut self, delta: &MouseScrollDelta) {
        self.scroll = match delta {
            // I'm assuming a line is about 100 pixels
            MouseScrollDelta::LineDelta(_, scroll) => *scroll * 100.0,
            MouseScrollDelta::PixelDelta(PhysicalPosition { y: scroll, .. }) => *scroll as f32,
        };
    }

    /// Applies the pending input to the camera. Returns whether the camera moved or turned.
    pub fn update_camera(&mut self, camera: &mut Camera, dt: Duration) -> bool {
        let dt = dt.as_secs_f32();
        let before = *camera;

        if self.scroll != 0.0 {
            self.speed = (self.speed * (1.0 + self.scroll * 0.001)).clamp(0.5, 500.0);
            self.scroll = 0.0;
        }

        // Move forward/backward and left/right
        let forward = camera.forward().normalize();
        let right = camera.rotation.rotate_vector(Vector3::unit_x()).normalize();
        camera.position += forward * (self.amount_forward - self.amount_backward) * self.speed * dt;
        camera.position += right * (self.amount_right - self.amount_left) * self.speed * dt;

        // Move up/down
        camera.position.y += (self.amount_up - self.amount_down) * self.speed * dt;

        // Yaw around the world up axis, pitch around the camera's own x axis
        if self.rotate_horizontal != 0.0 || self.rotate_vertical != 0.0 {
            let pitch_quaternion = Quaternion::from_axis_angle(Vector3::unit_x(), Rad(-self.rotate_vertical) * self.sensitivity * dt);
            let yaw_quaternion = Quaternion::from_axis_angle(Vector3::unit_y(), Rad(self.rotate_horizontal) * self.sensitivity * dt);
            camera.rotation = (yaw_quaternion * camera.rotation * pitch_quaternion).normalize();
        }

        // Reset rotation values
        self.rotate_horizontal = 0.0;
        self.rotate_vertical = 0.0;

        *camera != before
    }
}
