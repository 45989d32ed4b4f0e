use glam::{Mat4, Vec3};

use crate::coords::Bounds3;

use super::Camera;

/// Perspective camera orbiting a target point.
///
/// Yaw rotates around +Y, pitch is clamped short of the poles.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    aspect: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 50.0,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect: 1.0,
        }
    }
}

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eye(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + self.distance * Vec3::new(sy * cp, sp, cy * cp)
    }

    pub fn orbit(&mut self, d_yaw: f32, d_pitch: f32) {
        self.yaw += d_yaw;
        self.pitch = (self.pitch + d_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Multiplies the distance by `factor` (`< 1` moves closer).
    pub fn zoom(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.distance = (self.distance * factor).max(self.near * 2.0);
        }
    }

    /// Centers on `bounds` and backs off until its bounding sphere fits the
    /// vertical field of view. Near/far planes follow the distance.
    pub fn frame_bounds(&mut self, bounds: &Bounds3) {
        if bounds.is_empty() {
            return;
        }
        self.target = Vec3::from_array(bounds.center());
        let radius = bounds.radius().max(1.0);
        let half_v = self.fov_y * 0.5;
        let half_h = (half_v.tan() * self.aspect).atan();
        self.distance = radius / half_v.min(half_h).sin();
        self.near = (self.distance - radius * 2.0).max(self.distance * 0.01);
        self.far = self.distance + radius * 2.0;
    }
}

impl Camera for OrbitCamera {
    fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    fn aspect(&self) -> f32 {
        self.aspect
    }

    fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }
}
