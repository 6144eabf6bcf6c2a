use glam::{Mat4, Vec3};

pub const DEFAULT_FOV_Y_DEGREES: f32 = 50.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 200.0;
const MIN_DISTANCE: f32 = 1.0;
const MAX_PITCH_RADIANS: f32 = 1.5;

/// Perspective camera orbiting a target point.
///
/// `yaw` rotates around +Y starting from +Z, `pitch` tilts towards +Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera3D {
    pub target: Vec3,
    pub yaw_radians: f32,
    pub pitch_radians: f32,
    pub distance: f32,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera3D {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            yaw_radians: std::f32::consts::FRAC_PI_4,
            pitch_radians: 0.55,
            distance: 8.0,
            fov_y_radians: DEFAULT_FOV_Y_DEGREES.to_radians(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
        }
    }
}

impl Camera3D {
    /// Camera at `eye` looking at `target`.
    pub fn looking_at(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(f32::EPSILON);
        let pitch_radians = (offset.y / distance).clamp(-1.0, 1.0).asin();
        let yaw_radians = offset.x.atan2(offset.z);
        Self {
            target,
            yaw_radians,
            pitch_radians,
            distance,
            ..Self::default()
        }
    }

    pub fn eye(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw_radians.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch_radians.sin_cos();
        self.target
            + Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        Mat4::perspective_rh(self.fov_y_radians, aspect, self.near, self.far)
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view()
    }

    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw_radians = (self.yaw_radians + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch_radians =
            (self.pitch_radians + delta_pitch).clamp(-MAX_PITCH_RADIANS, MAX_PITCH_RADIANS);
    }

    pub fn zoom_by(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.distance = (self.distance * factor).clamp(MIN_DISTANCE, self.far * 0.5);
    }

    /// Moves the camera back far enough that a sphere of `radius` around the
    /// target fills the view with `margin` to spare.
    pub fn frame_sphere(&mut self, radius: f32, margin: f32) {
        let half_fov = (self.fov_y_radians * 0.5).max(0.05);
        let fit = radius.max(0.5) * margin.max(1.0) / half_fov.sin();
        self.distance = fit.clamp(MIN_DISTANCE, self.far * 0.5);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    /// Direction the light travels, normalised on use.
    pub direction: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    pub ambient: f32,
    pub directional: Vec<DirectionalLight>,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            ambient: 0.45,
            directional: vec![
                DirectionalLight {
                    direction: Vec3::new(-0.4, -1.0, -0.6),
                    intensity: 0.6,
                },
                DirectionalLight {
                    direction: Vec3::new(0.7, -0.2, 0.3),
                    intensity: 0.2,
                },
            ],
        }
    }
}

impl Lighting {
    /// Brightness factor for a face with outward `normal`.
    pub fn shade(&self, normal: Vec3) -> f32 {
        let normal = normal.normalize_or_zero();
        let diffuse: f32 = self
            .directional
            .iter()
            .map(|light| {
                let towards_light = -light.direction.normalize_or_zero();
                normal.dot(towards_light).max(0.0) * light.intensity.max(0.0)
            })
            .sum();
        (self.ambient.max(0.0) + diffuse).min(1.5)
    }
}
