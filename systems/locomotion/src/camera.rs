//! Third-person orbit camera that trails the player.

use std::f32::consts::FRAC_PI_2;

use glam::Vec3;

const MIN_PITCH: f32 = -0.2;
const MAX_PITCH: f32 = FRAC_PI_2 - 0.1;
const DEFAULT_PITCH: f32 = 0.35;
const DEFAULT_DISTANCE: f32 = 10.0;
const DEFAULT_SMOOTHING: f32 = 8.0;
/// Look-at height above the player's feet at zero pitch.
const LOOK_HEIGHT: f32 = 1.5;
/// Extra look-at height per radian of pitch.
const PITCH_BIAS: f32 = 1.0;

/// Orbit camera positioned on a sphere around the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    smoothing: f32,
    position: Vec3,
    target: Vec3,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(DEFAULT_DISTANCE)
    }
}

impl OrbitCamera {
    /// Creates a camera orbiting at `distance` behind the origin.
    #[must_use]
    pub fn new(distance: f32) -> Self {
        let mut camera = Self {
            yaw: 0.0,
            pitch: DEFAULT_PITCH,
            distance: distance.max(0.0),
            smoothing: DEFAULT_SMOOTHING,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
        };
        camera.snap_to(Vec3::ZERO);
        camera
    }

    /// Rotates the orbit; pitch is clamped short of straight up or down.
    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32) {
        if yaw_delta.is_finite() {
            self.yaw = (self.yaw + yaw_delta).rem_euclid(std::f32::consts::TAU);
        }
        if pitch_delta.is_finite() {
            self.pitch = (self.pitch + pitch_delta).clamp(MIN_PITCH, MAX_PITCH);
        }
    }

    /// Moves the camera toward its orbit position around `focus`.
    ///
    /// The approach is exponential, so the result does not depend on how the
    /// elapsed time is split into frames.
    pub fn follow(&mut self, focus: Vec3, dt: f32) {
        let blend = 1.0 - (-self.smoothing * dt.max(0.0)).exp();
        self.position = self.position.lerp(self.desired_position(focus), blend);
        self.target = self.look_target(focus);
    }

    /// Places the camera on its orbit around `focus` immediately.
    pub fn snap_to(&mut self, focus: Vec3) {
        self.position = self.desired_position(focus);
        self.target = self.look_target(focus);
    }

    /// Horizontal unit vector the camera looks along.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        let view = self.target - self.position;
        Vec3::new(view.x, 0.0, view.z)
            .try_normalize()
            .unwrap_or_else(|| Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos()))
    }

    /// Current eye position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current look-at point.
    #[must_use]
    pub const fn target(&self) -> Vec3 {
        self.target
    }

    /// Current yaw in radians.
    #[must_use]
    pub const fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Current pitch in radians.
    #[must_use]
    pub const fn pitch(&self) -> f32 {
        self.pitch
    }

    fn desired_position(&self, focus: Vec3) -> Vec3 {
        let (yaw_sin, yaw_cos) = self.yaw.sin_cos();
        let (pitch_sin, pitch_cos) = self.pitch.sin_cos();
        focus + Vec3::new(pitch_cos * yaw_sin, pitch_sin, pitch_cos * yaw_cos) * self.distance
    }

    fn look_target(&self, focus: Vec3) -> Vec3 {
        focus + Vec3::Y * (LOOK_HEIGHT + self.pitch * PITCH_BIAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = OrbitCamera::default();
        assert!((camera.forward() - Vec3::NEG_Z).length() < 1e-5);
        assert!(camera.position().z > 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut camera = OrbitCamera::default();
        camera.orbit(0.0, 10.0);
        assert_eq!(camera.pitch(), MAX_PITCH);
        camera.orbit(0.0, -10.0);
        assert_eq!(camera.pitch(), MIN_PITCH);
    }

    #[test]
    fn yaw_wraps_into_one_turn() {
        let mut camera = OrbitCamera::default();
        camera.orbit(-0.5, 0.0);
        assert!((camera.yaw() - (std::f32::consts::TAU - 0.5)).abs() < 1e-5);
        camera.orbit(1.0, 0.0);
        assert!((camera.yaw() - 0.5).abs() < 1e-5);
    }

    #[test]
    fn quarter_turn_rotates_forward() {
        let mut camera = OrbitCamera::default();
        camera.orbit(FRAC_PI_2, 0.0);
        camera.snap_to(Vec3::ZERO);
        assert!((camera.forward() - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn follow_converges_on_the_orbit() {
        let mut camera = OrbitCamera::default();
        let focus = Vec3::new(20.0, 3.0, -5.0);
        let mut settled = camera;
        settled.snap_to(focus);

        let first = {
            camera.follow(focus, 1.0 / 60.0);
            camera.position().distance(settled.position())
        };
        for _ in 0..300 {
            camera.follow(focus, 1.0 / 60.0);
        }

        assert!(first > 0.0);
        assert!(camera.position().distance(settled.position()) < 1e-3);
        assert_eq!(camera.target(), settled.target());
    }

    #[test]
    fn steeper_pitch_raises_the_look_target() {
        let mut camera = OrbitCamera::default();
        let level = camera.target().y;
        camera.orbit(0.0, 0.5);
        camera.snap_to(Vec3::ZERO);
        assert!(camera.target().y > level);
    }
}
