#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Locomotion system that advances the player's kinematic state.
//!
//! The solver is a pure function of the previous state, the per-tick input
//! and an immutable collision view. Movement is camera-relative; jumps allow
//! one extra mid-air jump; dashes multiply speed for a short window and then
//! cool down.

use std::time::Duration;

use glam::Vec3;
use prompt_world_core::{Command, ObstacleSnapshot, PhysicsParams, PlayerState};

pub mod camera;

pub use camera::OrbitCamera;

/// Tolerance under which the player counts as standing on a support top.
const SUPPORT_EPSILON: f32 = 1e-3;

/// Per-tick snapshot of the movement controls.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocomotionInput {
    /// Move away from the camera.
    pub forward: bool,
    /// Move toward the camera.
    pub backward: bool,
    /// Strafe left.
    pub left: bool,
    /// Strafe right.
    pub right: bool,
    /// Jump key state.
    pub jump: bool,
    /// Dash key state.
    pub dash: bool,
    /// Camera forward vector; only its horizontal part is used.
    pub camera_forward: Vec3,
}

impl Default for LocomotionInput {
    fn default() -> Self {
        Self {
            forward: false,
            backward: false,
            left: false,
            right: false,
            jump: false,
            dash: false,
            camera_forward: Vec3::NEG_Z,
        }
    }
}

impl LocomotionInput {
    /// Camera-relative horizontal direction requested by the movement keys.
    ///
    /// Returns `Vec3::ZERO` when no movement key is held or the keys cancel out.
    #[must_use]
    pub fn direction(&self) -> Vec3 {
        let forward = Vec3::new(self.camera_forward.x, 0.0, self.camera_forward.z)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y);

        let along = axis(self.forward, self.backward);
        let across = axis(self.right, self.left);
        (forward * along + right * across)
            .try_normalize()
            .unwrap_or(Vec3::ZERO)
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    f32::from(u8::from(positive)) - f32::from(u8::from(negative))
}

/// Pure system that turns held controls into player state updates.
#[derive(Debug, Default)]
pub struct Locomotion {
    jump_held: bool,
}

impl Locomotion {
    /// Creates a locomotion system with no key held.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the player by `dt` and emits the resulting state.
    ///
    /// `input.jump` is the held key state; a jump fires only on the tick
    /// the key goes down. `terrain` samples the ground elevation.
    pub fn handle<F>(
        &mut self,
        player: PlayerState,
        input: &LocomotionInput,
        dt: Duration,
        physics: &PhysicsParams,
        terrain: F,
        obstacles: &[ObstacleSnapshot],
        out: &mut Vec<Command>,
    ) where
        F: Fn(f32, f32) -> f32,
    {
        let pressed = LocomotionInput {
            jump: input.jump && !self.jump_held,
            ..*input
        };
        self.jump_held = input.jump;

        let state = step(
            player,
            &pressed,
            dt.as_secs_f32(),
            physics,
            terrain,
            obstacles,
        );
        out.push(Command::UpdatePlayer { state });
    }

    /// Forgets held keys, used when a new world is entered.
    pub fn reset(&mut self) {
        self.jump_held = false;
    }
}

/// Advances the player's state by one tick.
///
/// `input.jump` and `input.dash` are treated as presses for this tick.
#[must_use]
pub fn step<F>(
    state: PlayerState,
    input: &LocomotionInput,
    dt: f32,
    physics: &PhysicsParams,
    terrain: F,
    obstacles: &[ObstacleSnapshot],
) -> PlayerState
where
    F: Fn(f32, f32) -> f32,
{
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    let mut motion = state.motion;
    let mut position = state.position;
    let mut vertical = state.velocity.y;

    if motion.dashing {
        motion.dash_time_remaining -= dt;
        if motion.dash_time_remaining <= 0.0 {
            motion.dashing = false;
            motion.dash_time_remaining = 0.0;
        }
    }
    motion.dash_cooldown_remaining = (motion.dash_cooldown_remaining - dt).max(0.0);

    if input.dash && !motion.dashing && motion.dash_cooldown_remaining <= 0.0 {
        motion.dashing = true;
        motion.dash_time_remaining = physics.dash_duration;
        motion.dash_cooldown_remaining = physics.dash_cooldown;
    }

    if input.jump {
        if motion.grounded {
            vertical = physics.jump_velocity();
            motion.grounded = false;
        } else if motion.double_jump_available {
            vertical = physics.jump_velocity();
            motion.double_jump_available = false;
        }
    }

    let support = support_height(position, &terrain, obstacles);

    let direction = input.direction();
    let mut horizontal = Vec3::ZERO;
    if direction != Vec3::ZERO {
        let speed = if motion.dashing {
            physics.move_speed * physics.dash_multiplier
        } else {
            physics.move_speed
        };
        horizontal = direction * speed;
        let destination = position + horizontal * dt;
        if is_blocked(position, destination, physics.player_radius, obstacles) {
            horizontal = Vec3::ZERO;
        } else {
            position.x = destination.x;
            position.z = destination.z;
        }
    }

    vertical -= physics.gravity * dt;
    position.y += vertical * dt;
    if position.y <= support {
        position.y = support;
        vertical = 0.0;
        motion.grounded = true;
        motion.double_jump_available = true;
    } else {
        motion.grounded = false;
    }

    PlayerState {
        position,
        velocity: Vec3::new(horizontal.x, vertical, horizontal.z),
        motion,
    }
}

/// Elevation the player stands on at `position`: terrain, raised to the top
/// of any supporting structure whose footprint covers the point.
fn support_height<F>(position: Vec3, terrain: &F, obstacles: &[ObstacleSnapshot]) -> f32
where
    F: Fn(f32, f32) -> f32,
{
    obstacles
        .iter()
        .filter(|obstacle| {
            obstacle.category.is_obstacle()
                && obstacle.offers_support()
                && obstacle.horizontal_distance(position.x, position.z) <= obstacle.footprint_radius
        })
        .map(ObstacleSnapshot::top)
        .fold(terrain(position.x, position.z), f32::max)
}

/// Reports whether the player disc at `destination` touches an obstacle it
/// cannot pass over.
fn is_blocked(
    position: Vec3,
    destination: Vec3,
    radius: f32,
    obstacles: &[ObstacleSnapshot],
) -> bool {
    obstacles.iter().any(|obstacle| {
        if !obstacle.category.is_obstacle() {
            return false;
        }
        if obstacle.offers_support() && position.y >= obstacle.top() - SUPPORT_EPSILON {
            return false;
        }
        obstacle.horizontal_distance(destination.x, destination.z)
            < radius + obstacle.footprint_radius
    })
}
