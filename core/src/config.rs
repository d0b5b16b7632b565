//! Tunable engine parameters shared by the world and its systems.
//!
//! Every section deserializes with `#[serde(default)]`, so a configuration
//! file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

use crate::snapshot::PhysicsOverrides;

/// Aggregated configuration for every engine component.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Terrain extent and sampling resolution.
    pub terrain: TerrainConfig,
    /// Base locomotion constants before snapshot overrides are merged in.
    pub physics: PhysicsParams,
    /// Combat tuning applied to enemies and the player attack window.
    pub combat: CombatConfig,
    /// Placement tuning consumed by the reconciler.
    pub placement: PlacementConfig,
}

/// World extent shared by the height field and the occupancy mask.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Side length of the square world centered at the origin, in world units.
    pub world_extent: f32,
    /// Vertical exaggeration applied to every height sample.
    pub vertical_scale: f32,
    /// Number of occupancy cells along each edge of the placement mask.
    pub mask_size: u32,
}

impl TerrainConfig {
    /// Half of the world extent; the world spans `[-half, +half]` on both axes.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.world_extent * 0.5
    }
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            world_extent: 200.0,
            vertical_scale: 12.0,
            mask_size: 100,
        }
    }
}

/// Locomotion constants consumed by the player solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsParams {
    /// Downward acceleration in world units per second squared.
    pub gravity: f32,
    /// Apex height reached by a single jump from rest.
    pub jump_height: f32,
    /// Base horizontal speed in world units per second.
    pub move_speed: f32,
    /// Speed multiplier applied while dashing.
    pub dash_multiplier: f32,
    /// Seconds a dash lasts once triggered.
    pub dash_duration: f32,
    /// Seconds before another dash may start.
    pub dash_cooldown: f32,
    /// Radius of the character's collision disc.
    pub player_radius: f32,
    /// Height of the character's bounding volume.
    pub player_height: f32,
}

impl PhysicsParams {
    /// Upward velocity that lifts the character to `jump_height`.
    #[must_use]
    pub fn jump_velocity(&self) -> f32 {
        (2.0 * self.gravity.max(0.0) * self.jump_height.max(0.0)).sqrt()
    }

    /// Returns a copy with every value present in `overrides` replacing the base value.
    #[must_use]
    pub fn merged(&self, overrides: Option<&PhysicsOverrides>) -> Self {
        let Some(overrides) = overrides else {
            return *self;
        };

        Self {
            gravity: overrides.gravity.unwrap_or(self.gravity),
            jump_height: overrides.jump_height.unwrap_or(self.jump_height),
            move_speed: overrides.move_speed.unwrap_or(self.move_speed),
            dash_multiplier: overrides.dash_multiplier.unwrap_or(self.dash_multiplier),
            dash_duration: overrides.dash_duration.unwrap_or(self.dash_duration),
            dash_cooldown: overrides.dash_cooldown.unwrap_or(self.dash_cooldown),
            player_radius: self.player_radius,
            player_height: self.player_height,
        }
    }
}

impl Default for PhysicsParams {
    fn default() -> Self {
        Self {
            gravity: 30.0,
            jump_height: 2.5,
            move_speed: 8.0,
            dash_multiplier: 3.0,
            dash_duration: 0.2,
            dash_cooldown: 1.0,
            player_radius: 0.5,
            player_height: 1.8,
        }
    }
}

/// Combat tuning for enemies and player attacks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Health removed from an enemy per overlapping attack frame.
    pub damage: i32,
    /// Health assigned to enemies whose descriptor omits it.
    pub enemy_health: i32,
    /// Half width of an enemy's bounding box on both horizontal axes.
    pub enemy_half_width: f32,
    /// Height of an enemy's bounding box.
    pub enemy_height: f32,
    /// Seconds an enemy keeps its hit flash after taking damage.
    pub flash_duration: f32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            damage: 1,
            enemy_health: 3,
            enemy_half_width: 0.6,
            enemy_height: 1.6,
            flash_duration: 0.15,
        }
    }
}

/// Placement tuning consumed by the reconciler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Base clearance radius of a tree, multiplied by the tree's scale.
    pub tree_clearance: f32,
    /// Number of slot rows in each building district.
    pub district_rows: u32,
    /// Number of slot columns in each building district.
    pub district_columns: u32,
    /// Distance between neighbouring district slots.
    pub district_spacing: f32,
    /// Origins of the building districts as `[x, z]` pairs.
    pub districts: Vec<[f32; 2]>,
    /// Minimum horizontal distance between a skyscraper and any slot or other skyscraper.
    pub skyscraper_separation: f32,
    /// Rejection-sampling attempts before a skyscraper is dropped.
    pub skyscraper_attempts: u32,
    /// Fraction of the half extent that skyscraper sampling may cover.
    pub skyscraper_spread: f32,
    /// Seed for the reconciler's placement RNG.
    pub rng_seed: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            tree_clearance: 1.5,
            district_rows: 2,
            district_columns: 3,
            district_spacing: 12.0,
            districts: vec![[-40.0, -40.0], [30.0, -40.0], [-40.0, 30.0]],
            skyscraper_separation: 15.0,
            skyscraper_attempts: 100,
            skyscraper_spread: 0.8,
            rng_seed: 0x5eed_c1e5_7a9b_0001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jump_velocity_reaches_configured_height() {
        let params = PhysicsParams::default();
        let velocity = params.jump_velocity();
        let apex = velocity * velocity / (2.0 * params.gravity);
        assert!((apex - params.jump_height).abs() < 1e-4);
    }

    #[test]
    fn merging_overrides_keeps_unspecified_values() {
        let base = PhysicsParams::default();
        let overrides = PhysicsOverrides {
            gravity: Some(12.0),
            move_speed: Some(4.0),
            ..PhysicsOverrides::default()
        };

        let merged = base.merged(Some(&overrides));

        assert_eq!(merged.gravity, 12.0);
        assert_eq!(merged.move_speed, 4.0);
        assert_eq!(merged.jump_height, base.jump_height);
        assert_eq!(merged.player_radius, base.player_radius);
        assert_eq!(base.merged(None), base);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "terrain": { "mask_size": 40 } }"#).expect("config parses");
        assert_eq!(config.terrain.mask_size, 40);
        assert_eq!(config.terrain.world_extent, 200.0);
        assert_eq!(config.physics, PhysicsParams::default());
    }
}
