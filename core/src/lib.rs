#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Prompt World engine.
//!
//! This crate defines the message surface that connects the session, the
//! authoritative world, and pure systems. Systems read immutable views of the
//! world and respond with [`Command`] batches; the world executes those
//! commands via its `apply` entry point and reports what happened through
//! [`Event`] values. Backend snapshots and request bodies live in
//! [`snapshot`], tunables in [`config`].

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod snapshot;

pub use config::{CombatConfig, EngineConfig, PhysicsParams, PlacementConfig, TerrainConfig};
pub use snapshot::{Environment, PhysicsOverrides, SnapshotError, WorldSnapshot};

/// Describes where the session is in its request lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// No world is loaded; the menu is showing.
    Idle,
    /// A generation request is outstanding.
    Generating,
    /// A modification request is outstanding while the world keeps running.
    Modifying,
    /// A world is loaded and no request is outstanding.
    Playing,
}

impl SessionPhase {
    /// Reports whether a generation or modification request is outstanding.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Generating | Self::Modifying)
    }

    /// Reports whether a live world exists that the frame loop may advance.
    #[must_use]
    pub const fn has_world(self) -> bool {
        matches!(self, Self::Playing | Self::Modifying)
    }
}

/// Categories of structures a snapshot can describe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureCategory {
    /// Procedural tree.
    Tree,
    /// Boulder.
    Rock,
    /// House, igloo or skyscraper.
    Building,
    /// Mountain peak.
    Peak,
    /// Street lamp.
    StreetLamp,
    /// Hostile actor.
    Enemy,
}

impl StructureCategory {
    /// Every category in reconciliation order.
    pub const ALL: [Self; 6] = [
        Self::Tree,
        Self::Rock,
        Self::Building,
        Self::Peak,
        Self::StreetLamp,
        Self::Enemy,
    ];

    /// Snapshot key naming the category.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tree => "trees",
            Self::Rock => "rocks",
            Self::Building => "buildings",
            Self::Peak => "peaks",
            Self::StreetLamp => "street_lamps",
            Self::Enemy => "enemies",
        }
    }

    /// Reports whether the category blocks character movement.
    #[must_use]
    pub const fn is_obstacle(self) -> bool {
        !matches!(self, Self::Enemy)
    }
}

/// Kinds of buildings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingType {
    /// Small house laid out on a district slot.
    #[default]
    House,
    /// Tall tower placed free-form in cities.
    Skyscraper,
    /// Snow dome laid out on a district slot.
    Igloo,
}

/// Unique identifier assigned to a placed structure by the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StructureId(u32);

impl StructureId {
    /// Creates a new structure identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a renderable object owned by the geometry collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RenderHandle(u64);

impl RenderHandle {
    /// Wraps a collaborator-provided handle value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw handle value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Optional style attributes forwarded to the geometry collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StructureStyle {
    /// Main color (foliage, walls, rock surface) or enemy archetype.
    pub primary: Option<String>,
    /// Secondary color such as a tree trunk.
    pub secondary: Option<String>,
}

/// Normalized request to build one renderable structure.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureDescriptor {
    /// Category of the structure.
    pub category: StructureCategory,
    /// Requested position; the world replaces `y` with the terrain height.
    pub position: Vec3,
    /// Category-specific size multiplier.
    pub scale: f32,
    /// Explicit height, when the snapshot provided one.
    pub height: Option<f32>,
    /// Building kind, for buildings only.
    pub building_type: Option<BuildingType>,
    /// Starting health, for enemies only.
    pub health: Option<i32>,
    /// Style attributes.
    pub style: StructureStyle,
}

impl StructureDescriptor {
    /// Creates an unstyled descriptor.
    #[must_use]
    pub fn new(category: StructureCategory, position: Vec3, scale: f32) -> Self {
        Self {
            category,
            position,
            scale,
            height: None,
            building_type: None,
            health: None,
            style: StructureStyle::default(),
        }
    }
}

/// Metadata returned by the geometry collaborator for a built structure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuiltStructure {
    /// Handle of the renderable object.
    pub render: RenderHandle,
    /// Horizontal collision and occupancy radius.
    pub footprint_radius: f32,
    /// Height of the standable top surface above the base, zero when none.
    pub support_height: f32,
}

/// Selects registry entries for removal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureSelector {
    /// Any entry of the category.
    Category(StructureCategory),
    /// Buildings, split into skyscrapers and everything else.
    Building {
        /// Selects skyscrapers when true, houses and igloos otherwise.
        skyscraper: bool,
    },
}

impl StructureSelector {
    /// Reports whether an entry with the given tags is selected.
    #[must_use]
    pub fn matches(self, category: StructureCategory, building_type: Option<BuildingType>) -> bool {
        match self {
            Self::Category(wanted) => category == wanted,
            Self::Building { skyscraper } => {
                category == StructureCategory::Building
                    && (building_type == Some(BuildingType::Skyscraper)) == skyscraper
            }
        }
    }
}

/// How a placement interacts with the occupancy mask.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskPolicy {
    /// Place only when a disc of the radius is free, then claim it.
    RequireFree(f32),
    /// Claim a disc of the radius without checking it first.
    Claim(f32),
    /// Claim a disc of the footprint radius reported by the factory.
    ClaimFootprint,
    /// Leave the mask untouched.
    Ignore,
}

/// Sub-state of the player's locomotion state machine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionState {
    /// Whether the character stands on terrain or a roof.
    pub grounded: bool,
    /// Whether a mid-air jump remains before landing.
    pub double_jump_available: bool,
    /// Whether a dash is in progress.
    pub dashing: bool,
    /// Seconds left in the current dash.
    pub dash_time_remaining: f32,
    /// Seconds before another dash may start.
    pub dash_cooldown_remaining: f32,
}

impl MotionState {
    /// Reports whether the character is inside the jump-attack window.
    #[must_use]
    pub const fn is_jump_attacking(&self) -> bool {
        !self.grounded && !self.double_jump_available
    }
}

impl Default for MotionState {
    fn default() -> Self {
        Self {
            grounded: true,
            double_jump_available: true,
            dashing: false,
            dash_time_remaining: 0.0,
            dash_cooldown_remaining: 0.0,
        }
    }
}

/// Complete kinematic state of the player character.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlayerState {
    /// Feet position in world units.
    pub position: Vec3,
    /// Velocity; only the vertical component persists between ticks.
    pub velocity: Vec3,
    /// Locomotion sub-state.
    pub motion: MotionState,
}

/// Immutable representation of a structure that can block or carry the player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObstacleSnapshot {
    /// Registry identifier.
    pub id: StructureId,
    /// Category of the structure.
    pub category: StructureCategory,
    /// Base position with `y` on the terrain.
    pub position: Vec3,
    /// Horizontal collision radius.
    pub footprint_radius: f32,
    /// Height of the standable top above the base, zero when none.
    pub support_height: f32,
}

impl ObstacleSnapshot {
    /// Reports whether characters can stand on top of the structure.
    #[must_use]
    pub fn offers_support(&self) -> bool {
        self.support_height > 0.0
    }

    /// Elevation of the standable top surface.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.position.y + self.support_height
    }

    /// Horizontal distance between the structure's base and `(x, z)`.
    #[must_use]
    pub fn horizontal_distance(&self, x: f32, z: f32) -> f32 {
        let dx = self.position.x - x;
        let dz = self.position.z - z;
        (dx * dx + dz * dz).sqrt()
    }
}

/// Immutable representation of a live enemy used by combat.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Registry identifier.
    pub id: StructureId,
    /// Feet position.
    pub position: Vec3,
    /// Current health.
    pub health: i32,
    /// Spawn health.
    pub max_health: i32,
    /// Whether the hit flash is showing.
    pub flashing: bool,
}

/// Immutable representation of a live building used for slot allocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildingSnapshot {
    /// Registry identifier.
    pub id: StructureId,
    /// Kind of building.
    pub building_type: BuildingType,
    /// Base position.
    pub position: Vec3,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Clears every structure and the occupancy mask and loads a new terrain grid.
    ResetWorld {
        /// Square elevation grid indexed as `[row][column]`; empty for flat ground.
        heightmap: Vec<Vec<f32>>,
    },
    /// Builds a structure through the factory and registers it.
    PlaceStructure {
        /// What to build.
        descriptor: StructureDescriptor,
        /// How the placement checks and claims occupancy.
        mask: MaskPolicy,
    },
    /// Removes the oldest entry matching the selector.
    RemoveFirstMatching {
        /// Entries eligible for removal.
        selector: StructureSelector,
    },
    /// Removes the newest entry matching the selector.
    RemoveLastMatching {
        /// Entries eligible for removal.
        selector: StructureSelector,
    },
    /// Removes every entry matching the selector.
    RemoveAllMatching {
        /// Entries eligible for removal.
        selector: StructureSelector,
    },
    /// Overwrites biome, time-of-day and lighting metadata.
    SetEnvironment {
        /// New environment.
        environment: Environment,
    },
    /// Overwrites the locomotion constants with the configured base merged with overrides.
    SetPhysics {
        /// Snapshot overrides, if any.
        overrides: Option<PhysicsOverrides>,
    },
    /// Moves the player to the ground at the provided horizontal position and resets motion.
    SpawnPlayer {
        /// Horizontal x coordinate.
        x: f32,
        /// Horizontal z coordinate.
        z: f32,
    },
    /// Replaces the player's kinematic state with the solver's result.
    UpdatePlayer {
        /// State computed by the locomotion solver.
        state: PlayerState,
    },
    /// Subtracts health from an enemy.
    DamageEnemy {
        /// Enemy receiving the hit.
        enemy: StructureId,
        /// Health to subtract.
        amount: i32,
    },
    /// Removes an enemy whose health is already exhausted.
    DespawnEnemy {
        /// Enemy to remove.
        enemy: StructureId,
    },
    /// Advances timers by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that the world was cleared and new terrain loaded.
    WorldReset {
        /// Whether a height field is now loaded.
        terrain_loaded: bool,
    },
    /// Confirms that a structure was built and registered.
    StructurePlaced {
        /// Identifier allocated by the registry.
        id: StructureId,
        /// Category of the structure.
        category: StructureCategory,
        /// Handle of the renderable object.
        render: RenderHandle,
    },
    /// Reports that a placement was dropped because its region was occupied.
    PlacementRejected {
        /// Category of the dropped candidate.
        category: StructureCategory,
        /// Requested x coordinate.
        x: f32,
        /// Requested z coordinate.
        z: f32,
    },
    /// Confirms that a structure left the registry.
    StructureRemoved {
        /// Identifier of the removed entry.
        id: StructureId,
        /// Category of the removed entry.
        category: StructureCategory,
        /// Handle the renderer should release.
        render: RenderHandle,
    },
    /// Reports that a removal found nothing to remove.
    RemovalSkipped {
        /// Selector that matched nothing.
        selector: StructureSelector,
    },
    /// Confirms that environment metadata was overwritten.
    EnvironmentChanged {
        /// Active biome name.
        biome: String,
    },
    /// Confirms that locomotion constants were overwritten.
    PhysicsChanged {
        /// Constants now in effect.
        params: PhysicsParams,
    },
    /// Confirms that the player was placed at a spawn point.
    PlayerSpawned {
        /// Feet position after snapping to the ground.
        position: Vec3,
    },
    /// Confirms that an enemy took damage.
    EnemyDamaged {
        /// Enemy that was hit.
        enemy: StructureId,
        /// Health left after the hit.
        health: i32,
    },
    /// Confirms that an enemy was removed after its health ran out.
    EnemyDefeated {
        /// Enemy that was removed.
        enemy: StructureId,
        /// Handle the renderer should release.
        render: RenderHandle,
        /// Live enemies left in the world.
        remaining: usize,
    },
}
