//! Serde model of the backend's world snapshots and request bodies.
//!
//! Snapshots are whole-world declarative descriptions. The engine never
//! receives deltas; the reconciler derives them by comparing two snapshots.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{BuildingType, StructureCategory, StructureDescriptor, StructureStyle};

/// Biome that enables free-form skyscraper placement.
pub const CITY_BIOME: &str = "city";

/// Errors raised while parsing or validating a snapshot body.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The body was not valid JSON or did not match the snapshot shape.
    #[error("snapshot body could not be parsed: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The body was valid JSON but not an object.
    #[error("snapshot body is not a JSON object")]
    NotAnObject,
    /// The required `world` key was absent.
    #[error("snapshot is missing the `world` section")]
    MissingWorld,
    /// The height map rows were not all as long as the row count.
    #[error("height map row {row} has {found} samples, expected {expected}")]
    IrregularHeightmap {
        /// Index of the offending row.
        row: usize,
        /// Number of samples every row must contain.
        expected: usize,
        /// Number of samples the row contained.
        found: usize,
    },
}

/// Complete declarative description of the world at one point in time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Terrain and environment metadata.
    pub world: WorldData,
    /// Structure descriptor lists grouped by category.
    #[serde(default)]
    pub structures: StructureLists,
    /// Combat actors.
    #[serde(default)]
    pub combat: CombatData,
    /// Optional overrides merged into the locomotion constants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsOverrides>,
    /// Where the player appears after generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawn_point: Option<Position>,
}

impl WorldSnapshot {
    /// Parses and validates a response body.
    ///
    /// Nothing about the live world is touched here; callers only mutate
    /// state once this returns `Ok`.
    pub fn from_json(body: &str) -> Result<Self, SnapshotError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    /// Validates an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, SnapshotError> {
        let Some(object) = value.as_object() else {
            return Err(SnapshotError::NotAnObject);
        };
        if object.get("world").map_or(true, Value::is_null) {
            return Err(SnapshotError::MissingWorld);
        }

        let snapshot: Self = serde_json::from_value(value)?;
        snapshot.world.validate_heightmap()?;
        Ok(snapshot)
    }

    /// Biome name, preferring `biome` over `biome_name`.
    #[must_use]
    pub fn biome(&self) -> &str {
        self.world
            .biome
            .as_deref()
            .or(self.world.biome_name.as_deref())
            .unwrap_or("")
    }

    /// Reports whether skyscrapers use free-form placement in this snapshot.
    #[must_use]
    pub fn is_city(&self) -> bool {
        self.biome().eq_ignore_ascii_case(CITY_BIOME)
    }

    /// Number of descriptors listed for the category.
    #[must_use]
    pub fn count(&self, category: StructureCategory) -> usize {
        match category {
            StructureCategory::Tree => self.structures.trees.len(),
            StructureCategory::Rock => self.structures.rocks.len(),
            StructureCategory::Building => self.structures.buildings.len(),
            StructureCategory::Peak => self.structures.peaks.len(),
            StructureCategory::StreetLamp => self.structures.street_lamps.len(),
            StructureCategory::Enemy => self.combat.enemies.len(),
        }
    }

    /// Environment metadata applied after every reconciliation.
    #[must_use]
    pub fn environment(&self) -> Environment {
        Environment {
            biome: self.biome().to_owned(),
            time_of_day: self.world.time.clone(),
            lighting: self.world.lighting_config.clone(),
        }
    }
}

/// Terrain grids and environment metadata of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldData {
    /// Square elevation grid indexed as `[row][column]`, rows along z.
    #[serde(default)]
    pub heightmap_raw: Vec<Vec<f32>>,
    /// Per-sample colours consumed by the terrain mesh builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour_map_array: Option<Value>,
    /// Biome identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biome: Option<String>,
    /// Alternative biome identifier emitted by older backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biome_name: Option<String>,
    /// Time-of-day marker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
    /// Lighting configuration handed to the renderer untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lighting_config: Option<Value>,
}

impl WorldData {
    fn validate_heightmap(&self) -> Result<(), SnapshotError> {
        let expected = self.heightmap_raw.len();
        for (row, samples) in self.heightmap_raw.iter().enumerate() {
            if samples.len() != expected {
                return Err(SnapshotError::IrregularHeightmap {
                    row,
                    expected,
                    found: samples.len(),
                });
            }
        }
        Ok(())
    }
}

/// Environment state overwritten wholesale on every reconciliation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Environment {
    /// Active biome name.
    pub biome: String,
    /// Time-of-day marker, passed through from the snapshot.
    pub time_of_day: Option<Value>,
    /// Lighting configuration, passed through from the snapshot.
    pub lighting: Option<Value>,
}

/// Structure descriptor lists keyed by category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureLists {
    /// Tree descriptors.
    pub trees: Vec<TreeDescriptor>,
    /// Rock descriptors.
    pub rocks: Vec<RockDescriptor>,
    /// Building descriptors.
    pub buildings: Vec<BuildingDescriptor>,
    /// Mountain peak descriptors.
    pub peaks: Vec<PeakDescriptor>,
    /// Street lamp descriptors.
    pub street_lamps: Vec<StreetLampDescriptor>,
}

/// Combat section of a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatData {
    /// Enemy descriptors in spawn order.
    pub enemies: Vec<EnemyDescriptor>,
}

/// Locomotion overrides carried by a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsOverrides {
    /// Replacement gravity.
    pub gravity: Option<f32>,
    /// Replacement jump apex height.
    pub jump_height: Option<f32>,
    /// Replacement base speed.
    pub move_speed: Option<f32>,
    /// Replacement dash speed multiplier.
    pub dash_multiplier: Option<f32>,
    /// Replacement dash duration in seconds.
    pub dash_duration: Option<f32>,
    /// Replacement dash cooldown in seconds.
    pub dash_cooldown: Option<f32>,
}

/// World position as written by the backend.
///
/// Accepts `[x, z]`, `[x, y, z]` and `{ "x": .., "y": .., "z": .. }`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PositionRepr")]
pub struct Position {
    /// Horizontal x coordinate.
    pub x: f32,
    /// Optional elevation; the world snaps structures to the terrain regardless.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Horizontal z coordinate.
    pub z: f32,
}

impl Position {
    /// Creates a ground-level position.
    #[must_use]
    pub const fn flat(x: f32, z: f32) -> Self {
        Self { x, y: None, z }
    }

    /// Converts the position into a vector, treating a missing elevation as zero.
    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y.unwrap_or(0.0), self.z)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionRepr {
    Sequence(Vec<f32>),
    Object { x: f32, y: Option<f32>, z: f32 },
}

impl TryFrom<PositionRepr> for Position {
    type Error = String;

    fn try_from(value: PositionRepr) -> Result<Self, Self::Error> {
        match value {
            PositionRepr::Object { x, y, z } => Ok(Self { x, y, z }),
            PositionRepr::Sequence(values) => match values.as_slice() {
                [x, z] => Ok(Self::flat(*x, *z)),
                [x, y, z] => Ok(Self {
                    x: *x,
                    y: Some(*y),
                    z: *z,
                }),
                other => Err(format!(
                    "position arrays need 2 or 3 components, found {}",
                    other.len()
                )),
            },
        }
    }
}

fn unit_scale() -> f32 {
    1.0
}

/// Tree entry of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeDescriptor {
    /// Placement position.
    pub position: Position,
    /// Uniform size multiplier.
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Foliage color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_color: Option<String>,
    /// Trunk color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trunk_color: Option<String>,
}

impl TreeDescriptor {
    /// Reports whether the descriptor carries a recolor marker.
    #[must_use]
    pub fn has_style(&self) -> bool {
        self.leaf_color.is_some() || self.trunk_color.is_some()
    }

    /// Converts the entry into a factory descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> StructureDescriptor {
        StructureDescriptor {
            style: StructureStyle {
                primary: self.leaf_color.clone(),
                secondary: self.trunk_color.clone(),
            },
            ..StructureDescriptor::new(StructureCategory::Tree, self.position.to_vec3(), self.scale)
        }
    }
}

/// Rock entry of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RockDescriptor {
    /// Placement position.
    pub position: Position,
    /// Uniform size multiplier.
    #[serde(default = "unit_scale", alias = "size")]
    pub scale: f32,
    /// Surface color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl RockDescriptor {
    /// Converts the entry into a factory descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> StructureDescriptor {
        StructureDescriptor {
            style: StructureStyle {
                primary: self.color.clone(),
                secondary: None,
            },
            ..StructureDescriptor::new(StructureCategory::Rock, self.position.to_vec3(), self.scale)
        }
    }
}

/// Building entry of a snapshot.
///
/// Buildings are laid out by the reconciler, so the suggested position is
/// carried through but never used for placement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingDescriptor {
    /// Kind of building.
    #[serde(default, rename = "type", alias = "building_type")]
    pub building_type: BuildingType,
    /// Suggested position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Uniform size multiplier.
    #[serde(default = "unit_scale")]
    pub scale: f32,
    /// Explicit roof height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// Wall color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl BuildingDescriptor {
    /// Reports whether the building is a skyscraper.
    #[must_use]
    pub fn is_skyscraper(&self) -> bool {
        self.building_type == BuildingType::Skyscraper
    }

    /// Converts the entry into a factory descriptor placed at `position`.
    #[must_use]
    pub fn to_descriptor(&self, position: Vec3) -> StructureDescriptor {
        StructureDescriptor {
            building_type: Some(self.building_type),
            height: self.height,
            style: StructureStyle {
                primary: self.color.clone(),
                secondary: None,
            },
            ..StructureDescriptor::new(StructureCategory::Building, position, self.scale)
        }
    }
}

/// Mountain peak entry of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeakDescriptor {
    /// Placement position.
    pub position: Position,
    /// Base radius of the peak.
    #[serde(default = "default_peak_radius")]
    pub radius: f32,
    /// Summit height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

fn default_peak_radius() -> f32 {
    8.0
}

impl PeakDescriptor {
    /// Converts the entry into a factory descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> StructureDescriptor {
        StructureDescriptor {
            height: self.height,
            ..StructureDescriptor::new(
                StructureCategory::Peak,
                self.position.to_vec3(),
                self.radius,
            )
        }
    }
}

/// Street lamp entry of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreetLampDescriptor {
    /// Placement position.
    pub position: Position,
    /// Pole height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
}

impl StreetLampDescriptor {
    /// Converts the entry into a factory descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> StructureDescriptor {
        StructureDescriptor {
            height: self.height,
            ..StructureDescriptor::new(StructureCategory::StreetLamp, self.position.to_vec3(), 1.0)
        }
    }
}

/// Enemy entry of a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnemyDescriptor {
    /// Spawn position.
    pub position: Position,
    /// Starting health; the configured default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    /// Enemy archetype label.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl EnemyDescriptor {
    /// Converts the entry into a factory descriptor.
    #[must_use]
    pub fn to_descriptor(&self) -> StructureDescriptor {
        StructureDescriptor {
            health: self.health,
            style: StructureStyle {
                primary: self.kind.clone(),
                secondary: None,
            },
            ..StructureDescriptor::new(StructureCategory::Enemy, self.position.to_vec3(), 1.0)
        }
    }
}

/// Body of `POST /generate-world`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerateRequest {
    /// Natural-language description of the desired world.
    pub prompt: String,
}

/// Body of `PATCH /modify-world`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ModifyRequest {
    /// Natural-language edit command.
    pub command: String,
    /// Snapshot the edit applies to.
    pub current_world: WorldSnapshot,
    /// Player position as `[x, y, z]`.
    pub player_position: [f32; 3],
    /// Horizontal camera direction as `[x, y, z]`.
    pub player_direction: [f32; 3],
    /// Optional base64 screenshot of the current view.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}
