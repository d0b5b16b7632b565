#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Prompt World.
//!
//! The [`World`] is the explicit context object that owns the terrain, the
//! placement mask, the structure registry and the player. It only changes
//! through [`apply`], which executes one [`Command`] and reports the outcome
//! as [`Event`] values. Systems read it through the [`query`] module.

use std::time::Duration;

use glam::Vec3;
use log::{debug, warn};
use prompt_world_core::{
    CombatConfig, Command, EngineConfig, Environment, Event, MaskPolicy, PhysicsParams,
    PlayerState, StructureCategory, StructureDescriptor, StructureId, StructureSelector,
    TerrainConfig,
};

pub mod factory;
pub mod heightfield;
pub mod occupancy;
pub mod registry;

pub use factory::{HeadlessFactory, StructureFactory};
pub use heightfield::{HeightField, TerrainError};
pub use occupancy::OccupancyMask;
pub use registry::{PlacedStructure, StructureRegistry, Vitals};

/// Represents the authoritative Prompt World state.
#[derive(Debug)]
pub struct World {
    terrain: TerrainConfig,
    base_physics: PhysicsParams,
    physics: PhysicsParams,
    combat: CombatConfig,
    heightfield: Option<HeightField>,
    mask: OccupancyMask,
    registry: StructureRegistry,
    player: PlayerState,
    environment: Environment,
    tick_index: u64,
}

impl World {
    /// Creates an empty world with flat ground and no structures.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            terrain: config.terrain.clone(),
            base_physics: config.physics,
            physics: config.physics,
            combat: config.combat.clone(),
            heightfield: None,
            mask: OccupancyMask::new(config.terrain.mask_size, config.terrain.world_extent),
            registry: StructureRegistry::new(),
            player: PlayerState::default(),
            environment: Environment::default(),
            tick_index: 0,
        }
    }

    fn ground_height(&self, x: f32, z: f32) -> f32 {
        self.heightfield
            .as_ref()
            .map_or(0.0, |field| field.sample(x, z))
    }

    fn surface_height(&self, x: f32, z: f32) -> f32 {
        self.registry
            .all()
            .filter(|(_, structure)| {
                structure.offers_support()
                    && structure.horizontal_distance(x, z) <= structure.footprint_radius
            })
            .map(|(_, structure)| structure.top())
            .fold(self.ground_height(x, z), f32::max)
    }

    fn enemy_count(&self) -> usize {
        self.registry.count(StructureCategory::Enemy)
    }

    fn reset(&mut self, heightmap: &[Vec<f32>], out_events: &mut Vec<Event>) {
        for (id, structure) in self.registry.clear() {
            out_events.push(Event::StructureRemoved {
                id,
                category: structure.category,
                render: structure.render,
            });
        }
        self.mask.clear();
        self.heightfield = if heightmap.is_empty() {
            None
        } else {
            match HeightField::from_rows(
                heightmap,
                self.terrain.half_extent(),
                self.terrain.vertical_scale,
            ) {
                Ok(field) => Some(field),
                Err(error) => {
                    warn!("ignoring terrain grid: {error}");
                    None
                }
            }
        };
        self.player = PlayerState::default();
        self.physics = self.base_physics;
        self.environment = Environment::default();
        out_events.push(Event::WorldReset {
            terrain_loaded: self.heightfield.is_some(),
        });
    }

    fn place<F>(
        &mut self,
        mut descriptor: StructureDescriptor,
        mask: MaskPolicy,
        factory: &mut F,
        out_events: &mut Vec<Event>,
    ) where
        F: StructureFactory + ?Sized,
    {
        let category = descriptor.category;
        let x = descriptor.position.x;
        let z = descriptor.position.z;

        if let MaskPolicy::RequireFree(radius) = mask {
            if !self.mask.is_region_free(x, z, radius) {
                debug!("{} at ({x:.1}, {z:.1}) rejected: region occupied", category.label());
                out_events.push(Event::PlacementRejected { category, x, z });
                return;
            }
        }

        descriptor.position.y = self.ground_height(x, z);
        let built = factory.build(&descriptor);

        match mask {
            MaskPolicy::RequireFree(radius) | MaskPolicy::Claim(radius) => {
                self.mask.occupy(x, z, radius);
            }
            MaskPolicy::ClaimFootprint => self.mask.occupy(x, z, built.footprint_radius),
            MaskPolicy::Ignore => {}
        }

        let vitals = (category == StructureCategory::Enemy)
            .then(|| Vitals::new(descriptor.health.unwrap_or(self.combat.enemy_health)));
        let id = self.registry.add(PlacedStructure {
            category,
            render: built.render,
            position: descriptor.position,
            footprint_radius: built.footprint_radius,
            support_height: built.support_height,
            building_type: descriptor.building_type,
            vitals,
        });

        out_events.push(Event::StructurePlaced {
            id,
            category,
            render: built.render,
        });
    }

    fn remove(
        &mut self,
        removal: Removal,
        selector: StructureSelector,
        out_events: &mut Vec<Event>,
    ) {
        let predicate = |structure: &PlacedStructure| {
            selector.matches(structure.category, structure.building_type)
        };
        let removed: Vec<_> = match removal {
            Removal::First => self.registry.remove_first_matching(predicate).into_iter().collect(),
            Removal::Last => self.registry.remove_last_matching(predicate).into_iter().collect(),
            Removal::All => self.registry.remove_all_matching(predicate),
        };

        if removed.is_empty() {
            debug!("removal of {selector:?} matched nothing");
            out_events.push(Event::RemovalSkipped { selector });
            return;
        }

        for (id, structure) in removed {
            out_events.push(Event::StructureRemoved {
                id,
                category: structure.category,
                render: structure.render,
            });
        }
    }

    fn damage_enemy(&mut self, enemy: StructureId, amount: i32, out_events: &mut Vec<Event>) {
        let flash = seconds(self.combat.flash_duration);
        let Some(vitals) = self
            .registry
            .get_mut(enemy)
            .and_then(|structure| structure.vitals.as_mut())
        else {
            return;
        };
        if vitals.health <= 0 {
            return;
        }

        vitals.health -= amount;
        vitals.flash_remaining = flash;
        let health = vitals.health;
        out_events.push(Event::EnemyDamaged { enemy, health });

        if health <= 0 {
            self.defeat_enemy(enemy, out_events);
        }
    }

    fn despawn_enemy(&mut self, enemy: StructureId, out_events: &mut Vec<Event>) {
        let exhausted = self
            .registry
            .get(enemy)
            .and_then(|structure| structure.vitals)
            .map_or(false, |vitals| vitals.health <= 0);
        if exhausted {
            self.defeat_enemy(enemy, out_events);
        }
    }

    fn defeat_enemy(&mut self, enemy: StructureId, out_events: &mut Vec<Event>) {
        if let Some(structure) = self.registry.remove(enemy) {
            out_events.push(Event::EnemyDefeated {
                enemy,
                render: structure.render,
                remaining: self.enemy_count(),
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[derive(Clone, Copy, Debug)]
enum Removal {
    First,
    Last,
    All,
}

/// Applies the provided command to the world, mutating state deterministically.
///
/// Placement commands build their structure through `factory`; every other
/// command ignores it.
pub fn apply<F>(world: &mut World, command: Command, factory: &mut F, out_events: &mut Vec<Event>)
where
    F: StructureFactory + ?Sized,
{
    match command {
        Command::ResetWorld { heightmap } => world.reset(&heightmap, out_events),
        Command::PlaceStructure { descriptor, mask } => {
            world.place(descriptor, mask, factory, out_events);
        }
        Command::RemoveFirstMatching { selector } => {
            world.remove(Removal::First, selector, out_events);
        }
        Command::RemoveLastMatching { selector } => {
            world.remove(Removal::Last, selector, out_events);
        }
        Command::RemoveAllMatching { selector } => {
            world.remove(Removal::All, selector, out_events);
        }
        Command::SetEnvironment { environment } => {
            out_events.push(Event::EnvironmentChanged {
                biome: environment.biome.clone(),
            });
            world.environment = environment;
        }
        Command::SetPhysics { overrides } => {
            world.physics = world.base_physics.merged(overrides.as_ref());
            out_events.push(Event::PhysicsChanged {
                params: world.physics,
            });
        }
        Command::SpawnPlayer { x, z } => {
            let position = Vec3::new(x, world.surface_height(x, z), z);
            world.player = PlayerState {
                position,
                ..PlayerState::default()
            };
            out_events.push(Event::PlayerSpawned { position });
        }
        Command::UpdatePlayer { state } => world.player = state,
        Command::DamageEnemy { enemy, amount } => world.damage_enemy(enemy, amount, out_events),
        Command::DespawnEnemy { enemy } => world.despawn_enemy(enemy, out_events),
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            for vitals in world.registry.vitals_mut() {
                vitals.flash_remaining = vitals.flash_remaining.saturating_sub(dt);
            }
            out_events.push(Event::TimeAdvanced { dt });
        }
    }
}

fn seconds(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f32(value)
    } else {
        Duration::ZERO
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use prompt_world_core::{
        BuildingSnapshot, BuildingType, CombatConfig, EnemySnapshot, Environment,
        ObstacleSnapshot, PhysicsParams, PlayerState, StructureCategory,
    };

    use super::{HeightField, OccupancyMask, StructureRegistry, World};

    /// Terrain elevation at `(x, z)`; ground level zero when no terrain is loaded.
    #[must_use]
    pub fn ground_height(world: &World, x: f32, z: f32) -> f32 {
        world.ground_height(x, z)
    }

    /// Standable elevation at `(x, z)`: terrain raised to any supporting roof overhead.
    #[must_use]
    pub fn surface_height(world: &World, x: f32, z: f32) -> f32 {
        world.surface_height(x, z)
    }

    /// Provides read-only access to the loaded height field, if any.
    #[must_use]
    pub fn heightfield(world: &World) -> Option<&HeightField> {
        world.heightfield.as_ref()
    }

    /// Provides read-only access to the placement mask.
    #[must_use]
    pub fn occupancy(world: &World) -> &OccupancyMask {
        &world.mask
    }

    /// Provides read-only access to the structure registry.
    #[must_use]
    pub fn registry(world: &World) -> &StructureRegistry {
        &world.registry
    }

    /// Number of live structures of the category.
    #[must_use]
    pub fn count(world: &World, category: StructureCategory) -> usize {
        world.registry.count(category)
    }

    /// Number of live enemies.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemy_count()
    }

    /// Current kinematic state of the player.
    #[must_use]
    pub fn player(world: &World) -> PlayerState {
        world.player
    }

    /// Locomotion constants currently in effect.
    #[must_use]
    pub fn physics(world: &World) -> PhysicsParams {
        world.physics
    }

    /// Combat tuning.
    #[must_use]
    pub fn combat(world: &World) -> &CombatConfig {
        &world.combat
    }

    /// Environment metadata from the latest snapshot.
    #[must_use]
    pub fn environment(world: &World) -> &Environment {
        &world.environment
    }

    /// Number of ticks applied since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Captures every structure that blocks or supports the player.
    #[must_use]
    pub fn obstacle_view(world: &World) -> Vec<ObstacleSnapshot> {
        world
            .registry
            .all()
            .filter(|(_, structure)| structure.category.is_obstacle())
            .map(|(id, structure)| structure.obstacle_snapshot(id))
            .collect()
    }

    /// Captures every live enemy in spawn order.
    #[must_use]
    pub fn enemy_view(world: &World) -> Vec<EnemySnapshot> {
        world
            .registry
            .all()
            .filter_map(|(id, structure)| {
                let vitals = structure.vitals?;
                Some(EnemySnapshot {
                    id,
                    position: structure.position,
                    health: vitals.health,
                    max_health: vitals.max_health,
                    flashing: vitals.is_flashing(),
                })
            })
            .collect()
    }

    /// Captures every live building in placement order.
    #[must_use]
    pub fn building_view(world: &World) -> Vec<BuildingSnapshot> {
        world
            .registry
            .all()
            .filter(|(_, structure)| structure.category == StructureCategory::Building)
            .map(|(id, structure)| BuildingSnapshot {
                id,
                building_type: structure.building_type.unwrap_or(BuildingType::House),
                position: structure.position,
            })
            .collect()
    }
}
