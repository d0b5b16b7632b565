#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that resolves player attacks against enemies.

use glam::Vec3;
use prompt_world_core::{CombatConfig, Command, EnemySnapshot, PhysicsParams, PlayerState};

/// Axis-aligned bounding box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Box standing on `feet` with the given horizontal half width and height.
    #[must_use]
    pub fn standing(feet: Vec3, half_width: f32, height: f32) -> Self {
        let half_width = half_width.max(0.0);
        Self {
            min: Vec3::new(feet.x - half_width, feet.y, feet.z - half_width),
            max: Vec3::new(feet.x + half_width, feet.y + height.max(0.0), feet.z + half_width),
        }
    }

    /// Reports whether the boxes overlap; touching faces count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }
}

/// Combat system that queues damage and cleanup commands.
#[derive(Debug, Default)]
pub struct Combat {
    scratch: Vec<Command>,
}

impl Combat {
    /// Creates a new combat system with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits `Command::DamageEnemy` for every enemy the attacking player
    /// overlaps and `Command::DespawnEnemy` for enemies already out of health.
    ///
    /// The player attacks while dashing or after spending the double jump.
    /// Every overlapping frame deals damage; the hit flash is cosmetic.
    pub fn handle(
        &mut self,
        player: &PlayerState,
        physics: &PhysicsParams,
        config: &CombatConfig,
        enemies: &[EnemySnapshot],
        out: &mut Vec<Command>,
    ) {
        if enemies.is_empty() {
            return;
        }

        self.scratch.clear();

        let attacking = player.motion.dashing || player.motion.is_jump_attacking();
        let reach = Aabb::standing(player.position, physics.player_radius, physics.player_height);

        for enemy in enemies {
            if enemy.health <= 0 {
                self.scratch.push(Command::DespawnEnemy { enemy: enemy.id });
                continue;
            }
            if !attacking {
                continue;
            }
            let body = Aabb::standing(enemy.position, config.enemy_half_width, config.enemy_height);
            if reach.intersects(&body) {
                self.scratch.push(Command::DamageEnemy {
                    enemy: enemy.id,
                    amount: config.damage,
                });
            }
        }

        if self.scratch.is_empty() {
            return;
        }

        out.reserve(self.scratch.len());
        out.append(&mut self.scratch);
    }
}
