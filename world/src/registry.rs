//! Arena of placed structures keyed by registry-allocated identifiers.

use std::time::Duration;

use glam::Vec3;
use prompt_world_core::{
    BuildingType, ObstacleSnapshot, RenderHandle, StructureCategory, StructureId,
};

/// Combat state carried by enemy entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Vitals {
    /// Current health; the enemy is defeated at zero or below.
    pub health: i32,
    /// Health the enemy spawned with.
    pub max_health: i32,
    /// Time left on the hit flash.
    pub flash_remaining: Duration,
}

impl Vitals {
    /// Creates full-health vitals.
    #[must_use]
    pub const fn new(health: i32) -> Self {
        Self {
            health,
            max_health: health,
            flash_remaining: Duration::ZERO,
        }
    }

    /// Reports whether the hit flash is showing.
    #[must_use]
    pub fn is_flashing(&self) -> bool {
        !self.flash_remaining.is_zero()
    }
}

/// Registry entry: the render handle plus the footprint metadata collisions need.
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedStructure {
    /// Category tag used for removal selection.
    pub category: StructureCategory,
    /// Handle of the renderable object.
    pub render: RenderHandle,
    /// Base position, with `y` on the terrain.
    pub position: Vec3,
    /// Horizontal collision and occupancy radius.
    pub footprint_radius: f32,
    /// Height of the standable top above the base, zero when none.
    pub support_height: f32,
    /// Building kind, for buildings only.
    pub building_type: Option<BuildingType>,
    /// Combat state, for enemies only.
    pub vitals: Option<Vitals>,
}

impl PlacedStructure {
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

    /// Captures the collision-relevant fields of the entry.
    #[must_use]
    pub fn obstacle_snapshot(&self, id: StructureId) -> ObstacleSnapshot {
        ObstacleSnapshot {
            id,
            category: self.category,
            position: self.position,
            footprint_radius: self.footprint_radius,
            support_height: self.support_height,
        }
    }
}

/// Live collection of placed structures in insertion order.
#[derive(Clone, Debug, Default)]
pub struct StructureRegistry {
    entries: Vec<(StructureId, PlacedStructure)>,
    next_id: u32,
}

impl StructureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a structure and returns its identifier.
    pub fn add(&mut self, structure: PlacedStructure) -> StructureId {
        let id = StructureId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.push((id, structure));
        id
    }

    /// Removes the oldest entry satisfying the predicate.
    pub fn remove_first_matching<P>(
        &mut self,
        mut predicate: P,
    ) -> Option<(StructureId, PlacedStructure)>
    where
        P: FnMut(&PlacedStructure) -> bool,
    {
        let index = self
            .entries
            .iter()
            .position(|(_, structure)| predicate(structure))?;
        Some(self.entries.remove(index))
    }

    /// Removes the newest entry satisfying the predicate.
    pub fn remove_last_matching<P>(
        &mut self,
        mut predicate: P,
    ) -> Option<(StructureId, PlacedStructure)>
    where
        P: FnMut(&PlacedStructure) -> bool,
    {
        let index = self
            .entries
            .iter()
            .rposition(|(_, structure)| predicate(structure))?;
        Some(self.entries.remove(index))
    }

    /// Removes every entry satisfying the predicate, oldest first.
    pub fn remove_all_matching<P>(
        &mut self,
        mut predicate: P,
    ) -> Vec<(StructureId, PlacedStructure)>
    where
        P: FnMut(&PlacedStructure) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if predicate(&entry.1) {
                removed.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        removed
    }

    /// Removes the entry with the identifier.
    pub fn remove(&mut self, id: StructureId) -> Option<PlacedStructure> {
        let index = self.entries.iter().position(|(entry_id, _)| *entry_id == id)?;
        Some(self.entries.remove(index).1)
    }

    /// Iterates every entry in insertion order.
    pub fn all(&self) -> impl Iterator<Item = (StructureId, &PlacedStructure)> {
        self.entries.iter().map(|(id, structure)| (*id, structure))
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, id: StructureId) -> Option<&PlacedStructure> {
        self.entries
            .iter()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, structure)| structure)
    }

    /// Looks up an entry for mutation of its combat state.
    pub fn get_mut(&mut self, id: StructureId) -> Option<&mut PlacedStructure> {
        self.entries
            .iter_mut()
            .find(|(entry_id, _)| *entry_id == id)
            .map(|(_, structure)| structure)
    }

    /// Iterates mutable enemy vitals.
    pub fn vitals_mut(&mut self) -> impl Iterator<Item = &mut Vitals> {
        self.entries
            .iter_mut()
            .filter_map(|(_, structure)| structure.vitals.as_mut())
    }

    /// Number of entries of the category.
    #[must_use]
    pub fn count(&self, category: StructureCategory) -> usize {
        self.entries
            .iter()
            .filter(|(_, structure)| structure.category == category)
            .count()
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reports whether the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry, returning them oldest first.
    pub fn clear(&mut self) -> Vec<(StructureId, PlacedStructure)> {
        std::mem::take(&mut self.entries)
    }
}
