#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reconciliation system that turns a pair of world snapshots into commands.
//!
//! Snapshots carry no structure identities, so each category is diffed by
//! list length alone: shrinking lists remove live structures, growing lists
//! append the new suffix. Tree recolors are the single exception and replace
//! the whole category.

use std::cmp::Ordering;

use glam::Vec3;
use log::debug;
use prompt_world_core::{
    snapshot::{BuildingDescriptor, TreeDescriptor},
    BuildingSnapshot, BuildingType, Command, EngineConfig, MaskPolicy, PlacementConfig,
    StructureCategory, StructureSelector, WorldSnapshot,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Horizontal distance under which a building counts as standing on a slot.
const SLOT_TOLERANCE: f32 = 0.5;

/// Which end of the registry a shrinking category loses entries from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RemovalEnd {
    Oldest,
    Newest,
}

impl RemovalEnd {
    fn command(self, selector: StructureSelector) -> Command {
        match self {
            Self::Oldest => Command::RemoveFirstMatching { selector },
            Self::Newest => Command::RemoveLastMatching { selector },
        }
    }
}

/// Pure system that diffs snapshots and emits world commands.
#[derive(Debug)]
pub struct Reconciler {
    placement: PlacementConfig,
    half_extent: f32,
    slots: Vec<Vec3>,
    rng: ChaCha8Rng,
}

impl Reconciler {
    /// Creates a reconciler for the provided engine configuration.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        let placement = config.placement.clone();
        let slots = district_slots(&placement);
        Self {
            rng: ChaCha8Rng::seed_from_u64(placement.rng_seed),
            half_extent: config.terrain.half_extent(),
            placement,
            slots,
        }
    }

    /// Restarts the skyscraper sampler from the configured seed.
    pub fn reseed(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.placement.rng_seed);
    }

    /// District slot positions in allocation order.
    #[must_use]
    pub fn slots(&self) -> &[Vec3] {
        &self.slots
    }

    /// Emits the commands that move the live world from `previous` to `next`.
    ///
    /// `previous` is `None` on first generation and treated as empty.
    /// `buildings` is the live building view, used for slot allocation and
    /// skyscraper separation. Returns the number of building candidates the
    /// reconciler could not find room for.
    pub fn handle(
        &mut self,
        previous: Option<&WorldSnapshot>,
        next: &WorldSnapshot,
        buildings: &[BuildingSnapshot],
        out: &mut Vec<Command>,
    ) -> usize {
        let empty = WorldSnapshot::default();
        let previous = previous.unwrap_or(&empty);
        let old = &previous.structures;
        let new = &next.structures;
        let first = out.len();

        self.reconcile_trees(&old.trees, &new.trees, out);
        reconcile_counts(
            &old.rocks,
            &new.rocks,
            StructureSelector::Category(StructureCategory::Rock),
            RemovalEnd::Oldest,
            |rock| Command::PlaceStructure {
                descriptor: rock.to_descriptor(),
                mask: MaskPolicy::ClaimFootprint,
            },
            out,
        );
        let skipped = self.reconcile_buildings(
            &old.buildings,
            &new.buildings,
            next.is_city(),
            buildings,
            out,
        );
        reconcile_counts(
            &old.peaks,
            &new.peaks,
            StructureSelector::Category(StructureCategory::Peak),
            RemovalEnd::Oldest,
            |peak| Command::PlaceStructure {
                descriptor: peak.to_descriptor(),
                mask: MaskPolicy::ClaimFootprint,
            },
            out,
        );
        reconcile_counts(
            &old.street_lamps,
            &new.street_lamps,
            StructureSelector::Category(StructureCategory::StreetLamp),
            RemovalEnd::Oldest,
            |lamp| Command::PlaceStructure {
                descriptor: lamp.to_descriptor(),
                mask: MaskPolicy::ClaimFootprint,
            },
            out,
        );
        reconcile_counts(
            &previous.combat.enemies,
            &next.combat.enemies,
            StructureSelector::Category(StructureCategory::Enemy),
            RemovalEnd::Newest,
            |enemy| Command::PlaceStructure {
                descriptor: enemy.to_descriptor(),
                mask: MaskPolicy::Ignore,
            },
            out,
        );

        out.push(Command::SetEnvironment {
            environment: next.environment(),
        });
        out.push(Command::SetPhysics {
            overrides: next.physics.clone(),
        });

        debug!(
            "reconciled snapshot into {} commands ({} buildings without room)",
            out.len() - first,
            skipped
        );
        skipped
    }

    fn tree_clearance(&self, tree: &TreeDescriptor) -> f32 {
        self.placement.tree_clearance * tree.scale.max(0.0)
    }

    fn reconcile_trees(
        &self,
        old: &[TreeDescriptor],
        new: &[TreeDescriptor],
        out: &mut Vec<Command>,
    ) {
        if is_style_replace(old, new) {
            out.push(Command::RemoveAllMatching {
                selector: StructureSelector::Category(StructureCategory::Tree),
            });
            for tree in new {
                out.push(Command::PlaceStructure {
                    descriptor: tree.to_descriptor(),
                    mask: MaskPolicy::Claim(self.tree_clearance(tree)),
                });
            }
            return;
        }

        reconcile_counts(
            old,
            new,
            StructureSelector::Category(StructureCategory::Tree),
            RemovalEnd::Oldest,
            |tree| Command::PlaceStructure {
                descriptor: tree.to_descriptor(),
                mask: MaskPolicy::RequireFree(self.tree_clearance(tree)),
            },
            out,
        );
    }

    fn reconcile_buildings(
        &mut self,
        old: &[BuildingDescriptor],
        new: &[BuildingDescriptor],
        city: bool,
        live: &[BuildingSnapshot],
        out: &mut Vec<Command>,
    ) -> usize {
        let (old_towers, old_homes): (Vec<_>, Vec<_>) =
            old.iter().partition(|building| building.is_skyscraper());
        let (new_towers, new_homes): (Vec<_>, Vec<_>) =
            new.iter().partition(|building| building.is_skyscraper());

        let mut homes: Vec<Vec3> = live
            .iter()
            .filter(|building| building.building_type != BuildingType::Skyscraper)
            .map(|building| building.position)
            .collect();
        let mut towers: Vec<Vec3> = live
            .iter()
            .filter(|building| building.building_type == BuildingType::Skyscraper)
            .map(|building| building.position)
            .collect();

        let home_selector = StructureSelector::Building { skyscraper: false };
        for _ in new_homes.len()..old_homes.len() {
            out.push(RemovalEnd::Oldest.command(home_selector));
            if !homes.is_empty() {
                let _ = homes.remove(0);
            }
        }
        let tower_selector = StructureSelector::Building { skyscraper: true };
        for _ in new_towers.len()..old_towers.len() {
            out.push(RemovalEnd::Oldest.command(tower_selector));
            if !towers.is_empty() {
                let _ = towers.remove(0);
            }
        }

        let mut taken: Vec<Vec3> = homes.iter().chain(&towers).copied().collect();

        let mut skipped = 0;
        for home in new_homes.iter().skip(old_homes.len()) {
            match self.free_slot(&taken) {
                Some(slot) => {
                    out.push(place_building(home, slot));
                    taken.push(slot);
                }
                None => {
                    debug!("no district slot left for {:?}", home.building_type);
                    skipped += 1;
                }
            }
        }

        for tower in new_towers.iter().skip(old_towers.len()) {
            let site = if city {
                self.sample_tower_site(&towers)
            } else {
                self.free_slot(&taken)
            };
            match site {
                Some(site) => {
                    out.push(place_building(tower, site));
                    towers.push(site);
                    taken.push(site);
                }
                None => {
                    debug!("no site found for skyscraper");
                    skipped += 1;
                }
            }
        }
        skipped
    }

    /// First district slot that no live or just placed building stands on.
    fn free_slot(&self, taken: &[Vec3]) -> Option<Vec3> {
        self.slots.iter().copied().find(|slot| {
            taken
                .iter()
                .all(|building| horizontal_distance(*building, slot.x, slot.z) >= SLOT_TOLERANCE)
        })
    }

    /// Rejection-samples a skyscraper site clear of every district slot and tower.
    fn sample_tower_site(&mut self, towers: &[Vec3]) -> Option<Vec3> {
        let spread = self.half_extent * self.placement.skyscraper_spread;
        if !(spread > 0.0) {
            return None;
        }
        let separation = self.placement.skyscraper_separation;

        for _ in 0..self.placement.skyscraper_attempts {
            let x = self.rng.gen_range(-spread..spread);
            let z = self.rng.gen_range(-spread..spread);
            let clear = self
                .slots
                .iter()
                .chain(towers)
                .all(|other| horizontal_distance(*other, x, z) >= separation);
            if clear {
                return Some(Vec3::new(x, 0.0, z));
            }
        }
        None
    }
}

/// Reports whether a tree list should be recreated wholesale.
fn is_style_replace(old: &[TreeDescriptor], new: &[TreeDescriptor]) -> bool {
    !old.is_empty() && new.len() == old.len() && new.iter().all(TreeDescriptor::has_style)
}

fn reconcile_counts<T>(
    old: &[T],
    new: &[T],
    selector: StructureSelector,
    end: RemovalEnd,
    mut place: impl FnMut(&T) -> Command,
    out: &mut Vec<Command>,
) {
    match new.len().cmp(&old.len()) {
        Ordering::Less => {
            for _ in new.len()..old.len() {
                out.push(end.command(selector));
            }
        }
        Ordering::Greater => {
            for descriptor in &new[old.len()..] {
                out.push(place(descriptor));
            }
        }
        Ordering::Equal => {}
    }
}

fn place_building(building: &BuildingDescriptor, site: Vec3) -> Command {
    Command::PlaceStructure {
        descriptor: building.to_descriptor(site),
        mask: MaskPolicy::ClaimFootprint,
    }
}

fn district_slots(placement: &PlacementConfig) -> Vec<Vec3> {
    let mut slots = Vec::new();
    for origin in &placement.districts {
        for row in 0..placement.district_rows {
            for column in 0..placement.district_columns {
                slots.push(Vec3::new(
                    origin[0] + column as f32 * placement.district_spacing,
                    0.0,
                    origin[1] + row as f32 * placement.district_spacing,
                ));
            }
        }
    }
    slots
}

fn horizontal_distance(point: Vec3, x: f32, z: f32) -> f32 {
    let dx = point.x - x;
    let dz = point.z - z;
    (dx * dx + dz * dz).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prompt_world_core::StructureId;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> WorldSnapshot {
        WorldSnapshot::from_value(value).expect("snapshot parses")
    }

    fn trees(count: usize, styled: bool) -> serde_json::Value {
        let list: Vec<_> = (0..count)
            .map(|index| {
                let mut tree = json!({ "position": [index as f32 * 10.0, 0.0] });
                if styled {
                    tree["leaf_color"] = json!("#ff8800");
                }
                tree
            })
            .collect();
        json!({ "world": {}, "structures": { "trees": list } })
    }

    fn structural(commands: &[Command]) -> Vec<&Command> {
        commands
            .iter()
            .filter(|command| {
                !matches!(
                    command,
                    Command::SetEnvironment { .. } | Command::SetPhysics { .. }
                )
            })
            .collect()
    }

    #[test]
    fn district_slots_follow_configured_grid() {
        let reconciler = Reconciler::new(&EngineConfig::default());
        let placement = PlacementConfig::default();
        let expected = placement.districts.len()
            * placement.district_rows as usize
            * placement.district_columns as usize;

        assert_eq!(reconciler.slots().len(), expected);
        assert_eq!(reconciler.slots()[0], Vec3::new(-40.0, 0.0, -40.0));
        assert_eq!(reconciler.slots()[1], Vec3::new(-28.0, 0.0, -40.0));
    }

    #[test]
    fn unchanged_snapshot_only_reapplies_environment() {
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let world = snapshot(trees(3, false));
        let mut out = Vec::new();

        let skipped = reconciler.handle(Some(&world), &world, &[], &mut out);

        assert_eq!(skipped, 0);
        assert!(structural(&out).is_empty());
        assert!(matches!(out.last(), Some(Command::SetPhysics { overrides: None })));
    }

    #[test]
    fn style_replace_requires_equal_nonzero_counts() {
        let plain = snapshot(trees(2, false));
        let styled = snapshot(trees(2, true));
        let more = snapshot(trees(3, true));

        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let mut out = Vec::new();
        let _ = reconciler.handle(Some(&plain), &styled, &[], &mut out);
        assert!(matches!(
            structural(&out)[0],
            Command::RemoveAllMatching { .. }
        ));
        assert_eq!(structural(&out).len(), 3);

        out.clear();
        let _ = reconciler.handle(Some(&plain), &more, &[], &mut out);
        let commands = structural(&out);
        assert_eq!(commands.len(), 1);
        assert!(matches!(
            commands[0],
            Command::PlaceStructure {
                mask: MaskPolicy::RequireFree(_),
                ..
            }
        ));

        out.clear();
        let _ = reconciler.handle(None, &styled, &[], &mut out);
        assert!(structural(&out)
            .iter()
            .all(|command| matches!(command, Command::PlaceStructure { .. })));
    }

    #[test]
    fn enemies_shrink_from_the_tail() {
        let old = snapshot(json!({
            "world": {},
            "combat": { "enemies": [{ "position": [0, 0] }, { "position": [5, 5] }] }
        }));
        let new = snapshot(json!({ "world": {} }));
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let mut out = Vec::new();

        let _ = reconciler.handle(Some(&old), &new, &[], &mut out);

        let selector = StructureSelector::Category(StructureCategory::Enemy);
        assert_eq!(
            structural(&out),
            vec![
                &Command::RemoveLastMatching { selector },
                &Command::RemoveLastMatching { selector }
            ]
        );
    }

    #[test]
    fn houses_continue_after_live_buildings() {
        let old = snapshot(json!({ "world": {}, "structures": { "buildings": [{}] } }));
        let new = snapshot(json!({
            "world": {},
            "structures": { "buildings": [{}, { "type": "igloo" }] }
        }));
        let live = [BuildingSnapshot {
            id: StructureId::new(0),
            building_type: BuildingType::House,
            position: Vec3::new(-40.0, 0.0, -40.0),
        }];
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let mut out = Vec::new();

        let _ = reconciler.handle(Some(&old), &new, &live, &mut out);

        let Command::PlaceStructure { descriptor, .. } = structural(&out)[0] else {
            panic!("expected a placement");
        };
        assert_eq!(descriptor.building_type, Some(BuildingType::Igloo));
        assert_eq!(descriptor.position, reconciler.slots()[1]);
    }

    #[test]
    fn regrown_houses_reuse_the_vacated_slot() {
        let reconciler_slots = Reconciler::new(&EngineConfig::default()).slots().to_vec();
        let house = |id: u32, slot: usize| BuildingSnapshot {
            id: StructureId::new(id),
            building_type: BuildingType::House,
            position: reconciler_slots[slot],
        };
        let three = snapshot(json!({
            "world": {},
            "structures": { "buildings": [{}, {}, {}] }
        }));
        let two = snapshot(json!({ "world": {}, "structures": { "buildings": [{}, {}] } }));
        let mut reconciler = Reconciler::new(&EngineConfig::default());

        let mut shrink = Vec::new();
        let _ = reconciler.handle(
            Some(&three),
            &two,
            &[house(0, 0), house(1, 1), house(2, 2)],
            &mut shrink,
        );
        assert_eq!(
            structural(&shrink),
            vec![&Command::RemoveFirstMatching {
                selector: StructureSelector::Building { skyscraper: false }
            }]
        );

        let mut grow = Vec::new();
        let _ = reconciler.handle(Some(&two), &three, &[house(1, 1), house(2, 2)], &mut grow);

        let Command::PlaceStructure { descriptor, .. } = structural(&grow)[0] else {
            panic!("expected a placement");
        };
        assert_eq!(descriptor.position, reconciler_slots[0]);
    }

    #[test]
    fn houses_beyond_the_last_slot_are_skipped() {
        let mut config = EngineConfig::default();
        config.placement.districts = vec![[0.0, 0.0]];
        config.placement.district_rows = 1;
        config.placement.district_columns = 2;
        let new = snapshot(json!({
            "world": {},
            "structures": { "buildings": [{}, {}, {}] }
        }));
        let mut reconciler = Reconciler::new(&config);
        let mut out = Vec::new();

        let skipped = reconciler.handle(None, &new, &[], &mut out);

        assert_eq!(skipped, 1);
        assert_eq!(structural(&out).len(), 2);
    }

    #[test]
    fn city_skyscrapers_keep_their_distance() {
        let new = snapshot(json!({
            "world": { "biome": "city" },
            "structures": { "buildings": [
                { "type": "skyscraper" },
                { "type": "skyscraper" },
                { "type": "skyscraper" }
            ] }
        }));
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let separation = PlacementConfig::default().skyscraper_separation;
        let mut out = Vec::new();

        let _ = reconciler.handle(None, &new, &[], &mut out);

        let sites: Vec<Vec3> = structural(&out)
            .iter()
            .filter_map(|command| match command {
                Command::PlaceStructure { descriptor, .. } => Some(descriptor.position),
                _ => None,
            })
            .collect();
        for (index, site) in sites.iter().enumerate() {
            for slot in reconciler.slots() {
                assert!(horizontal_distance(*slot, site.x, site.z) >= separation);
            }
            for other in &sites[index + 1..] {
                assert!(horizontal_distance(*other, site.x, site.z) >= separation);
            }
        }
    }

    #[test]
    fn skyscraper_sampling_is_reproducible() {
        let new = snapshot(json!({
            "world": { "biome": "city" },
            "structures": { "buildings": [{ "type": "skyscraper" }] }
        }));
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let mut first = Vec::new();
        let mut second = Vec::new();

        let _ = reconciler.handle(None, &new, &[], &mut first);
        reconciler.reseed();
        let _ = reconciler.handle(None, &new, &[], &mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn skyscrapers_outside_cities_take_slots() {
        let new = snapshot(json!({
            "world": { "biome": "forest" },
            "structures": { "buildings": [{}, { "type": "skyscraper" }] }
        }));
        let mut reconciler = Reconciler::new(&EngineConfig::default());
        let mut out = Vec::new();

        let _ = reconciler.handle(None, &new, &[], &mut out);

        let positions: Vec<Vec3> = structural(&out)
            .iter()
            .filter_map(|command| match command {
                Command::PlaceStructure { descriptor, .. } => Some(descriptor.position),
                _ => None,
            })
            .collect();
        assert_eq!(positions, reconciler.slots()[..2].to_vec());
    }
}
