//! Seam to the geometry collaborator that turns descriptors into renderables.

use prompt_world_core::{
    BuildingType, BuiltStructure, RenderHandle, StructureCategory, StructureDescriptor,
};

/// Builds renderable structures and reports their footprint metadata.
///
/// Implementations own the meshes; the world only keeps the returned handle
/// alongside the footprint radius and support height.
pub trait StructureFactory {
    /// Builds the structure described by `descriptor`.
    fn build(&mut self, descriptor: &StructureDescriptor) -> BuiltStructure;
}

impl<F: StructureFactory + ?Sized> StructureFactory for &mut F {
    fn build(&mut self, descriptor: &StructureDescriptor) -> BuiltStructure {
        (**self).build(descriptor)
    }
}

/// Factory that produces no geometry, only deterministic footprints.
///
/// Used by the command-line driver and by tests.
#[derive(Clone, Debug, Default)]
pub struct HeadlessFactory {
    next_handle: u64,
    built: usize,
}

impl HeadlessFactory {
    /// Creates a factory whose first handle is zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of structures built so far.
    #[must_use]
    pub const fn built(&self) -> usize {
        self.built
    }
}

impl StructureFactory for HeadlessFactory {
    fn build(&mut self, descriptor: &StructureDescriptor) -> BuiltStructure {
        let render = RenderHandle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.built += 1;

        let (footprint_radius, support_height) = footprint(descriptor);
        BuiltStructure {
            render,
            footprint_radius,
            support_height,
        }
    }
}

fn footprint(descriptor: &StructureDescriptor) -> (f32, f32) {
    let scale = descriptor.scale.max(0.0);
    match descriptor.category {
        StructureCategory::Tree => (1.2 * scale, 0.0),
        StructureCategory::Rock => (1.0 * scale, 0.0),
        StructureCategory::Peak => (scale, 0.0),
        StructureCategory::StreetLamp => (0.3, 0.0),
        StructureCategory::Enemy => (0.5, 0.0),
        StructureCategory::Building => match descriptor.building_type.unwrap_or_default() {
            BuildingType::House => (4.0 * scale, descriptor.height.unwrap_or(5.0 * scale)),
            BuildingType::Igloo => (3.0 * scale, descriptor.height.unwrap_or(2.5 * scale)),
            BuildingType::Skyscraper => (6.0 * scale, descriptor.height.unwrap_or(30.0 * scale)),
        },
    }
}
