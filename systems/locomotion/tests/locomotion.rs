use std::time::Duration;

use glam::Vec3;
use prompt_world_core::{
    BuildingType, Command, EngineConfig, Event, MaskPolicy, StructureCategory, StructureDescriptor,
};
use prompt_world_system_locomotion::{Locomotion, LocomotionInput, OrbitCamera};
use prompt_world_world::{self as world, query, HeadlessFactory, World};

const FRAME: Duration = Duration::from_millis(16);

struct Scene {
    world: World,
    factory: HeadlessFactory,
    locomotion: Locomotion,
    camera: OrbitCamera,
}

impl Scene {
    fn new(heightmap: Vec<Vec<f32>>) -> Self {
        let mut scene = Self {
            world: World::new(&EngineConfig::default()),
            factory: HeadlessFactory::new(),
            locomotion: Locomotion::new(),
            camera: OrbitCamera::default(),
        };
        let _ = scene.apply(Command::ResetWorld { heightmap });
        scene
    }

    fn apply(&mut self, command: Command) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, command, &mut self.factory, &mut events);
        events
    }

    fn place(&mut self, mut descriptor: StructureDescriptor, building_type: Option<BuildingType>) {
        descriptor.building_type = building_type;
        let _ = self.apply(Command::PlaceStructure {
            descriptor,
            mask: MaskPolicy::ClaimFootprint,
        });
    }

    fn run(&mut self, input: LocomotionInput, frames: usize) {
        for _ in 0..frames {
            let input = LocomotionInput {
                camera_forward: self.camera.forward(),
                ..input
            };
            let physics = query::physics(&self.world);
            let obstacles = query::obstacle_view(&self.world);
            let player = query::player(&self.world);
            let mut commands = Vec::new();
            {
                let world = &self.world;
                self.locomotion.handle(
                    player,
                    &input,
                    FRAME,
                    &physics,
                    |x, z| query::ground_height(world, x, z),
                    &obstacles,
                    &mut commands,
                );
            }
            for command in commands {
                let _ = self.apply(command);
            }
            self.camera
                .follow(query::player(&self.world).position, FRAME.as_secs_f32());
        }
    }
}

fn walk_forward() -> LocomotionInput {
    LocomotionInput {
        forward: true,
        ..LocomotionInput::default()
    }
}

#[test]
fn player_follows_terrain_height() {
    let mut scene = Scene::new(vec![
        vec![0.0, 0.0, 0.0],
        vec![0.5, 0.5, 0.5],
        vec![0.5, 0.5, 0.5],
    ]);
    let _ = scene.apply(Command::SpawnPlayer { x: 0.0, z: -50.0 });
    assert_eq!(query::player(&scene.world).position.y, 0.0);

    let backward = LocomotionInput {
        backward: true,
        ..LocomotionInput::default()
    };
    scene.run(backward, 60 * 10);

    let player = query::player(&scene.world);
    assert!(player.position.z > 0.0);
    assert_eq!(player.position.y, 6.0);
    assert!(player.motion.grounded);
}

#[test]
fn trees_stop_the_player() {
    let mut scene = Scene::new(Vec::new());
    scene.place(
        StructureDescriptor::new(StructureCategory::Tree, Vec3::new(0.0, 0.0, -5.0), 1.0),
        None,
    );
    let _ = scene.apply(Command::SpawnPlayer { x: 0.0, z: 0.0 });

    scene.run(walk_forward(), 120);

    let player = query::player(&scene.world);
    let clearance = 1.2 + query::physics(&scene.world).player_radius;
    assert!(player.position.z >= -5.0 + clearance - 1e-4);
    assert!(player.position.z < -5.0 + clearance + 0.2);
}

#[test]
fn roofs_carry_a_spawned_player() {
    let mut scene = Scene::new(Vec::new());
    scene.place(
        StructureDescriptor::new(StructureCategory::Building, Vec3::new(0.0, 0.0, 0.0), 1.0),
        Some(BuildingType::House),
    );
    let _ = scene.apply(Command::SpawnPlayer { x: 0.0, z: 1.0 });
    assert_eq!(query::player(&scene.world).position.y, 5.0);

    scene.run(walk_forward(), 20);
    let on_roof = query::player(&scene.world);
    assert_eq!(on_roof.position.y, 5.0);
    assert!(on_roof.motion.grounded);

    scene.run(walk_forward(), 60);
    let below = query::player(&scene.world);
    assert!(below.position.z < -4.0);
    assert_eq!(below.position.y, 0.0);

    // Below the roof line the wall blocks every step that stays within reach.
    let reach = 4.0 + query::physics(&scene.world).player_radius;
    assert!(below.position.z > -reach);
}

#[test]
fn enemies_do_not_block_the_path() {
    let mut scene = Scene::new(Vec::new());
    scene.place(
        StructureDescriptor::new(StructureCategory::Enemy, Vec3::new(0.0, 0.0, -2.0), 1.0),
        None,
    );
    let _ = scene.apply(Command::SpawnPlayer { x: 0.0, z: 0.0 });

    scene.run(walk_forward(), 60);

    assert!(query::player(&scene.world).position.z < -4.0);
}
