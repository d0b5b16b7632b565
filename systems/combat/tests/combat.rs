use std::time::Duration;

use glam::Vec3;
use prompt_world_core::{
    Command, EngineConfig, Event, MaskPolicy, MotionState, PlayerState, StructureCategory,
    StructureDescriptor,
};
use prompt_world_system_combat::Combat;
use prompt_world_world::{self as world, query, HeadlessFactory, World};

fn spawn_enemy(world: &mut World, factory: &mut HeadlessFactory, x: f32, z: f32) {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::PlaceStructure {
            descriptor: StructureDescriptor::new(
                StructureCategory::Enemy,
                Vec3::new(x, 0.0, z),
                1.0,
            ),
            mask: MaskPolicy::Ignore,
        },
        factory,
        &mut events,
    );
}

fn dashing_at(position: Vec3) -> PlayerState {
    PlayerState {
        position,
        velocity: Vec3::ZERO,
        motion: MotionState {
            dashing: true,
            dash_time_remaining: 0.2,
            ..MotionState::default()
        },
    }
}

fn combat_frame(
    world: &mut World,
    factory: &mut HeadlessFactory,
    combat: &mut Combat,
    dt: Duration,
) -> Vec<Event> {
    let mut commands = Vec::new();
    combat.handle(
        &query::player(world),
        &query::physics(world),
        query::combat(world),
        &query::enemy_view(world),
        &mut commands,
    );
    commands.push(Command::Tick { dt });

    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, factory, &mut events);
    }
    events
}

#[test]
fn three_dash_hits_defeat_an_enemy() {
    let mut world = World::new(&EngineConfig::default());
    let mut factory = HeadlessFactory::new();
    let mut combat = Combat::new();
    spawn_enemy(&mut world, &mut factory, 0.0, 0.0);
    spawn_enemy(&mut world, &mut factory, 30.0, 30.0);
    assert_eq!(query::enemy_count(&world), 2);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::UpdatePlayer {
            state: dashing_at(Vec3::new(0.5, 0.0, 0.0)),
        },
        &mut factory,
        &mut events,
    );

    let flash = Duration::from_secs_f32(query::combat(&world).flash_duration);
    let mut log = Vec::new();
    for _ in 0..3 {
        log.extend(combat_frame(
            &mut world,
            &mut factory,
            &mut combat,
            flash + Duration::from_millis(10),
        ));
    }

    let damaged: Vec<i32> = log
        .iter()
        .filter_map(|event| match event {
            Event::EnemyDamaged { health, .. } => Some(*health),
            _ => None,
        })
        .collect();
    assert_eq!(damaged, vec![2, 1, 0]);
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::EnemyDefeated { remaining: 1, .. })));
    assert_eq!(query::enemy_count(&world), 1);
}

#[test]
fn every_overlapping_frame_deals_damage() {
    let mut world = World::new(&EngineConfig::default());
    let mut factory = HeadlessFactory::new();
    let mut combat = Combat::new();
    spawn_enemy(&mut world, &mut factory, 0.0, 0.0);

    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::UpdatePlayer {
            state: dashing_at(Vec3::ZERO),
        },
        &mut factory,
        &mut events,
    );

    let frame = Duration::from_millis(16);
    let mut log = Vec::new();
    for _ in 0..3 {
        log.extend(combat_frame(&mut world, &mut factory, &mut combat, frame));
    }

    let hits = log
        .iter()
        .filter(|event| matches!(event, Event::EnemyDamaged { .. }))
        .count();
    assert_eq!(hits, 3);
    assert!(log
        .iter()
        .any(|event| matches!(event, Event::EnemyDefeated { remaining: 0, .. })));
    assert_eq!(query::enemy_count(&world), 0);
}

#[test]
fn grounded_players_can_touch_enemies_safely() {
    let mut world = World::new(&EngineConfig::default());
    let mut factory = HeadlessFactory::new();
    let mut combat = Combat::new();
    spawn_enemy(&mut world, &mut factory, 0.0, 0.0);

    let events = combat_frame(
        &mut world,
        &mut factory,
        &mut combat,
        Duration::from_millis(16),
    );

    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::EnemyDamaged { .. })));
    assert_eq!(query::enemy_view(&world)[0].health, 3);
}
