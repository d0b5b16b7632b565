#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session orchestration for Prompt World.
//!
//! A [`Session`] owns the authoritative world and every system. It gates
//! generation and modification requests, reconciles validated snapshots into
//! the live world and drives the per-frame loop of locomotion, combat and
//! world ticks. Requests are split into `begin_*` and `complete_*` halves so
//! callers can perform the network round trip in between.

use std::time::Duration;

use glam::Vec3;
use log::{debug, info, warn};
use prompt_world_core::{
    snapshot::{GenerateRequest, ModifyRequest},
    Command, EngineConfig, Event, PlayerState, SessionPhase, SnapshotError, WorldSnapshot,
};
use prompt_world_system_combat::Combat;
use prompt_world_system_locomotion::{Locomotion, LocomotionInput, OrbitCamera};
use prompt_world_system_reconciler::Reconciler;
use prompt_world_world::{self as world, query, StructureFactory, World};
use thiserror::Error;

pub mod backend;

pub use backend::{BackendError, WorldBackend};

/// Errors surfaced by session requests.
///
/// Every error leaves the live world untouched and the phase at the last
/// stable value.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Another generation or modification request is outstanding.
    #[error("a world request is already in flight")]
    RequestInFlight,
    /// Modification needs a loaded world.
    #[error("no world is loaded")]
    NoWorld,
    /// A response arrived without a matching outstanding request.
    #[error("no {0} request is pending")]
    NoRequestPending(&'static str),
    /// The transport failed or the service rejected the request.
    #[error(transparent)]
    Backend(#[from] BackendError),
    /// The response was not a valid world snapshot.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Summary of the world changes a reconciliation produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Structures built and registered.
    pub placed: usize,
    /// Structures removed from the registry.
    pub removed: usize,
    /// Candidates dropped because their region was occupied.
    pub rejected: usize,
    /// Removals that found nothing to remove.
    pub skipped_removals: usize,
    /// Buildings for which no slot or site was found.
    pub unplaced_buildings: usize,
}

impl ReconcileReport {
    fn tally(events: &[Event], unplaced_buildings: usize) -> Self {
        let mut report = Self {
            unplaced_buildings,
            ..Self::default()
        };
        for event in events {
            match event {
                Event::StructurePlaced { .. } => report.placed += 1,
                Event::StructureRemoved { .. } => report.removed += 1,
                Event::PlacementRejected { .. } => report.rejected += 1,
                Event::RemovalSkipped { .. } => report.skipped_removals += 1,
                _ => {}
            }
        }
        report
    }
}

/// Controls sampled for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Movement keys; the camera direction is filled in by the session.
    pub controls: LocomotionInput,
    /// Camera yaw change in radians.
    pub yaw_delta: f32,
    /// Camera pitch change in radians.
    pub pitch_delta: f32,
}

/// Outcome of a simulated frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    /// Whether the frame ran; frames are skipped while no world is loaded.
    pub simulated: bool,
    /// Hits landed on enemies.
    pub hits: usize,
    /// Enemies removed after running out of health.
    pub defeated: usize,
    /// Live enemies after the frame.
    pub enemies_remaining: usize,
    /// Player state after the frame.
    pub player: PlayerState,
}

/// Owns the world, its systems and the request lifecycle.
#[derive(Debug)]
pub struct Session<F> {
    phase: SessionPhase,
    stable_phase: SessionPhase,
    world: World,
    factory: F,
    reconciler: Reconciler,
    locomotion: Locomotion,
    combat: Combat,
    camera: OrbitCamera,
    snapshot: Option<WorldSnapshot>,
    commands: Vec<Command>,
    events: Vec<Event>,
}

impl<F: StructureFactory> Session<F> {
    /// Creates an idle session that builds structures through `factory`.
    #[must_use]
    pub fn new(config: &EngineConfig, factory: F) -> Self {
        Self {
            phase: SessionPhase::Idle,
            stable_phase: SessionPhase::Idle,
            world: World::new(config),
            factory,
            reconciler: Reconciler::new(config),
            locomotion: Locomotion::new(),
            combat: Combat::new(),
            camera: OrbitCamera::default(),
            snapshot: None,
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Snapshot the live world was last reconciled to.
    #[must_use]
    pub fn snapshot(&self) -> Option<&WorldSnapshot> {
        self.snapshot.as_ref()
    }

    /// Camera trailing the player.
    #[must_use]
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Starts a generation request and returns its body.
    ///
    /// Allowed from the menu and while playing. Frames are not simulated
    /// until the response has been applied.
    pub fn begin_generate(&mut self, prompt: &str) -> Result<GenerateRequest, SessionError> {
        if self.phase.is_pending() {
            return Err(SessionError::RequestInFlight);
        }
        self.stable_phase = self.phase;
        self.phase = SessionPhase::Generating;
        info!("requesting world generation");
        Ok(GenerateRequest {
            prompt: prompt.to_owned(),
        })
    }

    /// Applies the response to an outstanding generation request.
    ///
    /// On success the world is rebuilt from scratch and the player spawned.
    pub fn complete_generate(
        &mut self,
        response: Result<String, BackendError>,
    ) -> Result<ReconcileReport, SessionError> {
        if self.phase != SessionPhase::Generating {
            return Err(SessionError::NoRequestPending("generation"));
        }
        let snapshot = self.accept(response)?;

        self.reconciler.reseed();
        self.locomotion.reset();
        self.events.clear();
        self.commands.push(Command::ResetWorld {
            heightmap: snapshot.world.heightmap_raw.clone(),
        });
        self.execute();

        let unplaced = self.reconcile(None, &snapshot);
        let spawn = snapshot.spawn_point.unwrap_or_default();
        self.commands.push(Command::SpawnPlayer {
            x: spawn.x,
            z: spawn.z,
        });
        self.execute();
        self.camera.snap_to(query::player(&self.world).position);

        let report = ReconcileReport::tally(&self.events, unplaced);
        info!(
            "generated {} world: {} structures placed, {} rejected",
            snapshot.biome(),
            report.placed,
            report.rejected
        );
        self.snapshot = Some(snapshot);
        self.phase = SessionPhase::Playing;
        Ok(report)
    }

    /// Starts a modification request and returns its body.
    ///
    /// Only allowed while playing. The request carries the current snapshot,
    /// the player position and the camera's horizontal direction.
    pub fn begin_modify(
        &mut self,
        command: &str,
        image_data: Option<String>,
    ) -> Result<ModifyRequest, SessionError> {
        if self.phase.is_pending() {
            return Err(SessionError::RequestInFlight);
        }
        let Some(current_world) = self.snapshot.clone() else {
            return Err(SessionError::NoWorld);
        };
        if self.phase != SessionPhase::Playing {
            return Err(SessionError::NoWorld);
        }

        self.stable_phase = SessionPhase::Playing;
        self.phase = SessionPhase::Modifying;
        info!("requesting world modification: {command}");
        Ok(ModifyRequest {
            command: command.to_owned(),
            current_world,
            player_position: query::player(&self.world).position.to_array(),
            player_direction: self.camera.forward().to_array(),
            image_data,
        })
    }

    /// Applies the response to an outstanding modification request.
    pub fn complete_modify(
        &mut self,
        response: Result<String, BackendError>,
    ) -> Result<ReconcileReport, SessionError> {
        if self.phase != SessionPhase::Modifying {
            return Err(SessionError::NoRequestPending("modification"));
        }
        let snapshot = self.accept(response)?;

        self.events.clear();
        let previous = self.snapshot.take();
        let unplaced = self.reconcile(previous.as_ref(), &snapshot);

        let report = ReconcileReport::tally(&self.events, unplaced);
        info!(
            "modified world: {} placed, {} removed, {} rejected",
            report.placed, report.removed, report.rejected
        );
        self.snapshot = Some(snapshot);
        self.phase = SessionPhase::Playing;
        Ok(report)
    }

    /// Runs a full generation round trip against `backend`.
    pub fn generate<B: WorldBackend>(
        &mut self,
        backend: &mut B,
        prompt: &str,
    ) -> Result<ReconcileReport, SessionError> {
        let request = self.begin_generate(prompt)?;
        let response = backend.generate_world(&request);
        self.complete_generate(response)
    }

    /// Runs a full modification round trip against `backend`.
    pub fn modify<B: WorldBackend>(
        &mut self,
        backend: &mut B,
        command: &str,
    ) -> Result<ReconcileReport, SessionError> {
        let request = self.begin_modify(command, None)?;
        let response = backend.modify_world(&request);
        self.complete_modify(response)
    }

    /// Clears the world and returns to the menu.
    pub fn return_to_menu(&mut self) {
        self.events.clear();
        self.commands.push(Command::ResetWorld {
            heightmap: Vec::new(),
        });
        self.execute();
        self.snapshot = None;
        self.locomotion.reset();
        self.camera = OrbitCamera::default();
        self.phase = SessionPhase::Idle;
        self.stable_phase = SessionPhase::Idle;
        info!("returned to menu");
    }

    /// Advances the live world by one frame: locomotion, combat, then the
    /// world tick and the camera follow.
    pub fn frame(&mut self, input: &FrameInput, dt: Duration) -> FrameReport {
        if !self.phase.has_world() {
            return FrameReport::default();
        }

        self.events.clear();
        self.camera.orbit(input.yaw_delta, input.pitch_delta);
        let controls = LocomotionInput {
            camera_forward: self.camera.forward(),
            ..input.controls
        };

        let physics = query::physics(&self.world);
        let obstacles = query::obstacle_view(&self.world);
        let player = query::player(&self.world);
        {
            let world = &self.world;
            self.locomotion.handle(
                player,
                &controls,
                dt,
                &physics,
                |x, z| query::ground_height(world, x, z),
                &obstacles,
                &mut self.commands,
            );
        }
        self.execute();

        let player = query::player(&self.world);
        let enemies = query::enemy_view(&self.world);
        self.combat.handle(
            &player,
            &physics,
            query::combat(&self.world),
            &enemies,
            &mut self.commands,
        );
        self.commands.push(Command::Tick { dt });
        self.execute();

        self.camera.follow(player.position, dt.as_secs_f32());

        let mut report = FrameReport {
            simulated: true,
            enemies_remaining: query::enemy_count(&self.world),
            player,
            ..FrameReport::default()
        };
        for event in &self.events {
            match event {
                Event::EnemyDamaged { .. } => report.hits += 1,
                Event::EnemyDefeated { .. } => report.defeated += 1,
                _ => {}
            }
        }
        report
    }

    /// Position of the player's feet.
    #[must_use]
    pub fn player_position(&self) -> Vec3 {
        query::player(&self.world).position
    }

    fn accept(
        &mut self,
        response: Result<String, BackendError>,
    ) -> Result<WorldSnapshot, SessionError> {
        let parsed = response
            .map_err(SessionError::from)
            .and_then(|body| WorldSnapshot::from_json(&body).map_err(SessionError::from));
        parsed.map_err(|error| {
            warn!("world request failed: {error}");
            self.phase = self.stable_phase;
            error
        })
    }

    fn reconcile(&mut self, previous: Option<&WorldSnapshot>, next: &WorldSnapshot) -> usize {
        let buildings = query::building_view(&self.world);
        let unplaced = self
            .reconciler
            .handle(previous, next, &buildings, &mut self.commands);
        self.execute();
        unplaced
    }

    fn execute(&mut self) {
        let commands = std::mem::take(&mut self.commands);
        debug!("applying {} commands", commands.len());
        for command in commands {
            world::apply(&mut self.world, command, &mut self.factory, &mut self.events);
        }
    }
}
