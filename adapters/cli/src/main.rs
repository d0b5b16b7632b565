#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless Prompt World session.

mod backend;
mod script;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use prompt_world_core::{EngineConfig, StructureCategory, WorldSnapshot};
use prompt_world_session::{FrameInput, ReconcileReport, Session};
use prompt_world_world::{query, HeadlessFactory};
use serde_json::json;

use self::backend::FileBackend;

#[derive(Parser)]
#[command(name = "prompt-world", about = "Headless driver for Prompt World sessions")]
struct Cli {
    /// Engine configuration file in TOML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Generate a world from a snapshot file, apply edits and simulate frames
    Run {
        /// Snapshot returned for the generation request
        #[arg(long)]
        generate: PathBuf,
        /// Prompt sent with the generation request
        #[arg(long, default_value = "headless world")]
        prompt: String,
        /// Snapshot returned for a modification request; repeatable
        #[arg(long)]
        modify: Vec<PathBuf>,
        /// Edit command paired with the modification at the same position
        #[arg(long = "command")]
        commands: Vec<String>,
        /// Frames to simulate after every request
        #[arg(long, default_value_t = 0)]
        frames: usize,
        /// Scripted inputs such as `forward*30,forward+dash*5,jump`
        #[arg(long)]
        script: Option<String>,
        /// Frame duration in milliseconds
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
        /// Print the final summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate a snapshot file and list what it describes
    Check {
        /// Snapshot file to validate
        snapshot: PathBuf,
    },
}

/// Entry point for the Prompt World command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Mode::Run {
            generate,
            prompt,
            modify,
            commands,
            frames,
            script,
            frame_ms,
            json,
        } => {
            let inputs = match script {
                Some(script) => script::parse(&script)?,
                None => Vec::new(),
            };
            let frames = frames.max(inputs.len());
            let plan = RunPlan {
                prompt,
                commands: edit_commands(&modify, commands)?,
                frames,
                inputs,
                frame: Duration::from_millis(frame_ms),
                json,
            };
            run(&config, FileBackend::new(generate, modify), &plan)
        }
        Mode::Check { snapshot } => check(&snapshot),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Pairs every modification file with its edit command, defaulting to the file stem.
fn edit_commands(files: &[PathBuf], mut commands: Vec<String>) -> Result<Vec<String>> {
    ensure!(
        commands.len() <= files.len(),
        "{} edit commands given for {} modification files",
        commands.len(),
        files.len()
    );
    for file in &files[commands.len()..] {
        let stem = file
            .file_stem()
            .map_or_else(|| "modify".to_owned(), |stem| stem.to_string_lossy().into_owned());
        commands.push(stem);
    }
    Ok(commands)
}

struct RunPlan {
    prompt: String,
    commands: Vec<String>,
    frames: usize,
    inputs: Vec<FrameInput>,
    frame: Duration,
    json: bool,
}

fn run(config: &EngineConfig, mut backend: FileBackend, plan: &RunPlan) -> Result<()> {
    let mut session = Session::new(config, HeadlessFactory::new());
    let mut totals = ReconcileReport::default();

    let report = session
        .generate(&mut backend, &plan.prompt)
        .context("world generation failed")?;
    accumulate(&mut totals, report);
    simulate(&mut session, plan);

    for command in &plan.commands {
        let report = session
            .modify(&mut backend, command)
            .with_context(|| format!("modification `{command}` failed"))?;
        accumulate(&mut totals, report);
        simulate(&mut session, plan);
    }

    print_summary(&session, &totals, plan.json);
    Ok(())
}

fn accumulate(totals: &mut ReconcileReport, report: ReconcileReport) {
    totals.placed += report.placed;
    totals.removed += report.removed;
    totals.rejected += report.rejected;
    totals.skipped_removals += report.skipped_removals;
    totals.unplaced_buildings += report.unplaced_buildings;
}

fn simulate(session: &mut Session<HeadlessFactory>, plan: &RunPlan) {
    if plan.frames == 0 {
        return;
    }
    let mut hits = 0;
    let mut defeated = 0;
    for index in 0..plan.frames {
        let input = plan.inputs.get(index).copied().unwrap_or_default();
        let report = session.frame(&input, plan.frame);
        hits += report.hits;
        defeated += report.defeated;
    }
    info!("simulated {} frames: {hits} hits, {defeated} enemies defeated", plan.frames);
}

fn print_summary(session: &Session<HeadlessFactory>, totals: &ReconcileReport, as_json: bool) {
    let world = session.world();
    let player = query::player(world);
    let environment = query::environment(world);

    if as_json {
        let counts: serde_json::Map<String, serde_json::Value> = StructureCategory::ALL
            .iter()
            .map(|category| (category.label().to_owned(), json!(query::count(world, *category))))
            .collect();
        let summary = json!({
            "phase": format!("{:?}", session.phase()),
            "biome": environment.biome,
            "structures": counts,
            "placed": totals.placed,
            "removed": totals.removed,
            "rejected": totals.rejected,
            "unplaced_buildings": totals.unplaced_buildings,
            "player": {
                "position": player.position.to_array(),
                "grounded": player.motion.grounded,
            },
        });
        println!("{summary}");
        return;
    }

    println!("phase: {:?}", session.phase());
    println!("biome: {}", environment.biome);
    for category in StructureCategory::ALL {
        println!("{}: {}", category.label(), query::count(world, category));
    }
    println!(
        "placed: {}, removed: {}, rejected: {}, unplaced buildings: {}",
        totals.placed, totals.removed, totals.rejected, totals.unplaced_buildings
    );
    println!(
        "player: ({:.2}, {:.2}, {:.2}) {}",
        player.position.x,
        player.position.y,
        player.position.z,
        if player.motion.grounded {
            "grounded"
        } else {
            "airborne"
        }
    );
}

fn check(path: &Path) -> Result<()> {
    let body =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let snapshot = WorldSnapshot::from_json(&body)
        .with_context(|| format!("{} is not a valid world snapshot", path.display()))?;

    println!("biome: {}", snapshot.biome());
    println!(
        "terrain: {0}x{0} samples",
        snapshot.world.heightmap_raw.len()
    );
    for category in StructureCategory::ALL {
        println!("{}: {}", category.label(), snapshot.count(category));
    }
    Ok(())
}
