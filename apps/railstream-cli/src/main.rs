use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use railstream_common::{DoorState, Pose, SectionIndex};
use railstream_kernel::{EventKind, SectionRegistry};
use railstream_runtime::{FrameInput, Runtime, RuntimeConfig};
use railstream_stream::{LatencyProvider, StreamingProvider, ThreadedProvider};
use railstream_tools::{ConsoleCommand, FrameSample, PerformanceSnapshot, SectionInspector};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const FRAME_DT: f32 = 1.0 / 60.0;
/// Frames a single door walk may take before the simulation gives up.
const MAX_FRAMES_PER_DOOR: u32 = 60 * 30;

#[derive(Parser)]
#[command(name = "railstream-cli", about = "CLI tool for railstream section streaming")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Runtime config (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Build a uniform train of this many cars instead of Zone 1
    #[arg(long, global = true)]
    cars: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate info
    Info,
    /// Walk through the train door by door and report performance
    Simulate {
        /// Section to start in
        #[arg(short, long, default_value = "0")]
        start: u32,
        /// Number of doors to walk through
        #[arg(short, long, default_value = "6")]
        walk: u32,
        /// Simulated load latency in milliseconds
        #[arg(short, long, default_value = "300")]
        latency_ms: u64,
        /// Load on a worker thread instead of the simulated clock
        #[arg(long)]
        threaded: bool,
        /// Background characters spawned in every car
        #[arg(short, long, default_value = "2")]
        npcs_per_car: u32,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show residency and LOD of every section after entering one
    Sections {
        /// Section to enter
        #[arg(short, long, default_value = "0")]
        at: u32,
    },
    /// Run operator console commands against a runtime
    Console {
        /// Section to enter before running the commands
        #[arg(short, long, default_value = "0")]
        at: u32,
        /// Commands, e.g. `perf.report` or `sections 3`
        #[arg(required = true)]
        commands: Vec<String>,
    },
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    doors_walked: u32,
    frames: u64,
    fallbacks: usize,
    final_section: Option<u32>,
    loaded_sections: Vec<u32>,
    pooled_characters: usize,
    active_characters: usize,
    average: PerformanceSnapshot,
    worst: PerformanceSnapshot,
    violations: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = match &cli.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    let registry = match cli.cars {
        Some(cars) => SectionRegistry::uniform(cars, 60.0),
        None => SectionRegistry::zone_one(),
    };

    match cli.command {
        Commands::Info => {
            println!("railstream-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", railstream_common::crate_info());
            println!("kernel: {}", railstream_kernel::crate_info());
            println!("stream: {}", railstream_stream::crate_info());
            println!("pool: {}", railstream_pool::crate_info());
            println!("tools: {}", railstream_tools::crate_info());
            println!("runtime: {}", railstream_runtime::crate_info());
            println!(
                "registry: {} sections, {:.0} MB total",
                registry.len(),
                registry.total_memory_mb()
            );
        }
        Commands::Simulate {
            start,
            walk,
            latency_ms,
            threaded,
            npcs_per_car,
            json,
        } => {
            let latency = Duration::from_millis(latency_ms);
            let summary = if threaded {
                let provider = ThreadedProvider::spawn(latency)?;
                let runtime = Runtime::new(config, registry, provider);
                simulate(runtime, start, walk, npcs_per_car, true)?
            } else {
                let provider = LatencyProvider::new(latency.as_secs_f32());
                let runtime = Runtime::new(config, registry, provider);
                simulate(runtime, start, walk, npcs_per_car, false)?
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Commands::Sections { at } => {
            let mut runtime = Runtime::new(config, registry, LatencyProvider::instant());
            runtime.enter_section(SectionIndex(at));
            runtime.update(FrameInput::new(FRAME_DT));
            println!("{}", SectionInspector::summary(runtime.streamer()));
            for row in SectionInspector::rows(runtime.streamer(), runtime.lod(), runtime.pool()) {
                println!("{row}");
            }
        }
        Commands::Console { at, commands } => {
            let mut runtime = Runtime::new(config, registry, LatencyProvider::instant());
            runtime.enter_section(SectionIndex(at));
            for _ in 0..60 {
                runtime.update(FrameInput::new(FRAME_DT));
            }
            for line in &commands {
                println!("> {line}");
                match ConsoleCommand::parse(line) {
                    Ok(command) => println!("{}", runtime.execute(command)),
                    Err(err) => println!("error: {err}"),
                }
            }
        }
    }

    Ok(())
}

/// Populate every car, then walk `walk` doors forward from `start`,
/// printing one line per door.
fn simulate<P: StreamingProvider>(
    mut runtime: Runtime<P>,
    start: u32,
    walk: u32,
    npcs_per_car: u32,
    realtime_wait: bool,
) -> anyhow::Result<SimulationSummary> {
    let fallbacks = runtime.subscribe_to(&[EventKind::DoorFallbackTriggered]);
    let sections: Vec<SectionIndex> = runtime.streamer().registry().iter().map(|s| s.index).collect();
    anyhow::ensure!(
        sections.contains(&SectionIndex(start)),
        "start section {start} is not registered"
    );

    runtime.enter_section(SectionIndex(start));
    for &section in &sections {
        for slot in 0..npcs_per_car {
            let pose = Pose {
                position: glam::Vec3::new(slot as f32 * 1.5, 0.0, section.0 as f32 * 25.0),
                ..Pose::default()
            };
            if let Err(err) = runtime.spawn_character(section, pose) {
                tracing::warn!(%section, %err, "character not spawned");
                break;
            }
        }
    }

    let mut fallback_count = 0;
    let mut doors_walked = 0;
    let mut current = SectionIndex(start);
    for _ in 0..walk {
        let next = SectionIndex(current.0 + 1);
        let Some(door) = runtime.add_door_to(next) else {
            println!("{current}: end of train");
            break;
        };
        runtime.begin_door(door)?;

        let mut frames = 0;
        loop {
            let sample = FrameSample {
                game_thread_ms: 2.5,
                render_thread_ms: 7.0,
                draw_calls: 120,
                ..FrameSample::default()
            };
            runtime.update(FrameInput {
                dt: FRAME_DT,
                sample,
            });
            frames += 1;

            let state = runtime.door(door).map_or(DoorState::Closed, |d| d.state());
            if realtime_wait && state == DoorState::WaitingForLoad {
                std::thread::sleep(Duration::from_secs_f32(FRAME_DT));
            }
            if state == DoorState::Closed || frames >= MAX_FRAMES_PER_DOOR {
                break;
            }
        }
        let fired = runtime.drain(fallbacks).len();
        fallback_count += fired;
        doors_walked += 1;
        current = next;
        println!(
            "{current}: {frames} frames, loaded {:?}{}",
            runtime.streamer().loaded_sections().iter().map(|s| s.0).collect::<Vec<_>>(),
            if fired > 0 { ", fade fallback" } else { "" }
        );
    }

    println!("{}", runtime.execute(ConsoleCommand::Report));
    println!("{}", runtime.execute(ConsoleCommand::Sections { only: None }));

    let monitor = runtime.monitor();
    let pool = runtime.pool().stats();
    Ok(SimulationSummary {
        doors_walked,
        frames: runtime.frame(),
        fallbacks: fallback_count,
        final_section: runtime.streamer().current_section().map(|s| s.0),
        loaded_sections: runtime.streamer().loaded_sections().iter().map(|s| s.0).collect(),
        pooled_characters: pool.pooled,
        active_characters: pool.active,
        average: monitor.average_snapshot(),
        worst: monitor.worst_snapshot(),
        violations: monitor
            .check_budget_violations()
            .iter()
            .map(|v| v.metric.name().to_string())
            .collect(),
    })
}
