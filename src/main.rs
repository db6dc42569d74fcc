//! Behavior Scheduler - demo runner
//!
//! Spawns a small herd with wander/flee/idle tasks and a villager running
//! scripted activities, then advances the world for a number of ticks.

use std::path::PathBuf;

use behavior_scheduler::activity::{load_activity_file, parse_activity_toml, ActivityDirector};
use behavior_scheduler::core::config::{config, set_config, SchedulerConfig};
use behavior_scheduler::core::error::Result;
use behavior_scheduler::core::types::{IVec3, Vec3};
use behavior_scheduler::ecs::NpcWorld;
use behavior_scheduler::entity::environment::{ItemCatalog, StackKind, Terrain};
use behavior_scheduler::entity::EntityState;
use behavior_scheduler::registry::{init_global, BehaviorRegistry};
use behavior_scheduler::tasks::registry::{load_task_file, parse_task_toml};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEMO_TASKS: &str = r#"
[[task]]
code = "fleeentity"
priority = 3.0
entityCodes = ["wolf"]
seekingRange = 10

[[task]]
code = "wander"
priority = 1.0
wanderChance = 0.05

[[task]]
code = "idle"
priority = 0.5
chance = 0.02
"#;

const DEMO_ACTIVITIES: &str = r#"
[[activity]]
code = "morning"
slot = 0
priority = 1.0
actionDelay = 200

[[activity.conditions]]
type = "timeofday"
fromHour = 6
toHour = 12

[[activity.actions]]
type = "equip"
code = "lantern"
hand = "main"

[[activity.actions]]
type = "walkto"
targetX = 6
targetY = 1
targetZ = 0

[[activity.actions]]
type = "startactivity"
activityCode = "greet"
target = "others"
selector = "e[type=villager,range=30]"

[[activity.actions]]
type = "wait"
durationMs = 3000

[[activity]]
code = "greet"
slot = 1
priority = 2.0

[[activity.actions]]
type = "teleport"
targetX = 5
targetY = 1
targetZ = 5

[[activity.actions]]
type = "setvariable"
key = "greeted"
value = true
"#;

/// Behavior scheduler demo - runs a small world headless
#[derive(Parser, Debug)]
#[command(name = "behavior-sim")]
#[command(about = "Run the behavior scheduler on a demo world")]
struct Args {
    /// Number of ticks to simulate
    #[arg(long, default_value_t = 400)]
    ticks: u32,

    /// Seconds per tick (defaults to the config value)
    #[arg(long)]
    dt: Option<f32>,

    /// Scheduler config TOML
    #[arg(long)]
    config: Option<PathBuf>,

    /// Task definitions for the herd (TOML `[[task]]` list)
    #[arg(long)]
    tasks: Option<PathBuf>,

    /// Activity definitions for villagers (TOML `[[activity]]` list)
    #[arg(long)]
    activities: Option<PathBuf>,

    /// Base RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Log activity lifecycle at info level
    #[arg(long)]
    debug_activities: bool,

    /// Offset applied to the villagers' activities
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    offset: Option<Vec<i32>>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("behavior_scheduler=info")))
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => SchedulerConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => SchedulerConfig::default(),
    };
    if let Some(seed) = args.seed {
        cfg.rng_seed = seed;
    }
    cfg.debug_activities |= args.debug_activities;
    if set_config(cfg).is_err() {
        tracing::warn!("config already set, using the existing one");
    }

    let registry = init_global(BehaviorRegistry::with_builtins())?;

    let task_defs = match &args.tasks {
        Some(path) => load_task_file(path)?,
        None => parse_task_toml(DEMO_TASKS)?,
    };
    let activities = match &args.activities {
        Some(path) => load_activity_file(path, &registry.activities)?,
        None => parse_activity_toml(DEMO_ACTIVITIES, &registry.activities)?,
    };
    let offset = match args.offset.as_deref() {
        Some([x, y, z]) => IVec3::new(*x, *y, *z),
        _ => IVec3::ZERO,
    };

    let catalog = ItemCatalog::new()
        .with(StackKind::Item, "lantern")
        .with(StackKind::Block, "torch");
    let mut world = NpcWorld::new(Terrain::flat(0), catalog);

    for i in 0..4 {
        let sheep = EntityState::new("sheep", Vec3::new(i as f32 * 3.0 + 0.5, 1.0, 10.5));
        world.spawn(sheep, Some(registry.tasks.build_arbiter(&task_defs)?), None);
    }
    world.spawn(EntityState::new("wolf", Vec3::new(20.5, 1.0, 20.5)), None, None);
    for (name, x) in [("Ada", 0.5), ("Bram", 12.5)] {
        let villager = EntityState::new("villager", Vec3::new(x, 1.0, 0.5)).with_name(name);
        let director = ActivityDirector::with_templates(activities.iter().cloned()).with_offset(offset);
        world.spawn(villager, None, Some(director));
    }

    let dt = args.dt.unwrap_or(config().default_tick_dt);
    tracing::info!(ticks = args.ticks, dt, npcs = world.entity_count(), "simulation starting");
    for _ in 0..args.ticks {
        world.tick(dt);
    }

    println!("=== after {} ticks ({:.1} in-game hours) ===", world.current_tick, world.clock.total_hours());
    let ids: Vec<_> = world.ids().collect();
    for id in ids {
        let Some(npc) = world.npc(id) else { continue };
        let state = &npc.state;
        let label = state.name.clone().unwrap_or_else(|| state.code.clone());
        println!(
            "{:<8} pos=({:.1}, {:.1}, {:.1})",
            label, state.pos.x, state.pos.y, state.pos.z
        );
        if let Some(arbiter) = &npc.arbiter {
            let active: Vec<&str> = arbiter.tasks().filter(|t| arbiter.is_task_active(t.code())).map(|t| t.code()).collect();
            println!("         tasks active: {:?}", active);
        }
        if let Some(director) = &npc.director {
            for status in director.statuses() {
                println!("         activity: {}", serde_json::to_string(&status)?);
            }
        }
    }
    Ok(())
}
