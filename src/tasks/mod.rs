//! Reactive AI tasks
//!
//! Tasks are short independent behaviors (wander, flee, fetch...) that compete
//! every tick for mutually exclusive slots. The [`arbiter::TaskArbiter`]
//! picks at most one active task per slot by priority and drives it through
//! the should-execute / start / continue / finish lifecycle.

pub mod arbiter;
pub mod config;
pub mod flee;
pub mod idle;
pub mod registry;
pub mod search;
pub mod seek_item;
pub mod stay_in_range;
pub mod wander;

use rand::Rng;

use crate::context::BehaviorEnv;
use crate::core::clock::{hour_in_window, GameClock};

pub use arbiter::{TaskArbiter, TaskEvent};
pub use config::TaskConfig;
pub use registry::TaskRegistry;

/// Fields and bookkeeping every task shares
#[derive(Debug, Clone)]
pub struct TaskBase {
    pub code: String,
    pub slot: i32,
    priority: f32,
    priority_for_cancel: f32,
    boost: f32,
    boost_decay_per_sec: f32,
    min_cooldown_ms: u64,
    max_cooldown_ms: u64,
    min_cooldown_hours: f32,
    max_cooldown_hours: f32,
    cooldown_until_ms: u64,
    cooldown_until_hours: f64,
    day_frames: Vec<(f32, f32)>,
}

impl TaskBase {
    /// Reads `slot`, `priority`, `priorityForCancel`, `priorityDecayPerSecond`,
    /// `mincooldown`/`maxcooldown` (ms), `mincooldownHours`/`maxcooldownHours`
    /// and `dayFrames`.
    pub fn from_config(config: &TaskConfig) -> Self {
        let priority = config.f32_or("priority", 1.0);
        let min_cooldown_ms = config.u64_or("mincooldown", 0);
        let min_cooldown_hours = config.f32_or("mincooldownHours", 0.0);
        Self {
            code: config.code.clone(),
            slot: config.i32_or("slot", 0),
            priority,
            priority_for_cancel: config.f32_or("priorityForCancel", priority),
            boost: 0.0,
            boost_decay_per_sec: config.f32_or("priorityDecayPerSecond", 0.5).max(0.0),
            min_cooldown_ms,
            max_cooldown_ms: config.u64_or("maxcooldown", 100).max(min_cooldown_ms),
            min_cooldown_hours,
            max_cooldown_hours: config.f32_or("maxcooldownHours", 0.0).max(min_cooldown_hours),
            cooldown_until_ms: 0,
            cooldown_until_hours: 0.0,
            day_frames: config.hour_windows("dayFrames"),
        }
    }

    pub fn new(code: &str, slot: i32, priority: f32) -> Self {
        let config = TaskConfig::new(code)
            .with("slot", toml::Value::Integer(slot as i64))
            .with("priority", toml::Value::Float(priority as f64));
        Self::from_config(&config)
    }

    /// Effective priority including any transient boost
    pub fn priority(&self) -> f32 {
        self.priority + self.boost
    }

    pub fn base_priority(&self) -> f32 {
        self.priority
    }

    /// Priority another task must exceed to preempt this one
    pub fn priority_for_cancel(&self) -> f32 {
        self.priority_for_cancel + self.boost
    }

    pub fn boost(&mut self, amount: f32) {
        self.boost = (self.boost + amount).max(0.0);
    }

    pub fn current_boost(&self) -> f32 {
        self.boost
    }

    /// Decay the boost back toward the configured priority
    pub fn decay_boost(&mut self, dt: f32) {
        if self.boost > 0.0 {
            self.boost = (self.boost - self.boost_decay_per_sec * dt).max(0.0);
        }
    }

    pub fn cooldown_ready(&self, clock: &GameClock) -> bool {
        clock.elapsed_ms() >= self.cooldown_until_ms && clock.total_hours() >= self.cooldown_until_hours
    }

    pub fn start_cooldown(&mut self, env: &mut BehaviorEnv) {
        let ms = if self.max_cooldown_ms > self.min_cooldown_ms {
            env.rng.gen_range(self.min_cooldown_ms..=self.max_cooldown_ms)
        } else {
            self.min_cooldown_ms
        };
        let hours = if self.max_cooldown_hours > self.min_cooldown_hours {
            env.rng.gen_range(self.min_cooldown_hours..=self.max_cooldown_hours)
        } else {
            self.min_cooldown_hours
        };
        self.cooldown_until_ms = env.clock.elapsed_ms() + ms;
        self.cooldown_until_hours = env.clock.total_hours() + hours as f64;
    }

    /// True when no day frames are configured or the hour falls in one
    pub fn in_day_frame(&self, clock: &GameClock) -> bool {
        if self.day_frames.is_empty() {
            return true;
        }
        let hour = clock.hour_of_day();
        self.day_frames
            .iter()
            .any(|&(from, to)| hour_in_window(hour, from, to))
    }

    /// Common finish bookkeeping: release the traverser when cancelled and
    /// arm the cooldown.
    pub fn finish(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        if cancelled {
            env.entity.traverser.stop();
        }
        self.start_cooldown(env);
    }
}

/// Lifecycle contract for every reactive task
pub trait AiTask: std::fmt::Debug {
    fn base(&self) -> &TaskBase;

    fn base_mut(&mut self) -> &mut TaskBase;

    fn code(&self) -> &str {
        &self.base().code
    }

    fn slot(&self) -> i32 {
        self.base().slot
    }

    fn priority(&self) -> f32 {
        self.base().priority()
    }

    /// Cheap check; may only touch cooldown bookkeeping
    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool;

    fn start_execute(&mut self, env: &mut BehaviorEnv);

    /// Returning false ends the task
    fn continue_execute(&mut self, dt: f32, env: &mut BehaviorEnv) -> bool;

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv);

    /// Called once when the owning entity enters the world
    fn on_entity_spawn(&mut self, _entity: &mut crate::entity::EntityState) {}
}
