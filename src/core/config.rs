//! Scheduler configuration with documented constants
//!
//! Loaded once per process (usually from TOML) and read through [`config`].

use serde::Deserialize;

/// Configuration for the behavior scheduler
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Base seed for per-entity RNGs
    ///
    /// Each entity mixes its own index into this seed so two entities never
    /// share a random stream while whole runs stay reproducible.
    pub rng_seed: u64,

    /// Simulation seconds that make up one in-game hour
    ///
    /// At the default (60.0), a full in-game day passes in 24 real minutes
    /// of simulation time. Hour-based cooldowns and day frames use this.
    pub seconds_per_game_hour: f32,

    /// Default simulation step used by the demo runner (seconds)
    pub default_tick_dt: f32,

    /// Log activity lifecycle at info level instead of debug
    pub debug_activities: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rng_seed: 0x5eed_0001,
            seconds_per_game_hour: 60.0,
            default_tick_dt: 0.05,
            debug_activities: false,
        }
    }
}

impl SchedulerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from a TOML string; missing keys keep their defaults
    pub fn from_toml(content: &str) -> crate::core::error::Result<Self> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config
            .validate()
            .map_err(|reason| crate::core::error::SchedulerError::invalid_field("config", reason))?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.seconds_per_game_hour <= 0.0 {
            return Err(format!(
                "seconds_per_game_hour ({}) must be positive",
                self.seconds_per_game_hour
            ));
        }

        if self.default_tick_dt <= 0.0 {
            return Err(format!(
                "default_tick_dt ({}) must be positive",
                self.default_tick_dt
            ));
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<SchedulerConfig> = OnceLock::new();

/// Get the global scheduler config (initializes with defaults if not set)
pub fn config() -> &'static SchedulerConfig {
    CONFIG.get_or_init(SchedulerConfig::default)
}

/// Set the global scheduler config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: SchedulerConfig) -> Result<(), SchedulerConfig> {
    CONFIG.set(config)
}
