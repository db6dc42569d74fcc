//! Simulation clock for cooldowns and time-of-day gating
//!
//! Behaviors never read wall-clock time. The owning world advances the clock
//! by the same `dt` it passes to the scheduler, and tasks read elapsed
//! milliseconds (for cooldowns) or total in-game hours (for day frames).

use serde::{Deserialize, Serialize};

/// Time of day periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimePeriod {
    Morning,   // 06:00-12:00
    Afternoon, // 12:00-18:00
    Evening,   // 18:00-22:00
    Night,     // 22:00-06:00
}

impl TimePeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimePeriod::Morning,
            12..=17 => TimePeriod::Afternoon,
            18..=21 => TimePeriod::Evening,
            _ => TimePeriod::Night, // 22-23, 0-5
        }
    }
}

/// Clock tracking simulation time in milliseconds and in-game hours
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameClock {
    elapsed_ms: u64,
    total_hours: f64,
    seconds_per_hour: f32,
}

impl GameClock {
    pub const HOURS_PER_DAY: f64 = 24.0;

    pub fn new(seconds_per_hour: f32) -> Self {
        Self {
            elapsed_ms: 0,
            total_hours: 0.0,
            seconds_per_hour: seconds_per_hour.max(f32::EPSILON),
        }
    }

    /// Start the clock at a given in-game hour (e.g. 8.0 for morning)
    pub fn starting_at_hour(seconds_per_hour: f32, hour: f64) -> Self {
        let mut clock = Self::new(seconds_per_hour);
        clock.total_hours = hour;
        clock
    }

    /// Advance by `dt` simulation seconds
    pub fn advance(&mut self, dt: f32) {
        self.elapsed_ms += (dt.max(0.0) * 1000.0).round() as u64;
        self.total_hours += (dt.max(0.0) / self.seconds_per_hour) as f64;
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn total_hours(&self) -> f64 {
        self.total_hours
    }

    pub fn current_day(&self) -> u64 {
        (self.total_hours / Self::HOURS_PER_DAY) as u64
    }

    /// Fractional hour of the current day in `[0, 24)`
    pub fn hour_of_day(&self) -> f32 {
        self.total_hours.rem_euclid(Self::HOURS_PER_DAY) as f32
    }

    pub fn current_time_period(&self) -> TimePeriod {
        TimePeriod::from_hour(self.hour_of_day() as u32)
    }
}

impl Default for GameClock {
    fn default() -> Self {
        Self::new(crate::core::config::config().seconds_per_game_hour)
    }
}

/// Whether `hour` lies in the window `[from, to)`, wrapping past midnight
/// when `from > to`.
pub fn hour_in_window(hour: f32, from: f32, to: f32) -> bool {
    if from <= to {
        hour >= from && hour < to
    } else {
        hour >= from || hour < to
    }
}
