pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use clock::{GameClock, TimePeriod};
pub use error::{Result, SchedulerError};
