use serde::{Deserialize, Serialize};

use crate::activity::condition::ActivityCondition;
use crate::activity::context::ConditionContext;
use crate::core::clock::hour_in_window;

/// Holds while the in-game hour is in `[fromHour, toHour)`; windows may
/// wrap past midnight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TimeOfDayCondition {
    pub from_hour: f32,
    pub to_hour: f32,
    pub invert: bool,
}

impl TimeOfDayCondition {
    pub const TYPE: &'static str = "timeofday";

    pub fn new(from_hour: f32, to_hour: f32) -> Self {
        Self {
            from_hour,
            to_hour,
            invert: false,
        }
    }
}

impl ActivityCondition for TimeOfDayCondition {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn invert(&self) -> bool {
        self.invert
    }

    fn condition_satisfied(&self, ctx: &ConditionContext) -> bool {
        hour_in_window(ctx.clock.hour_of_day(), self.from_hour, self.to_hour)
    }
}
