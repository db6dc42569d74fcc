use serde::{Deserialize, Serialize};

use crate::activity::condition::ActivityCondition;
use crate::activity::context::ConditionContext;
use crate::core::error::{Result, SchedulerError};
use crate::core::types::{horizontal_distance, Vec3};
use crate::entity::environment::WorldAccess;

/// Holds while the entity is near a point (shifted by the activity offset).
///
/// With `yrange >= 0` the test is horizontal distance `< range` and vertical
/// distance `< yrange`. With `yrange = -1` it is a plain 3D distance
/// `< range`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionVicinityCondition {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub range: f32,
    pub yrange: f32,
    pub invert: bool,
}

impl Default for PositionVicinityCondition {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            range: 1.0,
            yrange: -1.0,
            invert: false,
        }
    }
}

impl PositionVicinityCondition {
    pub const TYPE: &'static str = "positionvicinity";

    pub fn new(point: Vec3, range: f32, yrange: f32) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            range,
            yrange,
            invert: false,
        }
    }
}

impl ActivityCondition for PositionVicinityCondition {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn invert(&self) -> bool {
        self.invert
    }

    fn condition_satisfied(&self, ctx: &ConditionContext) -> bool {
        let point = ctx.relocate(Vec3::new(self.x, self.y, self.z));
        let pos = ctx.entity.pos;
        if self.yrange >= 0.0 {
            horizontal_distance(pos, point) < self.range && (pos.y - point.y).abs() < self.yrange
        } else {
            pos.distance(point) < self.range
        }
    }

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        if self.range < 0.0 {
            return Err(SchedulerError::invalid_field("range", "must not be negative"));
        }
        Ok(())
    }
}
