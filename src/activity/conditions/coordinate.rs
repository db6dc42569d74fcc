use serde::{Deserialize, Serialize};

use crate::activity::condition::ActivityCondition;
use crate::activity::context::ConditionContext;
use crate::core::types::Axis;

/// Holds while the entity's coordinate on `axis` is strictly below `value`
/// (shifted by the same axis of the activity offset).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinateCondition {
    pub axis: Axis,
    pub value: f32,
    pub invert: bool,
}

impl CoordinateCondition {
    pub const TYPE: &'static str = "coordinate";

    pub fn new(axis: Axis, value: f32, invert: bool) -> Self {
        Self { axis, value, invert }
    }
}

impl ActivityCondition for CoordinateCondition {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn invert(&self) -> bool {
        self.invert
    }

    fn condition_satisfied(&self, ctx: &ConditionContext) -> bool {
        let threshold = self.value + self.axis.of_int(ctx.offset) as f32;
        self.axis.of(ctx.entity.pos) < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::testing::condition_holds;
    use crate::core::types::{IVec3, Vec3};

    #[test]
    fn test_strictly_less_than() {
        let below = CoordinateCondition::new(Axis::Y, 10.0, false);
        assert!(condition_holds(&below, Vec3::new(0.0, 9.99, 0.0), IVec3::ZERO));
        assert!(!condition_holds(&below, Vec3::new(0.0, 10.0, 0.0), IVec3::ZERO));
    }

    #[test]
    fn test_inverted_is_greater_or_equal() {
        let at_or_above = CoordinateCondition::new(Axis::Y, 10.0, true);
        assert!(condition_holds(&at_or_above, Vec3::new(0.0, 10.0, 0.0), IVec3::ZERO));
        assert!(!condition_holds(&at_or_above, Vec3::new(0.0, 9.5, 0.0), IVec3::ZERO));
    }

    #[test]
    fn test_offset_shifts_threshold() {
        let below = CoordinateCondition::new(Axis::Y, 10.0, false);
        let offset = IVec3::new(0, 5, 0);
        assert!(condition_holds(&below, Vec3::new(0.0, 14.0, 0.0), offset));
        assert!(!condition_holds(&below, Vec3::new(0.0, 15.0, 0.0), offset));

        let east = CoordinateCondition::new(Axis::X, 1.0, false);
        assert!(!condition_holds(&east, Vec3::new(50.0, 0.0, 0.0), IVec3::new(20, 0, 0)));
    }
}
