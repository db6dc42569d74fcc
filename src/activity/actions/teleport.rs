use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::ActionContext;
use crate::core::types::Vec3;

/// Instantly move the entity to an authored position (plus the activity
/// offset) and face `yaw`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeleportAction {
    pub target_x: f32,
    pub target_y: f32,
    pub target_z: f32,
    /// Radians
    pub yaw: f32,
    #[serde(skip)]
    done: bool,
}

impl TeleportAction {
    pub const TYPE: &'static str = "teleport";

    pub fn new(target: Vec3, yaw: f32) -> Self {
        Self {
            target_x: target.x,
            target_y: target.y,
            target_z: target.z,
            yaw,
            done: false,
        }
    }
}

impl ActivityAction for TeleportAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        let destination = ctx.relocate(Vec3::new(self.target_x, self.target_y, self.target_z));
        ctx.env.entity.traverser.stop();
        ctx.env.entity.pos = destination;
        ctx.env.entity.yaw = self.yaw;
        ctx.outbox.clear_delay = true;
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::testing::run_with_ctx;
    use crate::core::types::IVec3;
    use crate::entity::traverser::{TraverserStatus, WalkRequest};
    use crate::tasks::testing::Fixture;

    #[test]
    fn test_teleport_applies_offset_and_yaw() {
        let mut fx = Fixture::on_flat_ground();
        let mut action = TeleportAction::new(Vec3::new(5.0, 1.0, -2.0), 1.5);
        let (_, outbox) = run_with_ctx(&mut fx, &[], IVec3::new(100, 0, 100), |ctx| action.start(ctx));

        assert_eq!(fx.entity.pos, Vec3::new(105.0, 1.0, 98.0));
        assert_eq!(fx.entity.yaw, 1.5);
        assert!(action.is_finished());
        assert!(outbox.clear_delay);
    }

    #[test]
    fn test_teleport_stops_walking() {
        let mut fx = Fixture::on_flat_ground();
        fx.entity
            .traverser
            .walk_towards(WalkRequest::new(Vec3::new(10.0, 1.0, 0.0), 1.0, 0.5));
        let mut action = TeleportAction::default();
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| action.start(ctx));
        assert_eq!(fx.entity.traverser.status(), TraverserStatus::Idle);
    }

    #[test]
    fn test_teleport_fields_are_camel_case() {
        let action: TeleportAction =
            serde_json::from_value(serde_json::json!({"targetX": 5, "targetY": 2.5, "yaw": 0.5})).unwrap();
        assert_eq!(action.target_x, 5.0);
        assert_eq!(action.target_y, 2.5);
        assert_eq!(action.target_z, 0.0);
    }
}
