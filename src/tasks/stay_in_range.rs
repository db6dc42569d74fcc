//! Walk back home after straying too far
//!
//! The home position is written to the entity attributes on first spawn so
//! it survives reloads.

use crate::context::BehaviorEnv;
use crate::entity::traverser::{TraverserStatus, WalkRequest};
use crate::entity::EntityState;
use crate::tasks::{AiTask, TaskBase, TaskConfig};

pub const HOME_POSITION_KEY: &str = "homePosition";

#[derive(Debug)]
pub struct StayInRangeTask {
    base: TaskBase,
    max_distance: f32,
    return_distance: f32,
    move_speed: f32,
}

impl StayInRangeTask {
    pub const CODE: &'static str = "stayinrange";

    /// Keys: `maxDistance` (20), `returnDistance` (maxDistance / 4),
    /// `movespeed` (1.5).
    pub fn from_config(config: &TaskConfig) -> Self {
        let max_distance = config.f32_or("maxDistance", 20.0).max(1.0);
        Self {
            base: TaskBase::from_config(config),
            max_distance,
            return_distance: config.f32_or("returnDistance", max_distance / 4.0).clamp(0.5, max_distance),
            move_speed: config.f32_or("movespeed", 1.5),
        }
    }
}

impl AiTask for StayInRangeTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool {
        if !self.base.cooldown_ready(env.clock) {
            return false;
        }
        match env.entity.attributes.get_vec3(HOME_POSITION_KEY) {
            Some(home) => env.entity.pos.distance(home) > self.max_distance,
            None => false,
        }
    }

    fn start_execute(&mut self, env: &mut BehaviorEnv) {
        let Some(home) = env.entity.attributes.get_vec3(HOME_POSITION_KEY) else {
            return;
        };
        let request = WalkRequest::new(home, self.move_speed, self.return_distance);
        if !env.entity.traverser.walk_towards(request) {
            tracing::warn!(entity = %env.entity.id, "home position refused by traverser");
        }
    }

    fn continue_execute(&mut self, _dt: f32, env: &mut BehaviorEnv) -> bool {
        let Some(home) = env.entity.attributes.get_vec3(HOME_POSITION_KEY) else {
            return false;
        };
        if env.entity.pos.distance(home) <= self.return_distance {
            return false;
        }
        env.entity.traverser.status() == TraverserStatus::Walking
    }

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        if env.entity.traverser.is_active() {
            env.entity.traverser.stop();
        }
        self.base.finish(cancelled, env);
    }

    fn on_entity_spawn(&mut self, entity: &mut EntityState) {
        if entity.attributes.get_vec3(HOME_POSITION_KEY).is_none() {
            entity.attributes.set_vec3(HOME_POSITION_KEY, entity.pos);
        }
    }
}
