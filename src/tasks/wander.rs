//! Wander to a random nearby spot

use rand::Rng;

use crate::context::BehaviorEnv;
use crate::core::types::{horizontal_distance, Vec3};
use crate::entity::traverser::{TraverserStatus, WalkRequest};
use crate::tasks::search::{find_wander_target, record_failure, Medium, SearchParams};
use crate::tasks::{AiTask, TaskBase, TaskConfig};

#[derive(Debug)]
pub struct WanderTask {
    base: TaskBase,
    move_speed: f32,
    wander_chance: f32,
    target_distance: f32,
    reroll_chance: f32,
    max_duration_ms: Option<f32>,
    params: SearchParams,

    target: Option<Vec3>,
    elapsed_ms: f32,
}

impl WanderTask {
    pub const CODE: &'static str = "wander";

    /// Keys: `movespeed` (1.5), `wanderChance` (0.015), `wanderRangeMin` (3),
    /// `wanderRangeMax` (30), `wanderRangeVertical` (10),
    /// `preferredLightLevel`, `medium` (land|liquid), `targetDistance` (0.5),
    /// `rerollChance` (0.005), `maxDurationMs`.
    pub fn from_config(config: &TaskConfig) -> Self {
        let medium = Medium::parse(config.str_or("medium", "land")).unwrap_or_else(|| {
            tracing::warn!(code = %config.code, medium = config.str_or("medium", ""), "unknown wander medium, using land");
            Medium::Land
        });
        let horizontal_min = config.f32_or("wanderRangeMin", 3.0).max(0.0);
        Self {
            base: TaskBase::from_config(config),
            move_speed: config.f32_or("movespeed", 1.5),
            wander_chance: config.f32_or("wanderChance", 0.015),
            target_distance: config.f32_or("targetDistance", 0.5),
            reroll_chance: config.f32_or("rerollChance", 0.005),
            max_duration_ms: config.f32_opt("maxDurationMs"),
            params: SearchParams {
                horizontal_min,
                horizontal_max: config.f32_or("wanderRangeMax", 30.0).max(horizontal_min),
                vertical_max: config.f32_or("wanderRangeVertical", 10.0).max(0.0),
                preferred_light: config.f32_opt("preferredLightLevel"),
                medium,
            },
            target: None,
            elapsed_ms: 0.0,
        }
    }

    pub fn target(&self) -> Option<Vec3> {
        self.target
    }

    fn in_medium(&self, env: &BehaviorEnv) -> bool {
        match self.params.medium {
            Medium::Land => env.entity.motion.on_ground && !env.entity.motion.swimming,
            Medium::Liquid => env.entity.motion.swimming,
        }
    }

    fn walk_to_new_target(&mut self, env: &mut BehaviorEnv) -> bool {
        self.target = find_wander_target(env, &self.params);
        let Some(target) = self.target else {
            return false;
        };
        let request = WalkRequest::new(target, self.move_speed, self.target_distance);
        if !env.entity.traverser.walk_towards(request) {
            record_failure(&mut env.entity.attributes);
            self.target = None;
            return false;
        }
        true
    }
}

impl AiTask for WanderTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool {
        if !self.base.cooldown_ready(env.clock) || !self.base.in_day_frame(env.clock) {
            return false;
        }
        if !self.in_medium(env) {
            return false;
        }
        env.rng.gen::<f32>() < self.wander_chance
    }

    fn start_execute(&mut self, env: &mut BehaviorEnv) {
        self.elapsed_ms = 0.0;
        self.walk_to_new_target(env);
    }

    fn continue_execute(&mut self, dt: f32, env: &mut BehaviorEnv) -> bool {
        let Some(target) = self.target else {
            return false;
        };
        if !self.base.in_day_frame(env.clock) {
            return false;
        }

        self.elapsed_ms += dt * 1000.0;
        if self.max_duration_ms.is_some_and(|max| self.elapsed_ms > max) {
            return false;
        }

        match env.entity.traverser.status() {
            TraverserStatus::Arrived | TraverserStatus::Idle => return false,
            TraverserStatus::Stuck => {
                record_failure(&mut env.entity.attributes);
                return false;
            }
            TraverserStatus::Walking => {}
        }

        if horizontal_distance(env.entity.pos, target) < self.target_distance {
            return false;
        }

        if env.rng.gen::<f32>() < self.reroll_chance {
            return self.walk_to_new_target(env);
        }
        true
    }

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        if env.entity.traverser.is_active() {
            env.entity.traverser.stop();
        }
        self.base.finish(cancelled, env);
        self.target = None;
    }
}
