//! Run away from nearby entities of configured types

use rand::Rng;

use crate::context::BehaviorEnv;
use crate::core::types::{EntityId, Vec3};
use crate::entity::selector::wildcard_match;
use crate::entity::traverser::{TraverserStatus, WalkRequest};
use crate::tasks::{AiTask, TaskBase, TaskConfig};

#[derive(Debug)]
pub struct FleeEntityTask {
    base: TaskBase,
    entity_codes: Vec<String>,
    seeking_range: f32,
    fleeing_distance: f32,
    move_speed: f32,
    flee_duration_ms: f32,
    execution_chance: f32,

    threat: Option<EntityId>,
    threat_pos: Vec3,
    elapsed_ms: f32,
}

impl FleeEntityTask {
    pub const CODE: &'static str = "fleeentity";

    /// Keys: `entityCodes` (wildcards), `seekingRange` (15),
    /// `fleeingDistance` (25), `movespeed` (2.5), `fleeDurationMs` (9000),
    /// `executionChance` (0.1).
    pub fn from_config(config: &TaskConfig) -> Self {
        let seeking_range = config.f32_or("seekingRange", 15.0);
        Self {
            base: TaskBase::from_config(config),
            entity_codes: config.str_list("entityCodes"),
            seeking_range,
            fleeing_distance: config.f32_or("fleeingDistance", 25.0).max(seeking_range),
            move_speed: config.f32_or("movespeed", 2.5),
            flee_duration_ms: config.f32_or("fleeDurationMs", 9000.0),
            execution_chance: config.f32_or("executionChance", 0.1),
            threat: None,
            threat_pos: Vec3::ZERO,
            elapsed_ms: 0.0,
        }
    }

    pub fn threat(&self) -> Option<EntityId> {
        self.threat
    }

    fn is_threat(&self, code: &str) -> bool {
        self.entity_codes.iter().any(|pattern| wildcard_match(pattern, code))
    }

    /// Point `fleeing_distance` away from the threat, level with the entity
    fn flee_point(&self, env: &BehaviorEnv) -> Vec3 {
        let mut away = env.entity.pos - self.threat_pos;
        away.y = 0.0;
        let away = if away.length_squared() < 1e-6 {
            Vec3::new(env.entity.yaw.sin(), 0.0, env.entity.yaw.cos())
        } else {
            away.normalize()
        };
        env.entity.pos + away * self.fleeing_distance
    }
}

impl AiTask for FleeEntityTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool {
        if self.entity_codes.is_empty() || !self.base.cooldown_ready(env.clock) || !self.base.in_day_frame(env.clock) {
            return false;
        }
        if env.rng.gen::<f32>() >= self.execution_chance {
            return false;
        }

        let own_id = env.entity.id;
        let found = env
            .world
            .entities_near(env.entity.pos, self.seeking_range)
            .into_iter()
            .find(|other| other.id != own_id && self.is_threat(&other.code))
            .map(|other| (other.id, other.pos));

        match found {
            Some((id, pos)) => {
                self.threat = Some(id);
                self.threat_pos = pos;
                true
            }
            None => false,
        }
    }

    fn start_execute(&mut self, env: &mut BehaviorEnv) {
        self.elapsed_ms = 0.0;
        let target = self.flee_point(env);
        let request = WalkRequest::new(target, self.move_speed, 1.0);
        if !env.entity.traverser.walk_towards(request) {
            tracing::debug!(entity = %env.entity.id, "flee target refused by traverser");
        }
    }

    fn continue_execute(&mut self, dt: f32, env: &mut BehaviorEnv) -> bool {
        let Some(threat) = self.threat else {
            return false;
        };
        self.elapsed_ms += dt * 1000.0;
        if self.elapsed_ms > self.flee_duration_ms {
            return false;
        }

        match env.world.entity(threat) {
            Some(snapshot) if snapshot.alive => self.threat_pos = snapshot.pos,
            _ => return false,
        }
        if env.entity.pos.distance(self.threat_pos) > self.fleeing_distance {
            return false;
        }

        match env.entity.traverser.status() {
            TraverserStatus::Walking => true,
            TraverserStatus::Stuck => false,
            TraverserStatus::Arrived | TraverserStatus::Idle => {
                let target = self.flee_point(env);
                env.entity
                    .traverser
                    .walk_towards(WalkRequest::new(target, self.move_speed, 1.0))
            }
        }
    }

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        if env.entity.traverser.is_active() {
            env.entity.traverser.stop();
        }
        self.base.finish(cancelled, env);
        self.threat = None;
    }
}
