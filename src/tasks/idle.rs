//! Stand still for a while

use rand::Rng;

use crate::context::BehaviorEnv;
use crate::tasks::{AiTask, TaskBase, TaskConfig};

#[derive(Debug)]
pub struct IdleTask {
    base: TaskBase,
    chance: f32,
    min_duration_ms: f32,
    max_duration_ms: f32,

    duration_ms: f32,
    elapsed_ms: f32,
}

impl IdleTask {
    pub const CODE: &'static str = "idle";

    /// Keys: `chance` (0.005), `minDurationMs` (2000), `maxDurationMs` (8000)
    pub fn from_config(config: &TaskConfig) -> Self {
        let min_duration_ms = config.f32_or("minDurationMs", 2000.0).max(0.0);
        Self {
            base: TaskBase::from_config(config),
            chance: config.f32_or("chance", 0.005),
            min_duration_ms,
            max_duration_ms: config.f32_or("maxDurationMs", 8000.0).max(min_duration_ms),
            duration_ms: 0.0,
            elapsed_ms: 0.0,
        }
    }

    pub fn duration_ms(&self) -> f32 {
        self.duration_ms
    }
}

impl AiTask for IdleTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool {
        self.base.cooldown_ready(env.clock)
            && self.base.in_day_frame(env.clock)
            && env.entity.motion.on_ground
            && env.rng.gen::<f32>() < self.chance
    }

    fn start_execute(&mut self, env: &mut BehaviorEnv) {
        env.entity.traverser.stop();
        self.elapsed_ms = 0.0;
        self.duration_ms = if self.max_duration_ms > self.min_duration_ms {
            env.rng.gen_range(self.min_duration_ms..=self.max_duration_ms)
        } else {
            self.min_duration_ms
        };
    }

    fn continue_execute(&mut self, dt: f32, env: &mut BehaviorEnv) -> bool {
        self.elapsed_ms += dt * 1000.0;
        self.elapsed_ms < self.duration_ms && self.base.in_day_frame(env.clock)
    }

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        self.base.finish(cancelled, env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::environment::WorldView;
    use crate::tasks::testing::Fixture;

    #[test]
    fn test_idles_for_rolled_duration() {
        let mut fx = Fixture::on_flat_ground();
        let view = WorldView::new(&fx.terrain, &fx.catalog, &[]);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
        let config = TaskConfig::new("idle")
            .with("minDurationMs", toml::Value::Integer(1000))
            .with("maxDurationMs", toml::Value::Integer(1000));
        let mut task = IdleTask::from_config(&config);

        task.start_execute(&mut env);
        assert_eq!(task.duration_ms(), 1000.0);
        for _ in 0..9 {
            assert!(task.continue_execute(0.1, &mut env));
        }
        assert!(!task.continue_execute(0.2, &mut env));
    }

    #[test]
    fn test_day_frame_gates_start() {
        let mut fx = Fixture::on_flat_ground();
        fx.clock = crate::core::clock::GameClock::starting_at_hour(60.0, 3.0);
        let view = WorldView::new(&fx.terrain, &fx.catalog, &[]);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
        let frames = toml::Value::Array(vec![toml::Value::Array(vec![
            toml::Value::Integer(8),
            toml::Value::Integer(18),
        ])]);
        let config = TaskConfig::new("idle")
            .with("chance", toml::Value::Float(1.0))
            .with("dayFrames", frames);
        let mut task = IdleTask::from_config(&config);
        assert!(!task.should_execute(&mut env));
    }
}
