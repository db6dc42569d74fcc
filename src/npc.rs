//! A scheduled entity: state plus its optional task arbiter and activity
//! director

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::activity::action::Interruption;
use crate::activity::context::DirectorCommand;
use crate::activity::director::ActivityDirector;
use crate::context::BehaviorEnv;
use crate::core::clock::GameClock;
use crate::core::error::{Result, SchedulerError};
use crate::core::types::{EntityId, Vec3};
use crate::entity::attributes::AttributeTree;
use crate::entity::environment::WorldAccess;
use crate::entity::EntityState;
use crate::tasks::TaskArbiter;

/// Attribute subtree holding the director's saved state
pub const DIRECTOR_STATE_KEY: &str = "activityDirector";

/// A player's reply to a dialogue, naming the label to continue from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerMessage {
    pub entity: EntityId,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedNpc {
    code: String,
    pos: Vec3,
    yaw: f32,
    attributes: AttributeTree,
}

#[derive(Debug)]
pub struct Npc {
    pub state: EntityState,
    pub arbiter: Option<TaskArbiter>,
    pub director: Option<ActivityDirector>,
    rng: ChaCha8Rng,
}

impl Npc {
    pub fn new(state: EntityState, seed: u64) -> Self {
        Self {
            state,
            arbiter: None,
            director: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn with_arbiter(mut self, arbiter: TaskArbiter) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    pub fn with_director(mut self, director: ActivityDirector) -> Self {
        self.director = Some(director);
        self
    }

    pub fn id(&self) -> EntityId {
        self.state.id
    }

    /// Let tasks seed per-entity attributes such as a home position
    pub fn on_spawn(&mut self) {
        if let Some(arbiter) = &mut self.arbiter {
            arbiter.on_entity_spawn(&mut self.state);
        }
    }

    /// Arbiter, then director, then movement. Returns director commands
    /// aimed at other entities.
    pub fn tick(&mut self, dt: f32, world: &dyn WorldAccess, clock: &GameClock) -> Vec<DirectorCommand> {
        let Npc {
            state,
            arbiter,
            director,
            rng,
        } = self;
        if !state.alive {
            return Vec::new();
        }

        let commands = {
            let mut env = BehaviorEnv::new(state, world, clock, rng);
            if let Some(arbiter) = arbiter {
                arbiter.tick(dt, &mut env);
            }
            match director {
                Some(director) => director.tick(dt, &mut env),
                None => Vec::new(),
            }
        };

        state.traverser.advance(&mut state.pos, dt, world);
        commands
    }

    /// Apply a command routed from another entity
    pub fn handle_command(&mut self, command: DirectorCommand, world: &dyn WorldAccess, clock: &GameClock) -> Result<()> {
        let Npc {
            state, director, rng, ..
        } = self;
        let Some(director) = director else {
            tracing::debug!(entity = %state.id, "command for entity without a director ignored");
            return Ok(());
        };
        let mut env = BehaviorEnv::new(state, world, clock, rng);
        match command {
            DirectorCommand::StartActivity {
                code, priority, slot, ..
            } => director.start_activity(&code, priority, slot, &mut env).map(|_| ()),
            DirectorCommand::CancelActivity { code, .. } => director.cancel_activity(&code, &mut env),
            DirectorCommand::JumpTo { label, .. } => director.jump_to(&label, &mut env),
        }
    }

    /// Continue the paused dialogue activity from the chosen answer
    pub fn handle_answer(&mut self, answer: &AnswerMessage, world: &dyn WorldAccess, clock: &GameClock) -> Result<()> {
        let Npc {
            state, director, rng, ..
        } = self;
        let Some(director) = director else {
            return Err(SchedulerError::UnknownJumpTarget(answer.answer.clone()));
        };
        let mut env = BehaviorEnv::new(state, world, clock, rng);
        director.jump_to(&answer.answer, &mut env)?;
        director.resume(&mut env);
        Ok(())
    }

    pub fn pause_activities(&mut self, kind: Interruption, world: &dyn WorldAccess, clock: &GameClock) {
        let Npc {
            state, director, rng, ..
        } = self;
        if let Some(director) = director {
            let mut env = BehaviorEnv::new(state, world, clock, rng);
            director.pause(kind, &mut env);
        }
    }

    pub fn resume_activities(&mut self, world: &dyn WorldAccess, clock: &GameClock) {
        let Npc {
            state, director, rng, ..
        } = self;
        if let Some(director) = director {
            let mut env = BehaviorEnv::new(state, world, clock, rng);
            director.resume(&mut env);
        }
    }

    /// Stop every task and activity and release movement
    pub fn despawn(&mut self, world: &dyn WorldAccess, clock: &GameClock) {
        let Npc {
            state,
            arbiter,
            director,
            rng,
        } = self;
        {
            let mut env = BehaviorEnv::new(state, world, clock, rng);
            if let Some(arbiter) = arbiter {
                arbiter.stop_all(&mut env);
            }
            if let Some(director) = director {
                director.cancel_all(&mut env);
            }
        }
        state.traverser.stop();
        state.alive = false;
        tracing::debug!(entity = %state.id, code = %state.code, "npc despawned");
    }

    /// Serialise position and attributes, including director state
    pub fn save_json(&mut self) -> Result<String> {
        if let Some(director) = &self.director {
            director.store_state(self.state.attributes.tree_mut(DIRECTOR_STATE_KEY))?;
        }
        let saved = SavedNpc {
            code: self.state.code.clone(),
            pos: self.state.pos,
            yaw: self.state.yaw,
            attributes: self.state.attributes.clone(),
        };
        Ok(serde_json::to_string(&saved)?)
    }

    /// Restore onto an npc built from the same definitions
    pub fn restore_json(&mut self, json: &str) -> Result<()> {
        let saved: SavedNpc = serde_json::from_str(json)?;
        if saved.code != self.state.code {
            return Err(SchedulerError::invalid_field(
                "code",
                format!("save is for '{}', entity is '{}'", saved.code, self.state.code),
            ));
        }
        self.state.pos = saved.pos;
        self.state.yaw = saved.yaw;
        self.state.attributes = saved.attributes;
        if let (Some(director), Some(tree)) = (&mut self.director, self.state.attributes.get_tree(DIRECTOR_STATE_KEY)) {
            director.load_state(tree)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::actions::{TeleportAction, WaitAction};
    use crate::activity::sequence::{ActionEntry, Activity};
    use crate::entity::environment::{ItemCatalog, Terrain, WorldView};
    use crate::tasks::idle::IdleTask;
    use crate::tasks::stay_in_range::HOME_POSITION_KEY;
    use crate::tasks::{TaskConfig, TaskRegistry};

    fn dialogue() -> ActivityDirector {
        let talk = Activity::new("talk", 0, 1.0)
            .with_action(Box::new(WaitAction::new(60_000.0)))
            .with_entry(ActionEntry::labelled(
                "yes",
                Box::new(TeleportAction::new(Vec3::new(9.0, 1.0, 9.0), 0.0)),
            ));
        ActivityDirector::with_templates([talk])
    }

    #[test]
    fn test_answer_jumps_to_label() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);
        let clock = GameClock::new(60.0);

        let mut npc = Npc::new(EntityState::new("villager", Vec3::new(0.5, 1.0, 0.5)), 1).with_director(dialogue());
        npc.handle_command(
            DirectorCommand::StartActivity {
                target: npc.id(),
                code: "talk".into(),
                priority: None,
                slot: None,
            },
            &view,
            &clock,
        )
        .unwrap();
        npc.pause_activities(Interruption::Dialogue, &view, &clock);

        let answer = AnswerMessage {
            entity: npc.id(),
            answer: "yes".into(),
        };
        npc.handle_answer(&answer, &view, &clock).unwrap();
        assert_eq!(npc.state.pos, Vec3::new(9.0, 1.0, 9.0));

        let unknown = AnswerMessage {
            entity: npc.id(),
            answer: "maybe".into(),
        };
        assert!(npc.handle_answer(&unknown, &view, &clock).is_err());
    }

    #[test]
    fn test_spawn_and_despawn() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);
        let clock = GameClock::new(60.0);

        let registry = TaskRegistry::with_builtins();
        let arbiter = registry
            .build_arbiter(&[
                TaskConfig::new("stayinrange"),
                TaskConfig::new(IdleTask::CODE).with("chance", toml::Value::Float(1.0)),
            ])
            .unwrap();
        let mut npc = Npc::new(EntityState::new("goat", Vec3::new(3.5, 1.0, 3.5)), 7).with_arbiter(arbiter);
        npc.on_spawn();
        assert_eq!(npc.state.attributes.get_vec3(HOME_POSITION_KEY), Some(Vec3::new(3.5, 1.0, 3.5)));

        npc.tick(0.05, &view, &clock);
        assert!(npc.arbiter.as_ref().unwrap().is_task_active(IdleTask::CODE));

        npc.despawn(&view, &clock);
        assert!(!npc.state.alive);
        assert_eq!(npc.arbiter.as_ref().unwrap().active_count(), 0);
        assert!(npc.tick(0.05, &view, &clock).is_empty());
    }

    #[test]
    fn test_save_and_restore_keeps_running_activity() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);
        let clock = GameClock::new(60.0);

        let mut npc = Npc::new(EntityState::new("villager", Vec3::new(0.5, 1.0, 0.5)), 1).with_director(dialogue());
        npc.handle_command(
            DirectorCommand::StartActivity {
                target: npc.id(),
                code: "talk".into(),
                priority: Some(3.0),
                slot: None,
            },
            &view,
            &clock,
        )
        .unwrap();
        npc.tick(0.5, &view, &clock);
        let json = npc.save_json().unwrap();

        let mut fresh = Npc::new(EntityState::new("villager", Vec3::ZERO), 1).with_director(dialogue());
        fresh.restore_json(&json).unwrap();
        assert_eq!(fresh.state.pos, Vec3::new(0.5, 1.0, 0.5));
        let talk = fresh.director.as_ref().unwrap().running_activity(0).unwrap();
        assert_eq!(talk.priority(), 3.0);
        assert_eq!(talk.current_action_index(), 0);

        let mut wrong = Npc::new(EntityState::new("wolf", Vec3::ZERO), 1);
        assert!(wrong.restore_json(&json).is_err());
    }
}
