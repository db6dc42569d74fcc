//! What actions and conditions see while an activity runs
//!
//! Actions never hold a reference back to their director. The director's
//! offset, the entity environment and an outbox for requests the action
//! cannot carry out itself are handed in on every call.

use serde::{Deserialize, Serialize};

use crate::context::BehaviorEnv;
use crate::core::clock::GameClock;
use crate::core::types::{EntityId, IVec3, Vec3};
use crate::entity::environment::WorldAccess;
use crate::entity::EntityState;

/// Request for a director, possibly one owned by another entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum DirectorCommand {
    StartActivity {
        target: EntityId,
        code: String,
        #[serde(default)]
        priority: Option<f32>,
        #[serde(default)]
        slot: Option<i32>,
    },
    CancelActivity {
        target: EntityId,
        code: String,
    },
    JumpTo {
        target: EntityId,
        label: String,
    },
}

impl DirectorCommand {
    pub fn target(&self) -> EntityId {
        match self {
            DirectorCommand::StartActivity { target, .. }
            | DirectorCommand::CancelActivity { target, .. }
            | DirectorCommand::JumpTo { target, .. } => *target,
        }
    }
}

/// Side channel filled by actions during one call
#[derive(Debug, Default)]
pub struct ActionOutbox {
    pub commands: Vec<DirectorCommand>,
    /// Skip the delay before the next action
    pub clear_delay: bool,
    /// Label to continue the sequence from
    pub jump: Option<String>,
}

pub struct ActionContext<'a> {
    pub env: BehaviorEnv<'a>,
    pub offset: IVec3,
    pub outbox: &'a mut ActionOutbox,
}

impl<'a> ActionContext<'a> {
    pub fn new(env: BehaviorEnv<'a>, offset: IVec3, outbox: &'a mut ActionOutbox) -> Self {
        Self { env, offset, outbox }
    }

    pub fn entity_id(&self) -> EntityId {
        self.env.entity.id
    }

    /// Authored coordinates translated by the activity offset
    pub fn relocate(&self, pos: Vec3) -> Vec3 {
        pos + self.offset.as_vec3()
    }
}

/// Read-only view for condition evaluation
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    pub entity: &'a EntityState,
    pub world: &'a dyn WorldAccess,
    pub clock: &'a GameClock,
    pub offset: IVec3,
}

impl<'a> ConditionContext<'a> {
    pub fn new(entity: &'a EntityState, world: &'a dyn WorldAccess, clock: &'a GameClock, offset: IVec3) -> Self {
        Self {
            entity,
            world,
            clock,
            offset,
        }
    }

    pub fn from_env(env: &'a BehaviorEnv<'_>, offset: IVec3) -> Self {
        Self::new(&*env.entity, env.world, env.clock, offset)
    }

    pub fn relocate(&self, pos: Vec3) -> Vec3 {
        pos + self.offset.as_vec3()
    }
}
