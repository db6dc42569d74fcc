use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::ActionContext;
use crate::core::error::{Result, SchedulerError};
use crate::core::types::Hand;
use crate::entity::environment::{StackKind, WorldAccess};

/// Put a resolved item or block stack straight into a hand.
/// An unknown code is logged and skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EquipAction {
    pub code: String,
    pub stack_kind: StackKind,
    pub quantity: u32,
    pub hand: Hand,
    #[serde(skip)]
    done: bool,
}

impl Default for EquipAction {
    fn default() -> Self {
        Self {
            code: String::new(),
            stack_kind: StackKind::Item,
            quantity: 1,
            hand: Hand::Main,
            done: false,
        }
    }
}

impl EquipAction {
    pub const TYPE: &'static str = "equip";

    pub fn new(kind: StackKind, code: &str, hand: Hand) -> Self {
        Self {
            code: code.to_string(),
            stack_kind: kind,
            hand,
            ..Self::default()
        }
    }
}

impl ActivityAction for EquipAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        self.done = true;
        match ctx.env.world.resolve_stack(self.stack_kind, &self.code, self.quantity) {
            Some(stack) => ctx.env.entity.hands.set(self.hand, Some(stack)),
            None => tracing::warn!(
                entity = %ctx.entity_id(),
                kind = %self.stack_kind,
                code = %self.code,
                "cannot resolve stack, equip skipped"
            ),
        }
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn validate(&self, world: &dyn WorldAccess) -> Result<()> {
        match world.resolve_stack(self.stack_kind, &self.code, self.quantity) {
            Some(_) => Ok(()),
            None => Err(SchedulerError::UnresolvedStack {
                kind: self.stack_kind.to_string(),
                code: self.code.clone(),
            }),
        }
    }
}
