use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::ActionContext;
use crate::core::error::{Result, SchedulerError};
use crate::entity::environment::WorldAccess;

/// Continue the sequence from the entry labelled `label`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JumpToAction {
    pub label: String,
    #[serde(skip)]
    done: bool,
}

impl JumpToAction {
    pub const TYPE: &'static str = "jumpto";

    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            done: false,
        }
    }
}

impl ActivityAction for JumpToAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        ctx.outbox.jump = Some(self.label.clone());
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(SchedulerError::invalid_field("label", "jump label is empty"));
        }
        Ok(())
    }
}
