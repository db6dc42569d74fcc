use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::{ActionContext, DirectorCommand};
use crate::core::error::{Result, SchedulerError};
use crate::entity::environment::WorldAccess;
use crate::entity::selector::EntitySelector;

/// Whose director receives the start request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartTarget {
    #[default]
    #[serde(rename = "self")]
    Own,
    /// Entities matched by the selector, never the acting entity
    Others,
}

/// Start another activity on this entity or on selected others.
/// A comma-separated `activityCode` picks one entry at random per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartActivityAction {
    pub activity_code: String,
    pub target: StartTarget,
    pub selector: String,
    pub priority: Option<f32>,
    pub slot: Option<i32>,
    #[serde(skip)]
    done: bool,
}

impl Default for StartActivityAction {
    fn default() -> Self {
        Self {
            activity_code: String::new(),
            target: StartTarget::Own,
            selector: "e".to_string(),
            priority: None,
            slot: None,
            done: false,
        }
    }
}

impl StartActivityAction {
    pub const TYPE: &'static str = "startactivity";

    pub fn on_self(codes: &str) -> Self {
        Self {
            activity_code: codes.to_string(),
            ..Self::default()
        }
    }

    pub fn on_others(codes: &str, selector: &str) -> Self {
        Self {
            activity_code: codes.to_string(),
            target: StartTarget::Others,
            selector: selector.to_string(),
            ..Self::default()
        }
    }

    pub fn candidate_codes(&self) -> Vec<&str> {
        self.activity_code
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect()
    }
}

impl ActivityAction for StartActivityAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        self.done = true;
        let own_id = ctx.entity_id();
        let codes = self.candidate_codes();
        let Some(code) = codes.choose(&mut *ctx.env.rng).map(|c| c.to_string()) else {
            tracing::warn!(entity = %own_id, "startactivity has no activity code");
            return;
        };

        let targets = match self.target {
            StartTarget::Own => vec![own_id],
            StartTarget::Others => match EntitySelector::parse(&self.selector) {
                Ok(selector) => ctx
                    .env
                    .world
                    .select_entities(&selector, ctx.env.entity.pos, Some(own_id)),
                Err(e) => {
                    tracing::warn!(entity = %own_id, selector = %self.selector, error = %e, "startactivity selector rejected");
                    return;
                }
            },
        };

        for target in targets {
            ctx.outbox.commands.push(DirectorCommand::StartActivity {
                target,
                code: code.clone(),
                priority: self.priority,
                slot: self.slot,
            });
        }
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        if self.candidate_codes().is_empty() {
            return Err(SchedulerError::invalid_field("activityCode", "no activity code given"));
        }
        if self.target == StartTarget::Others {
            EntitySelector::parse(&self.selector)?;
        }
        Ok(())
    }
}
