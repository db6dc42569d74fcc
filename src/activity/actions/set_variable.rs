use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::ActionContext;
use crate::core::error::{Result, SchedulerError};
use crate::entity::attributes::AttributeValue;
use crate::entity::environment::WorldAccess;

/// Write a value into the entity attributes; `key` may be a dotted path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVariableAction {
    pub key: String,
    pub value: AttributeValue,
    #[serde(skip)]
    done: bool,
}

impl SetVariableAction {
    pub const TYPE: &'static str = "setvariable";

    pub fn new(key: &str, value: AttributeValue) -> Self {
        Self {
            key: key.to_string(),
            value,
            done: false,
        }
    }
}

impl ActivityAction for SetVariableAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        ctx.env.entity.attributes.set_path(&self.key, self.value.clone());
        self.done = true;
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        if self.key.trim().is_empty() || self.key.split('.').any(str::is_empty) {
            return Err(SchedulerError::invalid_field("key", format!("'{}' is not a valid attribute path", self.key)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::testing::run_with_ctx;
    use crate::core::types::IVec3;
    use crate::tasks::testing::Fixture;

    #[test]
    fn test_sets_nested_variable() {
        let mut fx = Fixture::on_flat_ground();
        let mut action = SetVariableAction::new("quest.stage", AttributeValue::Int(2));
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| action.start(ctx));
        assert_eq!(fx.entity.attributes.get_path("quest.stage"), Some(&AttributeValue::Int(2)));
    }

    #[test]
    fn test_value_accepts_plain_json() {
        let action: SetVariableAction =
            serde_json::from_value(serde_json::json!({"key": "mood", "value": "happy"})).unwrap();
        assert_eq!(action.value, AttributeValue::Str("happy".into()));
    }
}
