//! Condition contract
//!
//! Conditions are pure predicates over the entity; evaluation never
//! mutates anything, so condition lists may short-circuit.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::activity::action::TYPE_KEY;
use crate::activity::context::ConditionContext;
use crate::core::error::{Result, SchedulerError};
use crate::entity::attributes::{from_tree, to_tree, AttributeTree};
use crate::entity::environment::WorldAccess;

/// How a condition list is reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum ConditionsOp {
    #[default]
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

pub trait ConditionObject {
    fn clone_box(&self) -> Box<dyn ActivityCondition>;

    fn config_value(&self) -> Result<serde_json::Value>;

    fn replace_config(&mut self, value: serde_json::Value, world: Option<&dyn WorldAccess>) -> Result<()>;
}

impl<T> ConditionObject for T
where
    T: ActivityCondition + Clone + Serialize + DeserializeOwned + 'static,
{
    fn clone_box(&self) -> Box<dyn ActivityCondition> {
        Box::new(self.clone())
    }

    fn config_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn replace_config(&mut self, value: serde_json::Value, world: Option<&dyn WorldAccess>) -> Result<()> {
        let fresh: T = serde_json::from_value(value)?;
        if let Some(world) = world {
            fresh.validate(world)?;
        }
        *self = fresh;
        Ok(())
    }
}

pub trait ActivityCondition: ConditionObject + std::fmt::Debug {
    fn type_code(&self) -> &'static str;

    /// Flips the raw result
    fn invert(&self) -> bool;

    /// Raw result before `invert` is applied
    fn condition_satisfied(&self, ctx: &ConditionContext) -> bool;

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        Ok(())
    }

    fn is_satisfied(&self, ctx: &ConditionContext) -> bool {
        self.condition_satisfied(ctx) != self.invert()
    }
}

impl Clone for Box<dyn ActivityCondition> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

pub fn build_condition<T>(value: serde_json::Value) -> Result<Box<dyn ActivityCondition>>
where
    T: ActivityCondition + Clone + Serialize + DeserializeOwned + 'static,
{
    let condition: T = serde_json::from_value(value)?;
    Ok(Box::new(condition))
}

/// Reduce a list with `op`. AND over nothing holds, OR over nothing does not.
pub fn evaluate_all(conditions: &[Box<dyn ActivityCondition>], op: ConditionsOp, ctx: &ConditionContext) -> bool {
    match op {
        ConditionsOp::And => conditions.iter().all(|c| c.is_satisfied(ctx)),
        ConditionsOp::Or => conditions.iter().any(|c| c.is_satisfied(ctx)),
    }
}

pub fn store_condition(condition: &dyn ActivityCondition, tree: &mut AttributeTree) -> Result<()> {
    *tree = to_tree(&condition.config_value()?)?;
    tree.set_str(TYPE_KEY, condition.type_code());
    Ok(())
}

pub fn load_condition(condition: &mut dyn ActivityCondition, tree: &AttributeTree) -> Result<()> {
    let stored_type = tree.get_str(TYPE_KEY).unwrap_or_default();
    if stored_type != condition.type_code() {
        return Err(SchedulerError::invalid_field(
            TYPE_KEY,
            format!("saved '{}' cannot load into '{}'", stored_type, condition.type_code()),
        ));
    }
    let mut config = tree.clone();
    config.remove(TYPE_KEY);
    condition.replace_config(from_tree(&config)?, None)
}
