//! Action and condition construction by `type` discriminator

use std::collections::BTreeMap;

use crate::activity::action::{build_action, ActivityAction};
use crate::activity::actions::{
    EquipAction, JumpToAction, SetVariableAction, StartActivityAction, TeleportAction, WaitAction, WalkToAction,
};
use crate::activity::condition::{build_condition, ActivityCondition};
use crate::activity::conditions::{CoordinateCondition, PositionVicinityCondition, TimeOfDayCondition, VariableCondition};
use crate::core::error::{Result, SchedulerError};

pub type ActionFactory = fn(serde_json::Value) -> Result<Box<dyn ActivityAction>>;
pub type ConditionFactory = fn(serde_json::Value) -> Result<Box<dyn ActivityCondition>>;

#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    actions: BTreeMap<String, ActionFactory>,
    conditions: BTreeMap<String, ConditionFactory>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_action(TeleportAction::TYPE, build_action::<TeleportAction>);
        registry.register_action(EquipAction::TYPE, build_action::<EquipAction>);
        registry.register_action(StartActivityAction::TYPE, build_action::<StartActivityAction>);
        registry.register_action(WaitAction::TYPE, build_action::<WaitAction>);
        registry.register_action(WalkToAction::TYPE, build_action::<WalkToAction>);
        registry.register_action(JumpToAction::TYPE, build_action::<JumpToAction>);
        registry.register_action(SetVariableAction::TYPE, build_action::<SetVariableAction>);

        registry.register_condition(CoordinateCondition::TYPE, build_condition::<CoordinateCondition>);
        registry.register_condition(PositionVicinityCondition::TYPE, build_condition::<PositionVicinityCondition>);
        registry.register_condition(VariableCondition::TYPE, build_condition::<VariableCondition>);
        registry.register_condition(TimeOfDayCondition::TYPE, build_condition::<TimeOfDayCondition>);
        registry
    }

    pub fn register_action(&mut self, type_code: &str, factory: ActionFactory) {
        self.actions.insert(type_code.to_lowercase(), factory);
    }

    pub fn register_condition(&mut self, type_code: &str, factory: ConditionFactory) {
        self.conditions.insert(type_code.to_lowercase(), factory);
    }

    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn condition_types(&self) -> impl Iterator<Item = &str> {
        self.conditions.keys().map(String::as_str)
    }

    pub fn create_action(&self, type_code: &str, fields: serde_json::Value) -> Result<Box<dyn ActivityAction>> {
        let factory = self
            .actions
            .get(&type_code.to_lowercase())
            .ok_or_else(|| SchedulerError::UnknownType {
                family: "action",
                type_code: type_code.to_string(),
            })?;
        factory(fields)
    }

    pub fn create_condition(&self, type_code: &str, fields: serde_json::Value) -> Result<Box<dyn ActivityCondition>> {
        let factory = self
            .conditions
            .get(&type_code.to_lowercase())
            .ok_or_else(|| SchedulerError::UnknownType {
                family: "condition",
                type_code: type_code.to_string(),
            })?;
        factory(fields)
    }
}
