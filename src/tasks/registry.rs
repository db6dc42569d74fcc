//! Task construction by code
//!
//! Maps the `code` discriminator of a task definition to a factory, and
//! loads `[[task]]` lists from TOML.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::core::error::{Result, SchedulerError};
use crate::tasks::flee::FleeEntityTask;
use crate::tasks::idle::IdleTask;
use crate::tasks::seek_item::SeekItemTask;
use crate::tasks::stay_in_range::StayInRangeTask;
use crate::tasks::wander::WanderTask;
use crate::tasks::{AiTask, TaskArbiter, TaskConfig};

pub type TaskFactory = fn(&TaskConfig) -> Box<dyn AiTask>;

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    factories: BTreeMap<String, TaskFactory>,
}

impl TaskRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in task
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(WanderTask::CODE, |c| Box::new(WanderTask::from_config(c)));
        registry.register(FleeEntityTask::CODE, |c| Box::new(FleeEntityTask::from_config(c)));
        registry.register(StayInRangeTask::CODE, |c| Box::new(StayInRangeTask::from_config(c)));
        registry.register(IdleTask::CODE, |c| Box::new(IdleTask::from_config(c)));
        registry.register(SeekItemTask::CODE, |c| Box::new(SeekItemTask::from_config(c)));
        registry
    }

    /// Later registrations replace earlier ones
    pub fn register(&mut self, code: &str, factory: TaskFactory) {
        if self.factories.insert(code.to_lowercase(), factory).is_some() {
            tracing::debug!(code, "task factory replaced");
        }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.factories.contains_key(&code.to_lowercase())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, config: &TaskConfig) -> Result<Box<dyn AiTask>> {
        let factory = self
            .factories
            .get(&config.code.to_lowercase())
            .ok_or_else(|| SchedulerError::UnknownType {
                family: "task",
                type_code: config.code.clone(),
            })?;
        Ok(factory(config))
    }

    /// Build an arbiter holding one task per definition
    pub fn build_arbiter(&self, configs: &[TaskConfig]) -> Result<TaskArbiter> {
        let mut arbiter = TaskArbiter::new();
        for config in configs {
            arbiter.add_task(self.create(config)?);
        }
        Ok(arbiter)
    }
}

/// Parse every `[[task]]` table in a TOML document
pub fn parse_task_toml(content: &str) -> Result<Vec<TaskConfig>> {
    let table: toml::Table = content.parse()?;
    let Some(entries) = table.get("task").and_then(|t| t.as_array()) else {
        return Ok(Vec::new());
    };
    entries.iter().map(TaskConfig::from_value).collect()
}

pub fn load_task_file(path: &Path) -> Result<Vec<TaskConfig>> {
    let content = fs::read_to_string(path)?;
    parse_task_toml(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HERD: &str = r#"
[[task]]
code = "wander"
priority = 1.0
wanderChance = 0.02

[[task]]
code = "fleeentity"
priority = 3.0
entityCodes = ["wolf*"]

[[task]]
code = "idle"
slot = 1
"#;

    #[test]
    fn test_parse_and_build() {
        let configs = parse_task_toml(HERD).unwrap();
        assert_eq!(configs.len(), 3);

        let arbiter = TaskRegistry::with_builtins().build_arbiter(&configs).unwrap();
        assert_eq!(arbiter.len(), 3);
        assert_eq!(arbiter.task("fleeentity").map(|t| t.priority()), Some(3.0));
        assert_eq!(arbiter.task("idle").map(|t| t.slot()), Some(1));
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        let configs = parse_task_toml("[[task]]\ncode = \"teleporthome\"\n").unwrap();
        let err = TaskRegistry::with_builtins().build_arbiter(&configs).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownType { family: "task", .. }));
    }

    #[test]
    fn test_codes_are_case_insensitive() {
        let registry = TaskRegistry::with_builtins();
        assert!(registry.contains("FleeEntity"));
        assert!(registry.contains("SeekItem"));
        assert!(registry.create(&TaskConfig::new("Wander")).is_ok());
    }

    #[test]
    fn test_document_without_tasks() {
        assert!(parse_task_toml("title = \"empty\"").unwrap().is_empty());
    }
}
