//! Load activity templates from TOML
//!
//! ```toml
//! [[activity]]
//! code = "greet"
//! slot = 2
//! priority = 1.0
//! conditionsOp = "and"
//!
//! [[activity.conditions]]
//! type = "positionvicinity"
//! x = 5
//! range = 3
//!
//! [[activity.actions]]
//! type = "teleport"
//! targetX = 5
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::activity::condition::ConditionsOp;
use crate::activity::registry::ActivityRegistry;
use crate::activity::sequence::{ActionEntry, Activity};
use crate::core::error::{Result, SchedulerError};

fn default_priority() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityDef {
    code: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slot: i32,
    #[serde(default = "default_priority")]
    priority: f32,
    #[serde(default)]
    conditions_op: ConditionsOp,
    /// Milliseconds
    #[serde(default)]
    action_delay: f32,
    #[serde(default)]
    conditions: Vec<toml::Table>,
    #[serde(default)]
    actions: Vec<toml::Table>,
}

#[derive(Debug, Deserialize)]
struct ActivityFile {
    #[serde(default)]
    activity: Vec<ActivityDef>,
}

/// Split an entry table into its `type`, optional `label` and the
/// remaining variant fields.
fn split_entry(mut table: toml::Table, activity: &str) -> Result<(String, Option<String>, serde_json::Value)> {
    let type_code = match table.remove("type") {
        Some(toml::Value::String(s)) => s,
        _ => {
            return Err(SchedulerError::MissingField {
                field: "type".into(),
                context: format!("activity '{}'", activity),
            })
        }
    };
    let label = match table.remove("label") {
        Some(toml::Value::String(s)) => Some(s),
        Some(_) => return Err(SchedulerError::invalid_field("label", "expected a string")),
        None => None,
    };
    Ok((type_code, label, serde_json::to_value(&table)?))
}

fn build_activity(def: ActivityDef, registry: &ActivityRegistry) -> Result<Activity> {
    let mut activity = Activity::new(&def.code, def.slot, def.priority)
        .with_name(def.name.as_deref().unwrap_or(&def.code))
        .with_conditions_op(def.conditions_op)
        .with_action_delay(def.action_delay);

    for table in def.conditions {
        let (type_code, _, fields) = split_entry(table, &def.code)?;
        activity = activity.with_condition(registry.create_condition(&type_code, fields)?);
    }
    for table in def.actions {
        let (type_code, label, fields) = split_entry(table, &def.code)?;
        let action = registry.create_action(&type_code, fields)?;
        activity = activity.with_entry(ActionEntry { label, action });
    }
    Ok(activity)
}

pub fn parse_activity_toml(content: &str, registry: &ActivityRegistry) -> Result<Vec<Activity>> {
    let file: ActivityFile = toml::from_str(content)?;
    file.activity
        .into_iter()
        .map(|def| build_activity(def, registry))
        .collect()
}

pub fn load_activity_file(path: &Path, registry: &ActivityRegistry) -> Result<Vec<Activity>> {
    let content = fs::read_to_string(path)?;
    parse_activity_toml(&content, registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: &str = r#"
[[activity]]
code = "greet"
name = "Greet the player"
slot = 2
priority = 4.0
conditionsOp = "or"
actionDelay = 250

[[activity.conditions]]
type = "positionvicinity"
x = 5
y = 1
z = 5
range = 3

[[activity.conditions]]
type = "coordinate"
axis = "y"
value = 10
invert = true

[[activity.actions]]
type = "teleport"
targetX = 5
targetY = 1

[[activity.actions]]
type = "wait"
label = "pause"
durationMs = 500

[[activity.actions]]
type = "jumpto"
label = "pause"
"#;

    #[test]
    fn test_parse_full_activity() {
        let activities = parse_activity_toml(GREETING, &ActivityRegistry::with_builtins()).unwrap();
        assert_eq!(activities.len(), 1);

        let greet = &activities[0];
        assert_eq!(greet.code, "greet");
        assert_eq!(greet.name, "Greet the player");
        assert_eq!(greet.slot, 2);
        assert_eq!(greet.priority(), 4.0);
        assert_eq!(greet.conditions_op, ConditionsOp::Or);
        assert_eq!(greet.conditions().len(), 2);
        assert!(greet.conditions()[1].invert());

        let actions = greet.actions();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[1].label.as_deref(), Some("pause"));
        assert_eq!(actions[2].action.type_code(), "jumpto");
        // the jumpto's own `label` field is its target, not an entry label
        assert_eq!(actions[2].label, None);
        assert_eq!(greet.current_action_index(), -1);
    }

    #[test]
    fn test_missing_type_is_reported() {
        let src = "[[activity]]\ncode = \"x\"\n[[activity.actions]]\ntargetX = 1\n";
        let err = parse_activity_toml(src, &ActivityRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, SchedulerError::MissingField { .. }));
    }

    #[test]
    fn test_unknown_condition_type() {
        let src = "[[activity]]\ncode = \"x\"\n[[activity.conditions]]\ntype = \"moonphase\"\n";
        let err = parse_activity_toml(src, &ActivityRegistry::with_builtins()).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownType { family: "condition", .. }));
    }
}
