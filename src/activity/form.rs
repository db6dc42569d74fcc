//! Authoring forms
//!
//! A form is the flat field map of one action or condition, keyed by the
//! same camelCase names used in activity files. Editors read a form, change
//! some fields and write it back; the write is validated against the world
//! before it replaces the configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::condition::ActivityCondition;
use crate::core::error::{Result, SchedulerError};
use crate::entity::environment::WorldAccess;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub type_code: String,
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Form {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: &str, value: impl Into<serde_json::Value>) {
        self.fields.insert(field.to_string(), value.into());
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

pub trait FormEditable {
    fn read_form(&self) -> Result<Form>;

    /// Apply edited fields. Fields missing from the form keep their current
    /// value; unknown fields and a different `type_code` are rejected.
    fn write_form(&mut self, form: &Form, world: &dyn WorldAccess) -> Result<()>;
}

fn form_from_config(type_code: &str, config: serde_json::Value) -> Result<Form> {
    match config {
        serde_json::Value::Object(map) => Ok(Form {
            type_code: type_code.to_string(),
            fields: map.into_iter().collect(),
        }),
        _ => Err(SchedulerError::invalid_field(type_code, "configuration is not a field map")),
    }
}

fn merge_form(type_code: &str, current: serde_json::Value, form: &Form) -> Result<serde_json::Value> {
    if form.type_code != type_code {
        return Err(SchedulerError::invalid_field(
            "typeCode",
            format!("form is for '{}', target is '{}'", form.type_code, type_code),
        ));
    }
    let serde_json::Value::Object(mut map) = current else {
        return Err(SchedulerError::invalid_field(type_code, "configuration is not a field map"));
    };
    for (field, value) in &form.fields {
        if !map.contains_key(field) {
            return Err(SchedulerError::invalid_field(field.clone(), "unknown field"));
        }
        map.insert(field.clone(), value.clone());
    }
    Ok(serde_json::Value::Object(map))
}

impl FormEditable for dyn ActivityAction {
    fn read_form(&self) -> Result<Form> {
        form_from_config(self.type_code(), self.config_value()?)
    }

    fn write_form(&mut self, form: &Form, world: &dyn WorldAccess) -> Result<()> {
        let merged = merge_form(self.type_code(), self.config_value()?, form)?;
        self.replace_config(merged, Some(world))
    }
}

impl FormEditable for dyn ActivityCondition {
    fn read_form(&self) -> Result<Form> {
        form_from_config(self.type_code(), self.config_value()?)
    }

    fn write_form(&mut self, form: &Form, world: &dyn WorldAccess) -> Result<()> {
        let merged = merge_form(self.type_code(), self.config_value()?, form)?;
        self.replace_config(merged, Some(world))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::actions::{EquipAction, TeleportAction};
    use crate::activity::conditions::PositionVicinityCondition;
    use crate::core::types::{Hand, Vec3};
    use crate::entity::environment::{ItemCatalog, StackKind, Terrain, WorldView};

    #[test]
    fn test_read_form_lists_config_fields() {
        let action: Box<dyn ActivityAction> = Box::new(TeleportAction::new(Vec3::new(1.0, 2.0, 3.0), 0.5));
        let form = action.read_form().unwrap();
        assert_eq!(form.type_code, "teleport");
        assert_eq!(form.get("targetY").and_then(|v| v.as_f64()), Some(2.0));
        assert!(form.field_names().any(|f| f == "yaw"));
    }

    #[test]
    fn test_write_form_updates_only_given_fields() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);

        let mut action: Box<dyn ActivityAction> = Box::new(TeleportAction::new(Vec3::new(1.0, 2.0, 3.0), 0.5));
        let mut form = action.read_form().unwrap();
        form.fields.clear();
        form.set("targetX", 9.0);
        action.write_form(&form, &view).unwrap();

        let after = action.read_form().unwrap();
        assert_eq!(after.get("targetX").and_then(|v| v.as_f64()), Some(9.0));
        assert_eq!(after.get("targetZ").and_then(|v| v.as_f64()), Some(3.0));
    }

    #[test]
    fn test_write_form_rejects_unknown_and_mismatched() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);
        let mut action: Box<dyn ActivityAction> = Box::new(TeleportAction::new(Vec3::ZERO, 0.0));

        let mut form = action.read_form().unwrap();
        form.set("colour", "red");
        assert!(action.write_form(&form, &view).is_err());

        let mut other = action.read_form().unwrap();
        other.type_code = "wait".into();
        assert!(action.write_form(&other, &view).is_err());
    }

    #[test]
    fn test_write_form_validates_against_world() {
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new().with(StackKind::Item, "torch");
        let view = WorldView::new(&terrain, &catalog, &[]);

        let mut action: Box<dyn ActivityAction> = Box::new(EquipAction::new(StackKind::Item, "torch", Hand::Main));
        let mut form = action.read_form().unwrap();
        form.set("code", "unobtainium");
        assert!(action.write_form(&form, &view).is_err());
        // rejected edits leave the old configuration in place
        assert_eq!(action.read_form().unwrap().get("code").and_then(|v| v.as_str()), Some("torch"));

        let mut condition: Box<dyn ActivityCondition> =
            Box::new(PositionVicinityCondition::new(Vec3::ZERO, 2.0, -1.0));
        let mut form = condition.read_form().unwrap();
        form.set("range", -3.0);
        assert!(condition.write_form(&form, &view).is_err());
    }
}
