//! Free-form task configuration
//!
//! Task definitions are TOML tables with a `code` discriminator and any
//! number of keyed fields. Each task reads the keys it understands and falls
//! back to documented defaults for the rest.

use crate::core::error::{Result, SchedulerError};

#[derive(Debug, Clone, Default)]
pub struct TaskConfig {
    pub code: String,
    fields: toml::Table,
}

impl TaskConfig {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            fields: toml::Table::new(),
        }
    }

    /// Build from a `[[task]]` table; `code` is required
    pub fn from_value(value: &toml::Value) -> Result<Self> {
        let table = value
            .as_table()
            .ok_or_else(|| SchedulerError::invalid_field("task", "expected a table"))?;
        let code = table
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchedulerError::MissingField {
                field: "code".into(),
                context: "task definition".into(),
            })?
            .to_string();
        Ok(Self {
            code,
            fields: table.clone(),
        })
    }

    pub fn with(mut self, key: &str, value: toml::Value) -> Self {
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Numeric field; TOML integers and floats are both accepted
    pub fn f32_opt(&self, key: &str) -> Option<f32> {
        self.fields
            .get(key)
            .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
            .map(|f| f as f32)
    }

    pub fn f32_or(&self, key: &str, default: f32) -> f32 {
        self.f32_opt(key).unwrap_or(default)
    }

    pub fn i32_or(&self, key: &str, default: i32) -> i32 {
        self.fields
            .get(key)
            .and_then(|v| v.as_integer())
            .map(|i| i as i32)
            .unwrap_or(default)
    }

    pub fn u64_or(&self, key: &str, default: u64) -> u64 {
        self.fields
            .get(key)
            .and_then(|v| v.as_integer().or_else(|| v.as_float().map(|f| f as i64)))
            .map(|i| i.max(0) as u64)
            .unwrap_or(default)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.fields
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.fields
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
    }

    /// A single string or an array of strings
    pub fn str_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(toml::Value::String(s)) => vec![s.clone()],
            Some(toml::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Hour windows such as `dayFrames = [[6, 12], [18, 22]]`
    pub fn hour_windows(&self, key: &str) -> Vec<(f32, f32)> {
        let Some(frames) = self.fields.get(key).and_then(|v| v.as_array()) else {
            return Vec::new();
        };
        frames
            .iter()
            .filter_map(|frame| {
                let pair = frame.as_array()?;
                let num = |v: &toml::Value| v.as_float().or_else(|| v.as_integer().map(|i| i as f64));
                Some((num(pair.first()?)? as f32, num(pair.get(1)?)? as f32))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> TaskConfig {
        let value: toml::Value = src.parse::<toml::Table>().unwrap().into();
        TaskConfig::from_value(&value).unwrap()
    }

    #[test]
    fn test_numeric_fields_accept_ints_and_floats() {
        let cfg = parse("code = \"wander\"\nmovespeed = 2\nwanderChance = 0.5\n");
        assert_eq!(cfg.f32_or("movespeed", 0.0), 2.0);
        assert_eq!(cfg.f32_or("wanderChance", 0.0), 0.5);
        assert_eq!(cfg.f32_or("missing", 7.0), 7.0);
    }

    #[test]
    fn test_missing_code_is_an_error() {
        let value: toml::Value = "movespeed = 2".parse::<toml::Table>().unwrap().into();
        assert!(TaskConfig::from_value(&value).is_err());
    }

    #[test]
    fn test_str_list_accepts_single_string() {
        let cfg = parse("code = \"fleeentity\"\nentityCodes = \"wolf*\"\n");
        assert_eq!(cfg.str_list("entityCodes"), vec!["wolf*".to_string()]);

        let cfg = parse("code = \"fleeentity\"\nentityCodes = [\"wolf*\", \"bear\"]\n");
        assert_eq!(cfg.str_list("entityCodes").len(), 2);
    }

    #[test]
    fn test_hour_windows() {
        let cfg = parse("code = \"idle\"\ndayFrames = [[6, 12.5], [20, 4]]\n");
        assert_eq!(cfg.hour_windows("dayFrames"), vec![(6.0, 12.5), (20.0, 4.0)]);
    }
}
