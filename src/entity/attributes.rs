//! Persisted per-entity attribute store
//!
//! A hierarchical, string-keyed tree that survives save/reload. Tasks keep
//! their adaptive counters here and activities write `action{i}` /
//! `condition{i}` sub-trees into it.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{IVec3, Vec3};

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<AttributeValue>),
    Tree(AttributeTree),
}

/// Hierarchical key/value tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeTree {
    entries: BTreeMap<String, AttributeValue>,
}

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: AttributeValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.entries.remove(key)
    }

    /// Integer value; floats are truncated
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.entries.get(key)? {
            AttributeValue::Int(i) => Some(*i),
            AttributeValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        self.set(key, AttributeValue::Int(value));
    }

    /// Float value; integers are widened
    pub fn get_float(&self, key: &str) -> Option<f64> {
        match self.entries.get(key)? {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn get_float_or(&self, key: &str, default: f64) -> f64 {
        self.get_float(key).unwrap_or(default)
    }

    pub fn set_float(&mut self, key: impl Into<String>, value: f64) {
        self.set(key, AttributeValue::Float(value));
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.entries.get(key)? {
            AttributeValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set(key, AttributeValue::Bool(value));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.entries.get(key)? {
            AttributeValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn set_str(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, AttributeValue::Str(value.into()));
    }

    pub fn get_tree(&self, key: &str) -> Option<&AttributeTree> {
        match self.entries.get(key)? {
            AttributeValue::Tree(t) => Some(t),
            _ => None,
        }
    }

    /// Sub-tree at `key`, created (or replaced, if `key` held a scalar)
    pub fn tree_mut(&mut self, key: &str) -> &mut AttributeTree {
        let slot = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| AttributeValue::Tree(AttributeTree::new()));
        if !matches!(slot, AttributeValue::Tree(_)) {
            *slot = AttributeValue::Tree(AttributeTree::new());
        }
        match slot {
            AttributeValue::Tree(t) => t,
            _ => unreachable!("slot was just replaced with a tree"),
        }
    }

    pub fn set_tree(&mut self, key: impl Into<String>, tree: AttributeTree) {
        self.set(key, AttributeValue::Tree(tree));
    }

    /// Value at a dotted path such as `"quest.stage"`
    pub fn get_path(&self, path: &str) -> Option<&AttributeValue> {
        let mut parts = path.split('.').peekable();
        let mut tree = self;
        while let Some(part) = parts.next() {
            let value = tree.entries.get(part)?;
            if parts.peek().is_none() {
                return Some(value);
            }
            match value {
                AttributeValue::Tree(t) => tree = t,
                _ => return None,
            }
        }
        None
    }

    /// Write a value at a dotted path, creating intermediate trees
    pub fn set_path(&mut self, path: &str, value: AttributeValue) {
        match path.rsplit_once('.') {
            None => self.set(path, value),
            Some((parent, leaf)) => {
                let mut tree = self;
                for part in parent.split('.') {
                    tree = tree.tree_mut(part);
                }
                tree.set(leaf, value);
            }
        }
    }

    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        let t = self.get_tree(key)?;
        Some(Vec3::new(
            t.get_float("x")? as f32,
            t.get_float("y")? as f32,
            t.get_float("z")? as f32,
        ))
    }

    pub fn set_vec3(&mut self, key: &str, v: Vec3) {
        let t = self.tree_mut(key);
        t.set_float("x", v.x as f64);
        t.set_float("y", v.y as f64);
        t.set_float("z", v.z as f64);
    }

    pub fn get_ivec3(&self, key: &str) -> Option<IVec3> {
        let t = self.get_tree(key)?;
        Some(IVec3::new(
            t.get_int("x")? as i32,
            t.get_int("y")? as i32,
            t.get_int("z")? as i32,
        ))
    }

    pub fn set_ivec3(&mut self, key: &str, v: IVec3) {
        let t = self.tree_mut(key);
        t.set_int("x", v.x as i64);
        t.set_int("y", v.y as i64);
        t.set_int("z", v.z as i64);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl AttributeValue {
    /// Human-readable rendering used by authoring forms and logs
    pub fn display(&self) -> String {
        match self {
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::List(items) => {
                let parts: Vec<String> = items.iter().map(AttributeValue::display).collect();
                format!("[{}]", parts.join(", "))
            }
            AttributeValue::Tree(t) => format!("{{{} entries}}", t.len()),
        }
    }
}

/// Capture any serialisable value as an attribute tree
pub fn to_tree<T: Serialize>(value: &T) -> Result<AttributeTree> {
    let mut json = serde_json::to_value(value)?;
    strip_nulls(&mut json);
    Ok(serde_json::from_value(json)?)
}

// Unset optionals are simply absent from the tree
fn strip_nulls(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Rebuild a value from an attribute tree written by [`to_tree`]
pub fn from_tree<T: DeserializeOwned>(tree: &AttributeTree) -> Result<T> {
    let json = serde_json::to_value(tree)?;
    Ok(serde_json::from_value(json)?)
}
