//! Entity selector queries
//!
//! Syntax: `e` (every entity) or `e[key=value,...]` with keys
//! `type` (code, `*` wildcards allowed), `range` (max distance from the
//! origin), `tag`, `name` and `limit`.

use crate::core::error::{Result, SchedulerError};
use crate::core::types::Vec3;
use crate::entity::environment::EntitySnapshot;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySelector {
    pub type_pattern: Option<String>,
    pub range: Option<f32>,
    pub tag: Option<String>,
    pub name: Option<String>,
    pub limit: Option<usize>,
}

impl EntitySelector {
    pub fn parse(selector: &str) -> Result<Self> {
        let err = |reason: &str| SchedulerError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = selector.trim();
        let Some(rest) = trimmed.strip_prefix('e') else {
            return Err(err("selector must start with 'e'"));
        };
        if rest.is_empty() {
            return Ok(Self::default());
        }

        let body = rest
            .strip_prefix('[')
            .and_then(|r| r.strip_suffix(']'))
            .ok_or_else(|| err("expected '[...]' after 'e'"))?;

        let mut parsed = Self::default();
        for pair in body.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| err(&format!("'{}' is not key=value", pair)))?;
            let value = value.trim();
            if value.is_empty() {
                return Err(err(&format!("empty value for '{}'", key.trim())));
            }
            match key.trim() {
                "type" => parsed.type_pattern = Some(value.to_string()),
                "range" => {
                    let range: f32 = value
                        .parse()
                        .map_err(|_| err(&format!("range '{}' is not a number", value)))?;
                    if range < 0.0 {
                        return Err(err("range must not be negative"));
                    }
                    parsed.range = Some(range);
                }
                "tag" => parsed.tag = Some(value.to_string()),
                "name" => parsed.name = Some(value.to_string()),
                "limit" => {
                    parsed.limit = Some(
                        value
                            .parse()
                            .map_err(|_| err(&format!("limit '{}' is not a count", value)))?,
                    )
                }
                other => return Err(err(&format!("unknown key '{}'", other))),
            }
        }
        Ok(parsed)
    }

    pub fn matches(&self, entity: &EntitySnapshot, origin: Vec3) -> bool {
        if let Some(pattern) = &self.type_pattern {
            if !wildcard_match(pattern, &entity.code) {
                return false;
            }
        }
        if let Some(range) = self.range {
            if entity.pos.distance(origin) > range {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !entity.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(name) = &self.name {
            if entity.name.as_deref() != Some(name.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Match `text` against a pattern where `*` stands for any run of characters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if text.len() < first.len() + last.len() || !text.starts_with(first) || !text.ends_with(last) {
        return false;
    }
    let mut remaining = &text[first.len()..text.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match remaining.find(middle) {
            Some(idx) => remaining = &remaining[idx + middle.len()..],
            None => return false,
        }
    }
    true
}
