use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::activity::condition::ActivityCondition;
use crate::activity::context::ConditionContext;
use crate::core::error::{Result, SchedulerError};
use crate::entity::attributes::AttributeValue;
use crate::entity::environment::WorldAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    #[default]
    #[serde(alias = "==")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
}

impl Comparison {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Ne => ordering != Ordering::Equal,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Le => ordering != Ordering::Greater,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Ge => ordering != Ordering::Less,
        }
    }
}

/// Compare an entity attribute (dotted path) against a value.
/// A missing attribute never matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableCondition {
    pub key: String,
    #[serde(default)]
    pub comparison: Comparison,
    pub value: AttributeValue,
    #[serde(default)]
    pub invert: bool,
}

impl VariableCondition {
    pub const TYPE: &'static str = "variable";

    pub fn new(key: &str, comparison: Comparison, value: AttributeValue) -> Self {
        Self {
            key: key.to_string(),
            comparison,
            value,
            invert: false,
        }
    }
}

fn compare(stored: &AttributeValue, wanted: &AttributeValue) -> Option<Ordering> {
    use AttributeValue::*;
    match (stored, wanted) {
        (Int(a), Int(b)) => Some(a.cmp(b)),
        (Int(a), Float(b)) => (*a as f64).partial_cmp(b),
        (Float(a), Int(b)) => a.partial_cmp(&(*b as f64)),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Str(a), Str(b)) => Some(a.cmp(b)),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (a, b) if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

impl ActivityCondition for VariableCondition {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn invert(&self) -> bool {
        self.invert
    }

    fn condition_satisfied(&self, ctx: &ConditionContext) -> bool {
        ctx.entity
            .attributes
            .get_path(&self.key)
            .and_then(|stored| compare(stored, &self.value))
            .is_some_and(|ordering| self.comparison.accepts(ordering))
    }

    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(SchedulerError::invalid_field("key", "attribute key is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::testing::condition_holds_with;
    use crate::core::types::{IVec3, Vec3};
    use crate::entity::attributes::AttributeTree;

    #[test]
    fn test_numeric_comparisons_mix_int_and_float() {
        let mut attrs = AttributeTree::new();
        attrs.set_path("quest.stage", AttributeValue::Int(3));

        let at_least_two = VariableCondition::new("quest.stage", Comparison::Ge, AttributeValue::Float(2.0));
        assert!(condition_holds_with(&at_least_two, Vec3::ZERO, IVec3::ZERO, attrs.clone()));

        let below_three = VariableCondition::new("quest.stage", Comparison::Lt, AttributeValue::Int(3));
        assert!(!condition_holds_with(&below_three, Vec3::ZERO, IVec3::ZERO, attrs));
    }

    #[test]
    fn test_missing_attribute_never_matches() {
        let ne = VariableCondition::new("mood", Comparison::Ne, AttributeValue::Str("angry".into()));
        assert!(!condition_holds_with(&ne, Vec3::ZERO, IVec3::ZERO, AttributeTree::new()));
    }

    #[test]
    fn test_symbolic_comparison_aliases() {
        let parsed: VariableCondition =
            serde_json::from_value(serde_json::json!({"key": "met", "comparison": "==", "value": true})).unwrap();
        assert_eq!(parsed.comparison, Comparison::Eq);

        let mut attrs = AttributeTree::new();
        attrs.set_bool("met", true);
        assert!(condition_holds_with(&parsed, Vec3::ZERO, IVec3::ZERO, attrs));
    }
}
