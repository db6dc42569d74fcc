//! Action contract
//!
//! An action is one step of an activity. One-shot actions do all their work
//! in `start` and report finished straight away; multi-tick actions keep
//! their own progress fields and are polled through `on_tick`.
//!
//! Configuration fields are the serde-visible fields of the variant.
//! Run-scoped fields are `#[serde(skip)]`, so a deserialised or
//! reconfigured action always starts from a clean slate.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::activity::context::ActionContext;
use crate::core::error::{Result, SchedulerError};
use crate::entity::attributes::{from_tree, to_tree, AttributeTree};
use crate::entity::environment::WorldAccess;

pub const TYPE_KEY: &str = "type";
const STATE_KEY: &str = "state";

/// Why the director is pausing the running action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum Interruption {
    #[default]
    Dialogue,
    External,
}

/// Object-safe plumbing every concrete action gets for free
pub trait ActionObject {
    fn clone_box(&self) -> Box<dyn ActivityAction>;

    fn config_value(&self) -> Result<serde_json::Value>;

    /// Rebuild from configuration, keeping the old value if it does not
    /// deserialise or validate
    fn replace_config(&mut self, value: serde_json::Value, world: Option<&dyn WorldAccess>) -> Result<()>;
}

impl<T> ActionObject for T
where
    T: ActivityAction + Clone + Serialize + DeserializeOwned + 'static,
{
    fn clone_box(&self) -> Box<dyn ActivityAction> {
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

pub trait ActivityAction: ActionObject + std::fmt::Debug {
    /// Discriminator used in configuration and saved state
    fn type_code(&self) -> &'static str;

    fn start(&mut self, ctx: &mut ActionContext);

    fn on_tick(&mut self, _dt: f32, _ctx: &mut ActionContext) {}

    fn is_finished(&self) -> bool;

    /// Release anything acquired in `start`
    fn cancel(&mut self, _ctx: &mut ActionContext) {}

    fn pause(&mut self, _kind: Interruption, _ctx: &mut ActionContext) {}

    fn resume(&mut self, _ctx: &mut ActionContext) {}

    fn finish(&mut self, _ctx: &mut ActionContext) {}

    /// Check that configured references resolve
    fn validate(&self, _world: &dyn WorldAccess) -> Result<()> {
        Ok(())
    }

    /// Run-scoped progress worth keeping across a save
    fn store_state(&self, _tree: &mut AttributeTree) {}

    fn load_state(&mut self, _tree: &AttributeTree) {}
}

impl Clone for Box<dyn ActivityAction> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Factory used by the registry
pub fn build_action<T>(value: serde_json::Value) -> Result<Box<dyn ActivityAction>>
where
    T: ActivityAction + Clone + Serialize + DeserializeOwned + 'static,
{
    let action: T = serde_json::from_value(value)?;
    Ok(Box::new(action))
}

/// Write configuration, type tag and run state into `tree`
pub fn store_action(action: &dyn ActivityAction, tree: &mut AttributeTree) -> Result<()> {
    *tree = to_tree(&action.config_value()?)?;
    tree.set_str(TYPE_KEY, action.type_code());
    let mut state = AttributeTree::new();
    action.store_state(&mut state);
    if !state.is_empty() {
        tree.set_tree(STATE_KEY, state);
    }
    Ok(())
}

/// Restore an action written by [`store_action`]; the tree's type tag must
/// match the action it is loaded into
pub fn load_action(action: &mut dyn ActivityAction, tree: &AttributeTree) -> Result<()> {
    let stored_type = tree.get_str(TYPE_KEY).unwrap_or_default();
    if stored_type != action.type_code() {
        return Err(SchedulerError::invalid_field(
            TYPE_KEY,
            format!("saved '{}' cannot load into '{}'", stored_type, action.type_code()),
        ));
    }
    let mut config = tree.clone();
    config.remove(TYPE_KEY);
    let state = config.remove(STATE_KEY);
    action.replace_config(from_tree(&config)?, None)?;
    if let Some(crate::entity::AttributeValue::Tree(state)) = state {
        action.load_state(&state);
    }
    Ok(())
}
