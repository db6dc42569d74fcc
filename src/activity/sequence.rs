//! The activity sequence engine
//!
//! An activity runs its actions in order, one current action at a time.
//! `current` is -1 whenever nothing runs. After the last action completes,
//! or on cancel, the activity is marked finished and its priority restored.

use serde::Serialize;

use crate::activity::action::{load_action, store_action, ActivityAction, Interruption};
use crate::activity::condition::{evaluate_all, load_condition, store_condition, ActivityCondition, ConditionsOp};
use crate::activity::context::{ActionContext, ConditionContext};
use crate::core::error::Result;
use crate::entity::attributes::AttributeTree;

/// Upper bound on jumps followed within one call
const MAX_JUMPS_PER_STEP: usize = 16;

const NOT_RUNNING: i32 = -1;

/// One step of the sequence, optionally labelled as a jump target
#[derive(Debug, Clone)]
pub struct ActionEntry {
    pub label: Option<String>,
    pub action: Box<dyn ActivityAction>,
}

impl ActionEntry {
    pub fn new(action: Box<dyn ActivityAction>) -> Self {
        Self { label: None, action }
    }

    pub fn labelled(label: &str, action: Box<dyn ActivityAction>) -> Self {
        Self {
            label: Some(label.to_string()),
            action,
        }
    }
}

/// Summary used for logging and the demo binary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityStatus {
    pub code: String,
    pub slot: i32,
    pub priority: f32,
    pub current_action: i32,
    pub finished: bool,
    pub paused: bool,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub code: String,
    pub name: String,
    pub slot: i32,
    priority: f32,
    orig_priority: f32,
    pub conditions_op: ConditionsOp,
    conditions: Vec<Box<dyn ActivityCondition>>,
    actions: Vec<ActionEntry>,
    /// Wait before starting each action after the first
    action_delay_ms: f32,

    current: i32,
    finished: bool,
    paused: bool,
    delay_remaining_ms: f32,
    /// Set by an action that cleared the delay; the next advance skips it
    skip_next_delay: bool,
    /// The current action has not been started yet, it waits on the delay
    pending_start: bool,
}

impl Activity {
    pub fn new(code: &str, slot: i32, priority: f32) -> Self {
        Self {
            code: code.to_string(),
            name: code.to_string(),
            slot,
            priority,
            orig_priority: priority,
            conditions_op: ConditionsOp::And,
            conditions: Vec::new(),
            actions: Vec::new(),
            action_delay_ms: 0.0,
            current: NOT_RUNNING,
            finished: false,
            paused: false,
            delay_remaining_ms: 0.0,
            skip_next_delay: false,
            pending_start: false,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_conditions_op(mut self, op: ConditionsOp) -> Self {
        self.conditions_op = op;
        self
    }

    pub fn with_condition(mut self, condition: Box<dyn ActivityCondition>) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: Box<dyn ActivityAction>) -> Self {
        self.actions.push(ActionEntry::new(action));
        self
    }

    pub fn with_entry(mut self, entry: ActionEntry) -> Self {
        self.actions.push(entry);
        self
    }

    pub fn with_action_delay(mut self, delay_ms: f32) -> Self {
        self.action_delay_ms = delay_ms.max(0.0);
        self
    }

    /// Independent idle copy of a template
    pub fn instantiate(&self) -> Self {
        let mut copy = self.clone();
        copy.current = NOT_RUNNING;
        copy.finished = false;
        copy.paused = false;
        copy.delay_remaining_ms = 0.0;
        copy.skip_next_delay = false;
        copy.pending_start = false;
        copy.priority = copy.orig_priority;
        copy
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn orig_priority(&self) -> f32 {
        self.orig_priority
    }

    /// Change the running priority; `cancel` and completion restore it
    pub fn set_priority(&mut self, priority: f32) {
        self.priority = priority;
    }

    pub fn boost_priority(&mut self, amount: f32) {
        self.priority += amount;
    }

    pub fn current_action_index(&self) -> i32 {
        self.current
    }

    pub fn current_action(&self) -> Option<&dyn ActivityAction> {
        self.current_index().map(|i| self.actions[i].action.as_ref())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_running(&self) -> bool {
        self.current >= 0 && !self.finished
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn conditions(&self) -> &[Box<dyn ActivityCondition>] {
        &self.conditions
    }

    pub fn actions(&self) -> &[ActionEntry] {
        &self.actions
    }

    pub fn actions_mut(&mut self) -> &mut [ActionEntry] {
        &mut self.actions
    }

    pub fn conditions_mut(&mut self) -> &mut [Box<dyn ActivityCondition>] {
        &mut self.conditions
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.label_index(label).is_some()
    }

    pub fn status(&self) -> ActivityStatus {
        ActivityStatus {
            code: self.code.clone(),
            slot: self.slot,
            priority: self.priority,
            current_action: self.current,
            finished: self.finished,
            paused: self.paused,
        }
    }

    pub fn conditions_satisfied(&self, ctx: &ConditionContext) -> bool {
        evaluate_all(&self.conditions, self.conditions_op, ctx)
    }

    pub fn start(&mut self, ctx: &mut ActionContext) {
        self.finished = false;
        self.paused = false;
        self.delay_remaining_ms = 0.0;
        self.skip_next_delay = false;
        self.pending_start = false;
        self.current = 0;
        if !self.actions.is_empty() {
            self.start_current(ctx);
        }
    }

    /// Advance by one step: poll the current action and move past it once
    /// it reports finished.
    pub fn on_tick(&mut self, dt: f32, ctx: &mut ActionContext) {
        if !self.is_running() || self.paused {
            return;
        }
        if self.delay_remaining_ms > 0.0 {
            self.delay_remaining_ms -= dt * 1000.0;
            if self.delay_remaining_ms > 0.0 {
                return;
            }
            self.delay_remaining_ms = 0.0;
        }
        let Some(index) = self.current_index() else {
            self.reset_to_idle();
            return;
        };
        if std::mem::take(&mut self.pending_start) {
            self.start_current(ctx);
            return;
        }

        self.actions[index].action.on_tick(dt, ctx);
        self.apply_flow(ctx);
        if self.current != index as i32 || !self.is_running() {
            return;
        }
        if !self.actions[index].action.is_finished() {
            return;
        }

        self.actions[index].action.finish(ctx);
        let next = index + 1;
        if next >= self.actions.len() {
            self.reset_to_idle();
            return;
        }
        self.current = next as i32;
        let skip = std::mem::take(&mut self.skip_next_delay);
        if skip || self.action_delay_ms <= 0.0 {
            self.delay_remaining_ms = 0.0;
            self.start_current(ctx);
        } else {
            self.delay_remaining_ms = self.action_delay_ms;
            self.pending_start = true;
        }
    }

    pub fn cancel(&mut self, ctx: &mut ActionContext) {
        if let Some(index) = self.current_index() {
            if self.is_running() && !self.pending_start {
                self.actions[index].action.cancel(ctx);
            }
        }
        self.reset_to_idle();
    }

    pub fn pause(&mut self, kind: Interruption, ctx: &mut ActionContext) {
        if !self.is_running() || self.paused {
            return;
        }
        self.paused = true;
        if self.pending_start {
            return;
        }
        if let Some(index) = self.current_index() {
            self.actions[index].action.pause(kind, ctx);
        }
    }

    pub fn resume(&mut self, ctx: &mut ActionContext) {
        if !self.paused {
            return;
        }
        self.paused = false;
        if self.pending_start {
            return;
        }
        if let Some(index) = self.current_index() {
            self.actions[index].action.resume(ctx);
        }
    }

    /// Continue from the action labelled `label`, cancelling the current one
    pub fn jump_to(&mut self, label: &str, ctx: &mut ActionContext) -> bool {
        let Some(target) = self.label_index(label) else {
            return false;
        };
        if let Some(index) = self.current_index() {
            if self.is_running() && !self.pending_start {
                self.actions[index].action.cancel(ctx);
            }
        }
        self.finished = false;
        self.paused = false;
        self.delay_remaining_ms = 0.0;
        self.pending_start = false;
        self.current = target as i32;
        self.start_current(ctx);
        true
    }

    pub fn store_state(&self, tree: &mut AttributeTree) -> Result<()> {
        tree.set_int("currentAction", self.current as i64);
        tree.set_bool("finished", self.finished);
        tree.set_bool("paused", self.paused);
        tree.set_float("priority", self.priority as f64);
        tree.set_float("delayMs", self.delay_remaining_ms as f64);
        tree.set_bool("pendingStart", self.pending_start);
        for (i, entry) in self.actions.iter().enumerate() {
            store_action(entry.action.as_ref(), tree.tree_mut(&format!("action{}", i)))?;
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            store_condition(condition.as_ref(), tree.tree_mut(&format!("condition{}", i)))?;
        }
        Ok(())
    }

    /// Restore onto a fresh instance of the same template
    pub fn load_state(&mut self, tree: &AttributeTree) -> Result<()> {
        for (i, entry) in self.actions.iter_mut().enumerate() {
            if let Some(sub) = tree.get_tree(&format!("action{}", i)) {
                load_action(entry.action.as_mut(), sub)?;
            }
        }
        for (i, condition) in self.conditions.iter_mut().enumerate() {
            if let Some(sub) = tree.get_tree(&format!("condition{}", i)) {
                load_condition(condition.as_mut(), sub)?;
            }
        }

        let current = tree.get_int_or("currentAction", NOT_RUNNING as i64) as i32;
        self.current = if current >= 0 && (current as usize) < self.actions.len() {
            current
        } else {
            NOT_RUNNING
        };
        self.finished = tree.get_bool_or("finished", self.current == NOT_RUNNING && self.finished);
        self.paused = tree.get_bool_or("paused", false);
        self.priority = tree.get_float_or("priority", self.orig_priority as f64) as f32;
        self.delay_remaining_ms = tree.get_float_or("delayMs", 0.0) as f32;
        self.pending_start = self.current != NOT_RUNNING && tree.get_bool_or("pendingStart", false);
        Ok(())
    }

    fn current_index(&self) -> Option<usize> {
        if self.current >= 0 && (self.current as usize) < self.actions.len() {
            Some(self.current as usize)
        } else {
            None
        }
    }

    fn label_index(&self, label: &str) -> Option<usize> {
        self.actions
            .iter()
            .position(|e| e.label.as_deref() == Some(label))
    }

    fn start_current(&mut self, ctx: &mut ActionContext) {
        if let Some(index) = self.current_index() {
            self.actions[index].action.start(ctx);
            self.apply_flow(ctx);
        }
    }

    /// Act on what the last action call left in the outbox
    fn apply_flow(&mut self, ctx: &mut ActionContext) {
        for _ in 0..MAX_JUMPS_PER_STEP {
            if std::mem::take(&mut ctx.outbox.clear_delay) {
                self.delay_remaining_ms = 0.0;
                self.skip_next_delay = true;
            }
            let Some(label) = ctx.outbox.jump.take() else {
                return;
            };
            let Some(target) = self.label_index(&label) else {
                tracing::warn!(entity = %ctx.entity_id(), activity = %self.code, label = %label, "jump to unknown label ignored");
                return;
            };
            self.current = target as i32;
            self.delay_remaining_ms = 0.0;
            self.pending_start = false;
            self.actions[target].action.start(ctx);
        }
        if ctx.outbox.jump.take().is_some() {
            tracing::warn!(entity = %ctx.entity_id(), activity = %self.code, "jump chain too long, stopping");
        }
    }

    fn reset_to_idle(&mut self) {
        self.current = NOT_RUNNING;
        self.finished = true;
        self.paused = false;
        self.delay_remaining_ms = 0.0;
        self.skip_next_delay = false;
        self.pending_start = false;
        self.priority = self.orig_priority;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::actions::{SetVariableAction, TeleportAction, WaitAction};
    use crate::activity::testing::run_with_ctx;
    use crate::core::types::{IVec3, Vec3};
    use crate::entity::AttributeValue;
    use crate::tasks::testing::Fixture;

    fn tick(activity: &mut Activity, fx: &mut Fixture, dt: f32) {
        run_with_ctx(fx, &[], IVec3::ZERO, |ctx| activity.on_tick(dt, ctx));
    }

    #[test]
    fn test_start_and_complete_indices() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("walk", 0, 1.0)
            .with_action(Box::new(WaitAction::new(100.0)))
            .with_action(Box::new(SetVariableAction::new("done", AttributeValue::Bool(true))));
        assert_eq!(activity.current_action_index(), -1);

        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));
        assert_eq!(activity.current_action_index(), 0);
        assert!(!activity.is_finished());
        assert!(activity.is_running());

        for _ in 0..4 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert_eq!(activity.current_action_index(), -1);
        assert!(activity.is_finished());
        assert_eq!(fx.entity.attributes.get_bool("done"), Some(true));
    }

    #[test]
    fn test_action_delay_holds_next_effect() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("slow", 0, 1.0)
            .with_action(Box::new(WaitAction::new(0.0)))
            .with_action(Box::new(SetVariableAction::new("done", AttributeValue::Bool(true))))
            .with_action_delay(1000.0);
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));

        tick(&mut activity, &mut fx, 0.05);
        assert_eq!(activity.current_action_index(), 1);
        assert_eq!(fx.entity.attributes.get_bool("done"), None);

        for _ in 0..15 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert_eq!(fx.entity.attributes.get_bool("done"), None);
        assert!(activity.is_running());

        for _ in 0..6 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert_eq!(fx.entity.attributes.get_bool("done"), Some(true));
        tick(&mut activity, &mut fx, 0.05);
        assert!(activity.is_finished());
    }

    #[test]
    fn test_cancel_during_delay_leaves_next_action_untouched() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("slow", 0, 1.0)
            .with_action(Box::new(WaitAction::new(0.0)))
            .with_action(Box::new(SetVariableAction::new("done", AttributeValue::Bool(true))))
            .with_action_delay(500.0);
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));
        tick(&mut activity, &mut fx, 0.05);

        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.cancel(ctx));
        for _ in 0..20 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert!(activity.is_finished());
        assert_eq!(fx.entity.attributes.get_bool("done"), None);
    }

    #[test]
    fn test_teleport_skips_following_delay() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("blink", 0, 1.0)
            .with_action(Box::new(TeleportAction::new(Vec3::new(4.0, 1.0, 4.0), 0.0)))
            .with_action(Box::new(WaitAction::new(0.0)))
            .with_action_delay(1000.0);
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));

        tick(&mut activity, &mut fx, 0.05);
        tick(&mut activity, &mut fx, 0.05);
        assert!(activity.is_finished());
    }

    #[test]
    fn test_boost_reverts_on_finish_and_cancel() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("boosted", 0, 3.0).with_action(Box::new(WaitAction::new(50.0)));

        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));
        activity.boost_priority(4.0);
        assert_eq!(activity.priority(), 7.0);
        tick(&mut activity, &mut fx, 0.05);
        assert!(activity.is_finished());
        assert_eq!(activity.priority(), 3.0);

        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));
        activity.set_priority(9.0);
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.cancel(ctx));
        assert!(activity.is_finished());
        assert_eq!(activity.current_action_index(), -1);
        assert_eq!(activity.priority(), 3.0);
    }

    #[test]
    fn test_pause_freezes_position_in_sequence() {
        let mut fx = Fixture::on_flat_ground();
        let mut activity = Activity::new("chat", 0, 1.0).with_action(Box::new(WaitAction::new(100.0)));
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.start(ctx));
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.pause(Interruption::Dialogue, ctx));
        for _ in 0..10 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert_eq!(activity.current_action_index(), 0);
        assert!(activity.is_paused());

        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| activity.resume(ctx));
        for _ in 0..2 {
            tick(&mut activity, &mut fx, 0.05);
        }
        assert!(activity.is_finished());
    }

    #[test]
    fn test_store_load_mid_sequence() {
        let mut fx = Fixture::on_flat_ground();
        let template = Activity::new("steps", 1, 2.0)
            .with_action(Box::new(WaitAction::new(0.0)))
            .with_action(Box::new(WaitAction::new(500.0)));
        let mut running = template.instantiate();
        run_with_ctx(&mut fx, &[], IVec3::ZERO, |ctx| running.start(ctx));
        for _ in 0..3 {
            tick(&mut running, &mut fx, 0.1);
        }
        running.set_priority(5.0);

        let mut tree = AttributeTree::new();
        running.store_state(&mut tree).unwrap();
        assert_eq!(tree.get_tree("action1").and_then(|t| t.get_str("type")), Some("wait"));

        let mut restored = template.instantiate();
        restored.load_state(&tree).unwrap();
        assert_eq!(restored.current_action_index(), 1);
        assert_eq!(restored.priority(), 5.0);
        assert!(restored.is_running());

        // 200ms elapsed in the wait before saving
        for _ in 0..2 {
            tick(&mut restored, &mut fx, 0.1);
        }
        assert!(restored.is_running());
        tick(&mut restored, &mut fx, 0.1);
        assert!(restored.is_finished());
    }
}
