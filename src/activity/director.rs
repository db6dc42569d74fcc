//! Activity director
//!
//! Owns the activity templates of one entity and at most one running
//! activity per slot. A start request only displaces the activity in its
//! slot when its priority is strictly higher. Templates with conditions
//! start themselves once their conditions hold; templates without
//! conditions only start on request.
//!
//! Actions talk back through [`DirectorCommand`]s. Commands aimed at this
//! director's own entity are handled before `tick` returns; the rest are
//! handed to the caller for routing.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use crate::activity::action::Interruption;
use crate::activity::context::{ActionContext, ActionOutbox, ConditionContext, DirectorCommand};
use crate::activity::sequence::{Activity, ActivityStatus};
use crate::context::BehaviorEnv;
use crate::core::error::{Result, SchedulerError};
use crate::core::types::{EntityId, IVec3};
use crate::entity::attributes::{AttributeTree, AttributeValue};

/// Rounds of self-addressed commands handled per call
const MAX_COMMAND_ROUNDS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum StartOutcome {
    Started,
    /// Displaced a lower-priority activity in the same slot
    Replaced,
    /// The slot holds an activity of equal or higher priority
    Rejected,
    AlreadyRunning,
}

#[derive(Debug, Clone, Default)]
pub struct ActivityDirector {
    templates: BTreeMap<String, Activity>,
    /// One live instance per code, running or finished
    live: BTreeMap<String, Activity>,
    /// slot -> code of the running activity
    running: BTreeMap<i32, String>,
    offset: IVec3,
    debug: bool,
    outbound: Vec<DirectorCommand>,
}

impl ActivityDirector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(templates: impl IntoIterator<Item = Activity>) -> Self {
        let mut director = Self::new();
        for template in templates {
            director.add_template(template);
        }
        director
    }

    pub fn with_offset(mut self, offset: IVec3) -> Self {
        self.offset = offset;
        self
    }

    pub fn add_template(&mut self, template: Activity) {
        if self.templates.contains_key(&template.code) {
            tracing::warn!(activity = %template.code, "replacing activity template");
        }
        self.templates.insert(template.code.clone(), template);
    }

    pub fn template(&self, code: &str) -> Option<&Activity> {
        self.templates.get(code)
    }

    /// For authoring; running instances keep their own copy
    pub fn template_mut(&mut self, code: &str) -> Option<&mut Activity> {
        self.templates.get_mut(code)
    }

    pub fn template_codes(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn live(&self, code: &str) -> Option<&Activity> {
        self.live.get(code)
    }

    pub fn offset(&self) -> IVec3 {
        self.offset
    }

    pub fn set_offset(&mut self, offset: IVec3) {
        self.offset = offset;
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Raise lifecycle logging from `debug` to `info`
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn running_activity(&self, slot: i32) -> Option<&Activity> {
        self.running.get(&slot).and_then(|code| self.live.get(code))
    }

    pub fn is_running(&self, code: &str) -> bool {
        self.running.values().any(|c| c == code)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn statuses(&self) -> Vec<ActivityStatus> {
        self.running
            .values()
            .filter_map(|code| self.live.get(code))
            .map(Activity::status)
            .collect()
    }

    /// Start a fresh instance of `code`, optionally with a different
    /// priority or slot than the template's.
    pub fn start_activity(
        &mut self,
        code: &str,
        priority: Option<f32>,
        slot: Option<i32>,
        env: &mut BehaviorEnv,
    ) -> Result<StartOutcome> {
        let outcome = self.start_inner(code, priority, slot, env)?;
        if outcome == StartOutcome::Rejected {
            Self::log_lifecycle(self.debug, env.entity.id, code, "rejected");
        }
        self.process_local_commands(env);
        Ok(outcome)
    }

    pub fn cancel_activity(&mut self, code: &str, env: &mut BehaviorEnv) -> Result<()> {
        if !self.templates.contains_key(code) && !self.live.contains_key(code) {
            return Err(SchedulerError::UnknownActivity(code.to_string()));
        }
        self.cancel_live(code, env);
        self.process_local_commands(env);
        Ok(())
    }

    pub fn cancel_all(&mut self, env: &mut BehaviorEnv) {
        let codes: Vec<String> = self.running.values().cloned().collect();
        for code in codes {
            self.cancel_live(&code, env);
        }
        self.outbound.clear();
    }

    pub fn pause(&mut self, kind: Interruption, env: &mut BehaviorEnv) {
        let offset = self.offset;
        for code in self.running.values() {
            if let Some(activity) = self.live.get_mut(code) {
                let mut outbox = ActionOutbox::default();
                let mut ctx = ActionContext::new(env.reborrow(), offset, &mut outbox);
                activity.pause(kind, &mut ctx);
                self.outbound.append(&mut outbox.commands);
            }
        }
    }

    pub fn resume(&mut self, env: &mut BehaviorEnv) {
        let offset = self.offset;
        for code in self.running.values() {
            if let Some(activity) = self.live.get_mut(code) {
                let mut outbox = ActionOutbox::default();
                let mut ctx = ActionContext::new(env.reborrow(), offset, &mut outbox);
                activity.resume(&mut ctx);
                self.outbound.append(&mut outbox.commands);
            }
        }
        self.process_local_commands(env);
    }

    /// Jump the first running activity that has `label`
    pub fn jump_to(&mut self, label: &str, env: &mut BehaviorEnv) -> Result<()> {
        self.jump_inner(label, env)?;
        self.process_local_commands(env);
        Ok(())
    }

    /// One scheduling step. Returns commands addressed to other entities.
    pub fn tick(&mut self, dt: f32, env: &mut BehaviorEnv) -> Vec<DirectorCommand> {
        self.check_invariants();
        self.auto_start(env);

        let offset = self.offset;
        let running: Vec<(i32, String)> = self.running.iter().map(|(s, c)| (*s, c.clone())).collect();
        for (slot, code) in running {
            // an earlier activity this tick may have displaced this one
            if self.running.get(&slot) != Some(&code) {
                continue;
            }
            let Some(activity) = self.live.get_mut(&code) else {
                continue;
            };
            let mut outbox = ActionOutbox::default();
            let mut ctx = ActionContext::new(env.reborrow(), offset, &mut outbox);
            activity.on_tick(dt, &mut ctx);
            let finished = activity.is_finished();
            self.outbound.append(&mut outbox.commands);

            if finished {
                self.running.remove(&slot);
                Self::log_lifecycle(self.debug, env.entity.id, &code, "finished");
            }
        }

        self.process_local_commands(env);
        std::mem::take(&mut self.outbound)
    }

    pub fn store_state(&self, tree: &mut AttributeTree) -> Result<()> {
        *tree = AttributeTree::new();
        tree.set_ivec3("offset", self.offset);
        let running = tree.tree_mut("running");
        for (slot, code) in &self.running {
            running.set_str(slot.to_string(), code.clone());
        }
        let live = tree.tree_mut("activities");
        for (code, activity) in &self.live {
            let sub = live.tree_mut(code);
            sub.set_int("slot", activity.slot as i64);
            activity.store_state(sub)?;
        }
        Ok(())
    }

    /// Rebuild live instances from their templates, then restore them.
    /// Saved activities whose template is gone are dropped.
    pub fn load_state(&mut self, tree: &AttributeTree) -> Result<()> {
        self.offset = tree.get_ivec3("offset").unwrap_or(self.offset);
        self.live.clear();
        self.running.clear();
        self.outbound.clear();

        if let Some(saved) = tree.get_tree("activities") {
            for (code, value) in saved.iter() {
                let AttributeValue::Tree(sub) = value else {
                    continue;
                };
                let Some(template) = self.templates.get(code) else {
                    tracing::warn!(activity = code, "no template for saved activity, dropped");
                    continue;
                };
                let mut activity = template.instantiate();
                activity.slot = sub.get_int_or("slot", activity.slot as i64) as i32;
                activity.load_state(sub)?;
                self.live.insert(code.to_string(), activity);
            }
        }

        if let Some(running) = tree.get_tree("running") {
            for (slot, value) in running.iter() {
                let (Ok(slot), AttributeValue::Str(code)) = (slot.parse::<i32>(), value) else {
                    continue;
                };
                if self.live.get(code).is_some_and(Activity::is_running) {
                    self.running.insert(slot, code.clone());
                }
            }
        }
        Ok(())
    }

    fn start_inner(
        &mut self,
        code: &str,
        priority: Option<f32>,
        slot: Option<i32>,
        env: &mut BehaviorEnv,
    ) -> Result<StartOutcome> {
        let template = self
            .templates
            .get(code)
            .ok_or_else(|| SchedulerError::UnknownActivity(code.to_string()))?;
        if self.is_running(code) {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let mut activity = template.instantiate();
        if let Some(priority) = priority {
            activity.set_priority(priority);
        }
        if let Some(slot) = slot {
            activity.slot = slot;
        }

        let mut outcome = StartOutcome::Started;
        if let Some(holder) = self.running.get(&activity.slot).cloned() {
            let held = self.live.get(&holder).map_or(f32::NEG_INFINITY, Activity::priority);
            if activity.priority() <= held {
                return Ok(StartOutcome::Rejected);
            }
            self.cancel_live(&holder, env);
            outcome = StartOutcome::Replaced;
        }

        let slot = activity.slot;
        let offset = self.offset;
        let mut outbox = ActionOutbox::default();
        {
            let mut ctx = ActionContext::new(env.reborrow(), offset, &mut outbox);
            activity.start(&mut ctx);
        }
        self.outbound.append(&mut outbox.commands);
        self.live.insert(code.to_string(), activity);
        self.running.insert(slot, code.to_string());
        Self::log_lifecycle(self.debug, env.entity.id, code, "started");
        Ok(outcome)
    }

    fn cancel_live(&mut self, code: &str, env: &mut BehaviorEnv) {
        let was_running = self.is_running(code);
        self.running.retain(|_, c| c != code);
        if !was_running {
            return;
        }
        if let Some(activity) = self.live.get_mut(code) {
            let mut outbox = ActionOutbox::default();
            let mut ctx = ActionContext::new(env.reborrow(), self.offset, &mut outbox);
            activity.cancel(&mut ctx);
            self.outbound.append(&mut outbox.commands);
        }
        Self::log_lifecycle(self.debug, env.entity.id, code, "cancelled");
    }

    fn jump_inner(&mut self, label: &str, env: &mut BehaviorEnv) -> Result<()> {
        let offset = self.offset;
        let target = self
            .running
            .values()
            .find(|code| self.live.get(*code).is_some_and(|a| a.has_label(label)))
            .cloned();
        let Some(code) = target else {
            return Err(SchedulerError::UnknownJumpTarget(label.to_string()));
        };
        if let Some(activity) = self.live.get_mut(&code) {
            let mut outbox = ActionOutbox::default();
            let mut ctx = ActionContext::new(env.reborrow(), offset, &mut outbox);
            activity.jump_to(label, &mut ctx);
            self.outbound.append(&mut outbox.commands);
        }
        Ok(())
    }

    /// Start every idle, conditioned template whose conditions hold,
    /// highest priority first
    fn auto_start(&mut self, env: &mut BehaviorEnv) {
        let mut candidates: Vec<(f32, String)> = self
            .templates
            .values()
            .filter(|t| !t.conditions().is_empty() && !self.is_running(&t.code))
            .map(|t| (t.priority(), t.code.clone()))
            .collect();
        candidates.sort_by_key(|(priority, _)| Reverse(OrderedFloat(*priority)));

        for (_, code) in candidates {
            let holds = match self.templates.get(&code) {
                Some(template) => {
                    let ctx = ConditionContext::from_env(env, self.offset);
                    template.conditions_satisfied(&ctx)
                }
                None => false,
            };
            if !holds {
                continue;
            }
            if let Err(e) = self.start_inner(&code, None, None, env) {
                tracing::warn!(activity = %code, error = %e, "auto-start failed");
            }
        }
    }

    /// Handle commands aimed at our own entity; leave the rest queued
    fn process_local_commands(&mut self, env: &mut BehaviorEnv) {
        let me = env.entity.id;
        for _ in 0..MAX_COMMAND_ROUNDS {
            let (local, remote): (Vec<_>, Vec<_>) =
                std::mem::take(&mut self.outbound).into_iter().partition(|c| c.target() == me);
            self.outbound = remote;
            if local.is_empty() {
                return;
            }
            for command in local {
                self.apply_command(command, env);
            }
        }
        let dropped = self.outbound.iter().filter(|c| c.target() == me).count();
        if dropped > 0 {
            tracing::warn!(entity = %me, dropped, "self-addressed command chain too deep");
            self.outbound.retain(|c| c.target() != me);
        }
    }

    fn apply_command(&mut self, command: DirectorCommand, env: &mut BehaviorEnv) {
        let result = match command {
            DirectorCommand::StartActivity {
                code, priority, slot, ..
            } => self.start_inner(&code, priority, slot, env).map(|outcome| {
                if outcome == StartOutcome::Rejected {
                    Self::log_lifecycle(self.debug, env.entity.id, &code, "rejected");
                }
            }),
            DirectorCommand::CancelActivity { code, .. } => {
                if self.templates.contains_key(&code) || self.live.contains_key(&code) {
                    self.cancel_live(&code, env);
                    Ok(())
                } else {
                    Err(SchedulerError::UnknownActivity(code))
                }
            }
            DirectorCommand::JumpTo { label, .. } => self.jump_inner(&label, env),
        };
        if let Err(e) = result {
            tracing::warn!(entity = %env.entity.id, error = %e, "director command failed");
        }
    }

    /// Every running slot maps to a live, running instance in that slot
    fn check_invariants(&mut self) {
        let live = &self.live;
        let broken: Vec<i32> = self
            .running
            .iter()
            .filter(|(slot, code)| {
                !live
                    .get(*code)
                    .is_some_and(|a| a.is_running() && a.slot == **slot)
            })
            .map(|(slot, _)| *slot)
            .collect();
        debug_assert!(broken.is_empty(), "inconsistent running slots: {:?}", broken);
        for slot in broken {
            tracing::error!(slot, "dropping inconsistent running slot");
            self.running.remove(&slot);
        }
    }

    fn log_lifecycle(debug: bool, entity: EntityId, code: &str, event: &str) {
        if debug {
            tracing::info!(entity = %entity, activity = code, event, "activity");
        } else {
            tracing::debug!(entity = %entity, activity = code, event, "activity");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::actions::{JumpToAction, StartActivityAction, TeleportAction, WaitAction};
    use crate::activity::conditions::CoordinateCondition;
    use crate::activity::sequence::ActionEntry;
    use crate::core::types::{Axis, Vec3};
    use crate::entity::environment::WorldView;
    use crate::tasks::testing::Fixture;

    fn with_env<R>(fx: &mut Fixture, f: impl FnOnce(&mut BehaviorEnv) -> R) -> R {
        let view = WorldView::new(&fx.terrain, &fx.catalog, &[]);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
        f(&mut env)
    }

    fn waiting(code: &str, slot: i32, priority: f32) -> Activity {
        Activity::new(code, slot, priority).with_action(Box::new(WaitAction::new(1000.0)))
    }

    #[test]
    fn test_higher_priority_replaces_lower_in_slot() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("low", 0, 5.0), waiting("high", 0, 10.0)]);

        with_env(&mut fx, |env| {
            assert_eq!(director.start_activity("low", None, None, env).unwrap(), StartOutcome::Started);
            assert_eq!(director.start_activity("high", None, None, env).unwrap(), StartOutcome::Replaced);
            assert_eq!(director.start_activity("low", None, None, env).unwrap(), StartOutcome::Rejected);
        });
        assert_eq!(director.running_activity(0).unwrap().code, "high");
        assert!(director.live("low").unwrap().is_finished());
    }

    #[test]
    fn test_equal_priority_does_not_replace() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("a", 0, 5.0), waiting("b", 0, 5.0)]);
        with_env(&mut fx, |env| {
            director.start_activity("a", None, None, env).unwrap();
            assert_eq!(director.start_activity("b", None, None, env).unwrap(), StartOutcome::Rejected);
            assert_eq!(director.start_activity("a", None, None, env).unwrap(), StartOutcome::AlreadyRunning);
        });
        assert_eq!(director.running_activity(0).unwrap().code, "a");
    }

    #[test]
    fn test_slots_are_independent() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("a", 0, 5.0), waiting("b", 1, 1.0)]);
        with_env(&mut fx, |env| {
            director.start_activity("a", None, None, env).unwrap();
            director.start_activity("b", None, None, env).unwrap();
        });
        assert_eq!(director.running_count(), 2);
    }

    #[test]
    fn test_overrides_and_unknown_code() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("a", 0, 5.0)]);
        with_env(&mut fx, |env| {
            director.start_activity("a", Some(7.0), Some(3), env).unwrap();
            assert!(matches!(
                director.start_activity("nope", None, None, env),
                Err(SchedulerError::UnknownActivity(_))
            ));
        });
        let running = director.running_activity(3).unwrap();
        assert_eq!(running.priority(), 7.0);
        assert_eq!(director.template("a").unwrap().priority(), 5.0);
    }

    #[test]
    fn test_finishes_and_frees_slot() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([
            Activity::new("hop", 0, 1.0).with_action(Box::new(TeleportAction::new(Vec3::new(3.0, 1.0, 3.0), 0.0)))
        ]);
        with_env(&mut fx, |env| {
            director.start_activity("hop", None, None, env).unwrap();
            director.tick(0.05, env);
        });
        assert!(director.running_activity(0).is_none());
        let hop = director.live("hop").unwrap();
        assert!(hop.is_finished());
        assert_eq!(hop.current_action_index(), -1);
        assert_eq!(fx.entity.pos, Vec3::new(3.0, 1.0, 3.0));
    }

    #[test]
    fn test_offset_applies_to_actions() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([
            Activity::new("hop", 2, 1.0).with_action(Box::new(TeleportAction::new(Vec3::new(5.0, 1.0, 0.0), 0.0)))
        ])
        .with_offset(IVec3::new(100, 0, 100));
        with_env(&mut fx, |env| director.start_activity("hop", None, None, env).unwrap());
        assert_eq!(fx.entity.pos.x, 105.0);
        assert_eq!(fx.entity.pos.z, 100.0);
    }

    #[test]
    fn test_conditioned_template_auto_starts() {
        let mut fx = Fixture::on_flat_ground();
        let low_ground = Activity::new("low_ground", 0, 1.0)
            .with_condition(Box::new(CoordinateCondition::new(Axis::Y, 5.0, false)))
            .with_action(Box::new(WaitAction::new(1000.0)));
        let mut director = ActivityDirector::with_templates([low_ground, waiting("manual", 1, 1.0)]);

        with_env(&mut fx, |env| director.tick(0.05, env));
        assert!(director.is_running("low_ground"));
        assert!(!director.is_running("manual"));

        with_env(&mut fx, |env| director.cancel_all(env));
        fx.entity.pos.y = 50.0;
        with_env(&mut fx, |env| director.tick(0.05, env));
        assert!(!director.is_running("low_ground"));
    }

    #[test]
    fn test_cancel_restores_priority() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("a", 0, 2.0)]);
        with_env(&mut fx, |env| {
            director.start_activity("a", Some(9.0), None, env).unwrap();
            director.cancel_activity("a", env).unwrap();
        });
        let a = director.live("a").unwrap();
        assert!(a.is_finished());
        assert_eq!(a.priority(), 2.0);
        assert!(director.running_activity(0).is_none());
    }

    #[test]
    fn test_self_start_command_is_handled_in_tick() {
        let mut fx = Fixture::on_flat_ground();
        let chain = Activity::new("chain", 0, 1.0).with_action(Box::new(StartActivityAction::on_self("follow")));
        let mut director = ActivityDirector::with_templates([chain, waiting("follow", 1, 1.0)]);
        let remote = with_env(&mut fx, |env| {
            director.start_activity("chain", None, None, env).unwrap();
            director.tick(0.05, env)
        });
        assert!(remote.is_empty());
        assert!(director.is_running("follow"));
    }

    #[test]
    fn test_jump_to_unknown_label() {
        let mut fx = Fixture::on_flat_ground();
        let looping = Activity::new("loop", 0, 1.0)
            .with_entry(ActionEntry::labelled("top", Box::new(WaitAction::new(100.0))))
            .with_action(Box::new(JumpToAction::new("top")));
        let mut director = ActivityDirector::with_templates([looping]);
        with_env(&mut fx, |env| {
            director.start_activity("loop", None, None, env).unwrap();
            assert!(director.jump_to("top", env).is_ok());
            assert!(matches!(
                director.jump_to("bottom", env),
                Err(SchedulerError::UnknownJumpTarget(_))
            ));
        });
        assert_eq!(director.running_activity(0).unwrap().current_action_index(), 0);
    }

    #[test]
    fn test_store_and_load_running_state() {
        let mut fx = Fixture::on_flat_ground();
        let templates = [waiting("a", 0, 2.0), waiting("b", 1, 1.0)];
        let mut director = ActivityDirector::with_templates(templates.clone()).with_offset(IVec3::new(4, 0, -4));
        with_env(&mut fx, |env| {
            director.start_activity("a", Some(6.0), None, env).unwrap();
            director.tick(0.25, env);
        });

        let mut saved = AttributeTree::new();
        director.store_state(&mut saved).unwrap();

        let mut restored = ActivityDirector::with_templates(templates);
        restored.load_state(&saved).unwrap();
        assert_eq!(restored.offset(), IVec3::new(4, 0, -4));
        let a = restored.running_activity(0).unwrap();
        assert_eq!(a.priority(), 6.0);
        assert_eq!(a.current_action_index(), 0);
        assert!(!restored.is_running("b"));
    }

    #[test]
    fn test_pause_stops_progress() {
        let mut fx = Fixture::on_flat_ground();
        let mut director = ActivityDirector::with_templates([waiting("a", 0, 1.0)]);
        with_env(&mut fx, |env| {
            director.start_activity("a", None, None, env).unwrap();
            director.pause(Interruption::Dialogue, env);
            for _ in 0..40 {
                director.tick(0.05, env);
            }
        });
        assert!(director.is_running("a"));
        assert!(director.running_activity(0).unwrap().is_paused());

        with_env(&mut fx, |env| {
            director.resume(env);
            for _ in 0..40 {
                director.tick(0.05, env);
            }
        });
        assert!(!director.is_running("a"));
    }
}
