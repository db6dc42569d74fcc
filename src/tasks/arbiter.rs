//! Per-entity task arbitration
//!
//! Every tick the arbiter scans its tasks in descending priority. An idle
//! slot goes to the first task whose `should_execute` holds; an occupied
//! slot is only taken over by a task whose priority beats the active task's
//! `priorityForCancel`. Active tasks are then continued, and finished when
//! they report completion.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::context::BehaviorEnv;
use crate::core::error::{Result, SchedulerError};
use crate::entity::EntityState;
use crate::tasks::AiTask;

const EVENT_LOG_CAPACITY: usize = 64;

/// Lifecycle transitions, kept for hosts and tests to inspect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TaskEvent {
    Started { code: String, slot: i32 },
    Preempted { code: String, by: String },
    Finished { code: String, cancelled: bool },
}

#[derive(Debug, Default)]
pub struct TaskArbiter {
    tasks: Vec<Box<dyn AiTask>>,
    /// slot -> index into `tasks`
    active_by_slot: BTreeMap<i32, usize>,
    events: VecDeque<TaskEvent>,
}

impl TaskArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task(&mut self, task: Box<dyn AiTask>) {
        tracing::debug!(code = task.code(), slot = task.slot(), priority = task.priority(), "task registered");
        self.tasks.push(task);
    }

    /// Remove a task by code, finishing it first if it is running
    pub fn remove_task(&mut self, code: &str, env: &mut BehaviorEnv) -> bool {
        let Some(index) = self.index_of(code) else {
            return false;
        };
        let slot = self.tasks[index].slot();
        if self.active_by_slot.get(&slot) == Some(&index) {
            self.finish(slot, true, env);
        }
        self.tasks.remove(index);
        for active in self.active_by_slot.values_mut() {
            if *active > index {
                *active -= 1;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &dyn AiTask> {
        self.tasks.iter().map(|t| t.as_ref())
    }

    pub fn task(&self, code: &str) -> Option<&dyn AiTask> {
        self.index_of(code).map(|i| self.tasks[i].as_ref())
    }

    pub fn is_task_active(&self, code: &str) -> bool {
        self.index_of(code)
            .map(|i| self.active_by_slot.get(&self.tasks[i].slot()) == Some(&i))
            .unwrap_or(false)
    }

    pub fn active_task(&self, slot: i32) -> Option<&dyn AiTask> {
        self.active_by_slot.get(&slot).map(|&i| self.tasks[i].as_ref())
    }

    pub fn active_count(&self) -> usize {
        self.active_by_slot.len()
    }

    /// Add a transient priority boost to a task; it decays back each tick
    pub fn boost_priority(&mut self, code: &str, amount: f32) -> bool {
        match self.index_of(code) {
            Some(i) => {
                self.tasks[i].base_mut().boost(amount);
                true
            }
            None => false,
        }
    }

    /// Start a task immediately, bypassing `should_execute` and cancelling
    /// whatever holds its slot.
    pub fn execute_task(&mut self, code: &str, env: &mut BehaviorEnv) -> Result<()> {
        let index = self.index_of(code).ok_or_else(|| SchedulerError::UnknownType {
            family: "task",
            type_code: code.to_string(),
        })?;
        let slot = self.tasks[index].slot();
        match self.active_by_slot.get(&slot).copied() {
            Some(active) if active == index => return Ok(()),
            Some(active) => self.preempt(active, index, env),
            None => self.start(index, env),
        }
        Ok(())
    }

    /// Cancel a running task; false if it was not running
    pub fn stop_task(&mut self, code: &str, env: &mut BehaviorEnv) -> bool {
        if !self.is_task_active(code) {
            return false;
        }
        let Some(index) = self.index_of(code) else {
            return false;
        };
        let slot = self.tasks[index].slot();
        self.finish(slot, true, env);
        true
    }

    /// Cancel every running task (despawn teardown)
    pub fn stop_all(&mut self, env: &mut BehaviorEnv) {
        let slots: Vec<i32> = self.active_by_slot.keys().copied().collect();
        for slot in slots {
            self.finish(slot, true, env);
        }
    }

    pub fn on_entity_spawn(&mut self, entity: &mut EntityState) {
        for task in &mut self.tasks {
            task.on_entity_spawn(entity);
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &TaskEvent> {
        self.events.iter()
    }

    pub fn drain_events(&mut self) -> Vec<TaskEvent> {
        self.events.drain(..).collect()
    }

    pub fn tick(&mut self, dt: f32, env: &mut BehaviorEnv) {
        self.check_invariants();

        for task in &mut self.tasks {
            task.base_mut().decay_boost(dt);
        }

        for index in self.priority_order() {
            let slot = self.tasks[index].slot();
            match self.active_by_slot.get(&slot).copied() {
                None => {
                    if self.tasks[index].should_execute(env) {
                        self.start(index, env);
                    }
                }
                Some(active) if active == index => {}
                Some(active) => {
                    let challenger = self.tasks[index].priority();
                    let holder = self.tasks[active].base().priority_for_cancel();
                    if challenger > holder && self.tasks[index].should_execute(env) {
                        self.preempt(active, index, env);
                    }
                }
            }
        }

        let running: Vec<(i32, usize)> = self.active_by_slot.iter().map(|(&s, &i)| (s, i)).collect();
        for (slot, index) in running {
            if !self.tasks[index].continue_execute(dt, env) {
                self.finish(slot, false, env);
            }
        }
    }

    /// Task indices by descending effective priority; ties keep
    /// registration order.
    fn priority_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by_key(|&i| Reverse(OrderedFloat(self.tasks[i].priority())));
        order
    }

    fn index_of(&self, code: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.code() == code)
    }

    fn start(&mut self, index: usize, env: &mut BehaviorEnv) {
        let slot = self.tasks[index].slot();
        self.active_by_slot.insert(slot, index);
        self.tasks[index].start_execute(env);
        let code = self.tasks[index].code().to_string();
        tracing::debug!(entity = %env.entity.id, code = %code, slot, "task started");
        self.push_event(TaskEvent::Started { code, slot });
    }

    fn preempt(&mut self, active: usize, challenger: usize, env: &mut BehaviorEnv) {
        let old = self.tasks[active].code().to_string();
        let new = self.tasks[challenger].code().to_string();
        tracing::debug!(entity = %env.entity.id, preempted = %old, by = %new, "task preempted");
        self.tasks[active].finish_execute(true, env);
        self.active_by_slot.remove(&self.tasks[active].slot());
        self.push_event(TaskEvent::Preempted { code: old, by: new });
        self.start(challenger, env);
    }

    fn finish(&mut self, slot: i32, cancelled: bool, env: &mut BehaviorEnv) {
        let Some(index) = self.active_by_slot.remove(&slot) else {
            return;
        };
        self.tasks[index].finish_execute(cancelled, env);
        let code = self.tasks[index].code().to_string();
        tracing::debug!(entity = %env.entity.id, code = %code, cancelled, "task finished");
        self.push_event(TaskEvent::Finished { code, cancelled });
    }

    fn push_event(&mut self, event: TaskEvent) {
        if self.events.len() == EVENT_LOG_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Every active entry must point at a live task registered for that
    /// slot. Fatal in debug builds; release builds drop the bad entry.
    fn check_invariants(&mut self) {
        let task_count = self.tasks.len();
        let tasks = &self.tasks;
        let bad: Vec<i32> = self
            .active_by_slot
            .iter()
            .filter(|(slot, index)| **index >= task_count || tasks[**index].slot() != **slot)
            .map(|(slot, _)| *slot)
            .collect();

        debug_assert!(bad.is_empty(), "arbiter holds dangling active slots: {:?}", bad);
        for slot in bad {
            tracing::error!(slot, "dropping dangling active task entry");
            self.active_by_slot.remove(&slot);
        }
    }
}
