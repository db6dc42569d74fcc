use serde::{Deserialize, Serialize};

use crate::activity::action::{ActivityAction, Interruption};
use crate::activity::context::ActionContext;
use crate::core::types::Vec3;
use crate::entity::attributes::AttributeTree;
use crate::entity::traverser::{TraverserStatus, WalkRequest};

/// Walk to an authored position (plus the activity offset).
/// Pausing stops the traverser; resuming issues the walk again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WalkToAction {
    pub target_x: f32,
    pub target_y: f32,
    pub target_z: f32,
    pub movespeed: f32,
    pub arrival_distance: f32,
    #[serde(skip)]
    goal: Option<Vec3>,
    #[serde(skip)]
    paused: bool,
    #[serde(skip)]
    done: bool,
}

impl Default for WalkToAction {
    fn default() -> Self {
        Self {
            target_x: 0.0,
            target_y: 0.0,
            target_z: 0.0,
            movespeed: 1.5,
            arrival_distance: 0.5,
            goal: None,
            paused: false,
            done: false,
        }
    }
}

impl WalkToAction {
    pub const TYPE: &'static str = "walkto";

    pub fn new(target: Vec3, movespeed: f32) -> Self {
        Self {
            target_x: target.x,
            target_y: target.y,
            target_z: target.z,
            movespeed,
            ..Self::default()
        }
    }

    fn issue_walk(&mut self, ctx: &mut ActionContext) {
        let Some(goal) = self.goal else {
            return;
        };
        let request = WalkRequest::new(goal, self.movespeed, self.arrival_distance);
        if !ctx.env.entity.traverser.walk_towards(request) {
            tracing::warn!(entity = %ctx.entity_id(), ?goal, "walkto goal refused, skipping");
            self.done = true;
        }
    }
}

impl ActivityAction for WalkToAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, ctx: &mut ActionContext) {
        self.done = false;
        self.paused = false;
        self.goal = Some(ctx.relocate(Vec3::new(self.target_x, self.target_y, self.target_z)));
        self.issue_walk(ctx);
    }

    fn on_tick(&mut self, _dt: f32, ctx: &mut ActionContext) {
        if self.done || self.paused {
            return;
        }
        let Some(goal) = self.goal else {
            self.done = true;
            return;
        };
        if ctx.env.entity.pos.distance(goal) <= self.arrival_distance {
            self.done = true;
            return;
        }
        match ctx.env.entity.traverser.status() {
            TraverserStatus::Walking => {}
            TraverserStatus::Arrived => self.done = true,
            TraverserStatus::Stuck => {
                tracing::debug!(entity = %ctx.entity_id(), ?goal, "walkto stuck, moving on");
                self.done = true;
            }
            // Someone else released the traverser, or we were reloaded
            TraverserStatus::Idle => self.issue_walk(ctx),
        }
    }

    fn is_finished(&self) -> bool {
        self.done
    }

    fn cancel(&mut self, ctx: &mut ActionContext) {
        if !self.done {
            ctx.env.entity.traverser.stop();
        }
        self.done = true;
    }

    fn pause(&mut self, _kind: Interruption, ctx: &mut ActionContext) {
        if !self.done {
            ctx.env.entity.traverser.stop();
            self.paused = true;
        }
    }

    fn resume(&mut self, ctx: &mut ActionContext) {
        if self.paused {
            self.paused = false;
            self.issue_walk(ctx);
        }
    }

    fn store_state(&self, tree: &mut AttributeTree) {
        tree.set_bool("done", self.done);
        if let Some(goal) = self.goal {
            tree.set_vec3("goal", goal);
        }
    }

    fn load_state(&mut self, tree: &AttributeTree) {
        self.done = tree.get_bool_or("done", false);
        self.goal = tree.get_vec3("goal");
    }
}
