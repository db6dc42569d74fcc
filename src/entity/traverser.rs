//! Movement executor contract
//!
//! Pathfinding itself lives outside the scheduler. Behaviors hand a goal to
//! the traverser and poll its [`TraverserStatus`] on later ticks; there are
//! no completion callbacks. Only one behavior may drive the traverser at a
//! time, and it must call [`Traverser::stop`] before giving it up.

use serde::{Deserialize, Serialize};

use crate::core::types::{block_pos, Vec3};
use crate::entity::environment::WorldAccess;

/// Progress of the current movement goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TraverserStatus {
    /// No goal assigned
    #[default]
    Idle,
    /// Moving toward the goal
    Walking,
    /// Goal reached within the arrival threshold
    Arrived,
    /// Movement blocked; the goal was abandoned
    Stuck,
}

/// A movement goal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkRequest {
    pub target: Vec3,
    /// World units per second
    pub speed: f32,
    /// Distance at which the goal counts as reached
    pub arrival_distance: f32,
}

impl WalkRequest {
    pub fn new(target: Vec3, speed: f32, arrival_distance: f32) -> Self {
        Self {
            target,
            speed,
            arrival_distance,
        }
    }
}

pub trait Traverser: std::fmt::Debug {
    /// Begin moving toward a goal, replacing any previous one.
    /// Returns false if the goal was refused outright.
    fn walk_towards(&mut self, request: WalkRequest) -> bool;

    /// Abandon the current goal
    fn stop(&mut self);

    fn status(&self) -> TraverserStatus;

    fn current_target(&self) -> Option<Vec3>;

    /// Move `pos` along the current goal by one simulation step
    fn advance(&mut self, pos: &mut Vec3, dt: f32, world: &dyn WorldAccess);

    fn is_active(&self) -> bool {
        self.status() == TraverserStatus::Walking
    }
}

/// Straight-line mover: walks directly at the goal and reports `Stuck` as
/// soon as the next step would enter a solid block.
#[derive(Debug, Clone, Default)]
pub struct StraightLineTraverser {
    goal: Option<WalkRequest>,
    status: TraverserStatus,
    stop_count: u32,
}

impl StraightLineTraverser {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `stop` has been called (diagnostics)
    pub fn stop_count(&self) -> u32 {
        self.stop_count
    }
}

impl Traverser for StraightLineTraverser {
    fn walk_towards(&mut self, request: WalkRequest) -> bool {
        if !request.target.is_finite() || request.speed <= 0.0 {
            return false;
        }
        self.goal = Some(request);
        self.status = TraverserStatus::Walking;
        true
    }

    fn stop(&mut self) {
        self.goal = None;
        self.status = TraverserStatus::Idle;
        self.stop_count += 1;
    }

    fn status(&self) -> TraverserStatus {
        self.status
    }

    fn current_target(&self) -> Option<Vec3> {
        self.goal.map(|g| g.target)
    }

    fn advance(&mut self, pos: &mut Vec3, dt: f32, world: &dyn WorldAccess) {
        let Some(goal) = self.goal else {
            return;
        };
        if self.status() != TraverserStatus::Walking {
            return;
        }

        let to_goal = goal.target - *pos;
        let distance = to_goal.length();
        if distance <= goal.arrival_distance {
            self.status = TraverserStatus::Arrived;
            self.goal = None;
            return;
        }

        let step = (goal.speed * dt).min(distance);
        let next = *pos + to_goal / distance * step;
        if world.block(block_pos(next)).solid {
            self.status = TraverserStatus::Stuck;
            self.goal = None;
            return;
        }

        *pos = next;
        if (goal.target - *pos).length() <= goal.arrival_distance {
            self.status = TraverserStatus::Arrived;
            self.goal = None;
        }
    }
}
