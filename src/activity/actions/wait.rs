use serde::{Deserialize, Serialize};

use crate::activity::action::ActivityAction;
use crate::activity::context::ActionContext;
use crate::entity::attributes::AttributeTree;

/// Do nothing for `durationMs` of simulation time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaitAction {
    pub duration_ms: f32,
    #[serde(skip)]
    elapsed_ms: f32,
}

impl WaitAction {
    pub const TYPE: &'static str = "wait";

    pub fn new(duration_ms: f32) -> Self {
        Self {
            duration_ms,
            elapsed_ms: 0.0,
        }
    }

    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed_ms
    }
}

impl ActivityAction for WaitAction {
    fn type_code(&self) -> &'static str {
        Self::TYPE
    }

    fn start(&mut self, _ctx: &mut ActionContext) {
        self.elapsed_ms = 0.0;
    }

    fn on_tick(&mut self, dt: f32, _ctx: &mut ActionContext) {
        self.elapsed_ms += dt * 1000.0;
    }

    fn is_finished(&self) -> bool {
        self.elapsed_ms >= self.duration_ms
    }

    fn store_state(&self, tree: &mut AttributeTree) {
        tree.set_float("elapsedMs", self.elapsed_ms as f64);
    }

    fn load_state(&mut self, tree: &AttributeTree) {
        self.elapsed_ms = tree.get_float_or("elapsedMs", 0.0) as f32;
    }
}
