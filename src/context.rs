//! Per-tick environment handed to tasks, actions and conditions

use rand_chacha::ChaCha8Rng;

use crate::core::clock::GameClock;
use crate::entity::environment::WorldAccess;
use crate::entity::EntityState;

/// Everything a behavior may touch during one tick of its entity
pub struct BehaviorEnv<'a> {
    pub entity: &'a mut EntityState,
    pub world: &'a dyn WorldAccess,
    pub clock: &'a GameClock,
    pub rng: &'a mut ChaCha8Rng,
}

impl<'a> BehaviorEnv<'a> {
    pub fn new(
        entity: &'a mut EntityState,
        world: &'a dyn WorldAccess,
        clock: &'a GameClock,
        rng: &'a mut ChaCha8Rng,
    ) -> Self {
        Self {
            entity,
            world,
            clock,
            rng,
        }
    }

    /// Shorter-lived copy for passing down into a nested call
    pub fn reborrow(&mut self) -> BehaviorEnv<'_> {
        BehaviorEnv {
            entity: &mut *self.entity,
            world: self.world,
            clock: self.clock,
            rng: &mut *self.rng,
        }
    }
}
