//! Scripted activities
//!
//! An [`Activity`] is an ordered list of actions gated by conditions. Each
//! entity's [`ActivityDirector`] keeps at most one running activity per slot.

pub mod action;
pub mod actions;
pub mod condition;
pub mod conditions;
pub mod context;
pub mod director;
pub mod form;
pub mod loader;
pub mod registry;
pub mod sequence;

pub use action::{ActivityAction, Interruption};
pub use condition::{ActivityCondition, ConditionsOp};
pub use context::{ActionContext, ActionOutbox, ConditionContext, DirectorCommand};
pub use director::{ActivityDirector, StartOutcome};
pub use form::{Form, FormEditable};
pub use loader::{load_activity_file, parse_activity_toml};
pub use registry::ActivityRegistry;
pub use sequence::{ActionEntry, Activity, ActivityStatus};

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for action and condition tests

    use crate::activity::condition::ActivityCondition;
    use crate::activity::context::{ActionContext, ActionOutbox, ConditionContext};
    use crate::context::BehaviorEnv;
    use crate::core::clock::GameClock;
    use crate::core::types::{IVec3, Vec3};
    use crate::entity::attributes::AttributeTree;
    use crate::entity::environment::{EntitySnapshot, ItemCatalog, Terrain, WorldView};
    use crate::entity::EntityState;
    use crate::tasks::testing::Fixture;

    /// Run `f` against an action context built from the fixture
    pub fn run_with_ctx<R>(
        fx: &mut Fixture,
        entities: &[EntitySnapshot],
        offset: IVec3,
        f: impl FnOnce(&mut ActionContext) -> R,
    ) -> (R, ActionOutbox) {
        let view = WorldView::new(&fx.terrain, &fx.catalog, entities);
        let mut outbox = ActionOutbox::default();
        let result = {
            let env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
            let mut ctx = ActionContext::new(env, offset, &mut outbox);
            f(&mut ctx)
        };
        (result, outbox)
    }

    pub fn condition_holds(condition: &dyn ActivityCondition, pos: Vec3, offset: IVec3) -> bool {
        condition_holds_with(condition, pos, offset, AttributeTree::new())
    }

    pub fn condition_holds_with(
        condition: &dyn ActivityCondition,
        pos: Vec3,
        offset: IVec3,
        attributes: AttributeTree,
    ) -> bool {
        let mut entity = EntityState::new("villager", pos);
        entity.attributes = attributes;
        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &[]);
        let clock = GameClock::new(60.0);
        let ctx = ConditionContext::new(&entity, &view, &clock, offset);
        condition.is_satisfied(&ctx)
    }
}
