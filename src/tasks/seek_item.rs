//! Fetch an item from a nearby container into an empty hand

use crate::context::BehaviorEnv;
use crate::core::types::{EntityId, Hand, Vec3};
use crate::entity::environment::StackKind;
use crate::entity::selector::wildcard_match;
use crate::entity::traverser::{TraverserStatus, WalkRequest};
use crate::tasks::{AiTask, TaskBase, TaskConfig};

#[derive(Debug)]
pub struct SeekItemTask {
    base: TaskBase,
    item_code: String,
    stack_kind: StackKind,
    quantity: u32,
    hand: Hand,
    source_codes: Vec<String>,
    seeking_range: f32,
    reach: f32,
    move_speed: f32,

    source: Option<EntityId>,
    source_pos: Vec3,
}

impl SeekItemTask {
    pub const CODE: &'static str = "seekitem";

    /// Keys: `itemCode`, `stackKind` ("item"), `quantity` (1), `hand`
    /// ("main"), `sourceCodes` (wildcards), `seekingRange` (12), `reach`
    /// (1.5), `movespeed` (1.5).
    pub fn from_config(config: &TaskConfig) -> Self {
        let stack_kind = match config.str_or("stackKind", "item") {
            "block" => StackKind::Block,
            _ => StackKind::Item,
        };
        let hand = match config.str_or("hand", "main") {
            "off" => Hand::Off,
            _ => Hand::Main,
        };
        Self {
            base: TaskBase::from_config(config),
            item_code: config.str_or("itemCode", "").to_string(),
            stack_kind,
            quantity: config.u64_or("quantity", 1).max(1) as u32,
            hand,
            source_codes: config.str_list("sourceCodes"),
            seeking_range: config.f32_or("seekingRange", 12.0),
            reach: config.f32_or("reach", 1.5),
            move_speed: config.f32_or("movespeed", 1.5),
            source: None,
            source_pos: Vec3::ZERO,
        }
    }

    pub fn source(&self) -> Option<EntityId> {
        self.source
    }

    fn is_source(&self, code: &str) -> bool {
        self.source_codes.iter().any(|pattern| wildcard_match(pattern, code))
    }

    /// Take the item into the hand; false when it no longer resolves
    fn pick_up(&self, env: &mut BehaviorEnv) -> bool {
        match env.world.resolve_stack(self.stack_kind, &self.item_code, self.quantity) {
            Some(stack) => {
                tracing::debug!(entity = %env.entity.id, item = %self.item_code, hand = %self.hand, "item picked up");
                env.entity.hands.set(self.hand, Some(stack));
                true
            }
            None => false,
        }
    }
}

impl AiTask for SeekItemTask {
    fn base(&self) -> &TaskBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut TaskBase {
        &mut self.base
    }

    fn should_execute(&mut self, env: &mut BehaviorEnv) -> bool {
        if self.item_code.is_empty() || self.source_codes.is_empty() {
            return false;
        }
        if env.entity.hands.get(self.hand).is_some() {
            return false;
        }
        if !self.base.cooldown_ready(env.clock) || !self.base.in_day_frame(env.clock) {
            return false;
        }
        if env
            .world
            .resolve_stack(self.stack_kind, &self.item_code, self.quantity)
            .is_none()
        {
            return false;
        }

        let own_id = env.entity.id;
        let found = env
            .world
            .entities_near(env.entity.pos, self.seeking_range)
            .into_iter()
            .find(|other| other.id != own_id && self.is_source(&other.code))
            .map(|other| (other.id, other.pos));

        match found {
            Some((id, pos)) => {
                self.source = Some(id);
                self.source_pos = pos;
                true
            }
            None => false,
        }
    }

    fn start_execute(&mut self, env: &mut BehaviorEnv) {
        if env.entity.pos.distance(self.source_pos) <= self.reach {
            return;
        }
        let request = WalkRequest::new(self.source_pos, self.move_speed, self.reach * 0.5);
        if !env.entity.traverser.walk_towards(request) {
            tracing::debug!(entity = %env.entity.id, "item source refused by traverser");
        }
    }

    fn continue_execute(&mut self, _dt: f32, env: &mut BehaviorEnv) -> bool {
        let Some(source) = self.source else {
            return false;
        };
        if env.entity.hands.get(self.hand).is_some() {
            return false;
        }
        match env.world.entity(source) {
            Some(snapshot) if snapshot.alive => self.source_pos = snapshot.pos,
            _ => return false,
        }

        if env.entity.pos.distance(self.source_pos) <= self.reach {
            self.pick_up(env);
            return false;
        }

        match env.entity.traverser.status() {
            TraverserStatus::Walking => true,
            TraverserStatus::Stuck => false,
            TraverserStatus::Arrived | TraverserStatus::Idle => env
                .entity
                .traverser
                .walk_towards(WalkRequest::new(self.source_pos, self.move_speed, self.reach * 0.5)),
        }
    }

    fn finish_execute(&mut self, cancelled: bool, env: &mut BehaviorEnv) {
        if env.entity.traverser.is_active() {
            env.entity.traverser.stop();
        }
        self.base.finish(cancelled, env);
        self.source = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::environment::{EntitySnapshot, ItemCatalog, WorldView};
    use crate::tasks::testing::Fixture;

    fn lantern_seeker() -> SeekItemTask {
        let config = TaskConfig::new(SeekItemTask::CODE)
            .with("itemCode", toml::Value::String("lantern".into()))
            .with("hand", toml::Value::String("off".into()))
            .with("sourceCodes", toml::Value::String("chest*".into()));
        SeekItemTask::from_config(&config)
    }

    fn with_lantern(fx: &mut Fixture) {
        fx.catalog = ItemCatalog::new().with(StackKind::Item, "lantern");
    }

    #[test]
    fn test_picks_up_when_in_reach() {
        let mut fx = Fixture::on_flat_ground();
        with_lantern(&mut fx);
        let chest = EntitySnapshot::new(EntityId::new(), "chest-oak", Vec3::new(1.0, 1.0, 0.5));
        let others = vec![chest.clone()];
        let view = WorldView::new(&fx.terrain, &fx.catalog, &others);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);

        let mut task = lantern_seeker();
        assert!(task.should_execute(&mut env));
        assert_eq!(task.source(), Some(chest.id));
        task.start_execute(&mut env);
        assert!(!env.entity.traverser.is_active());

        assert!(!task.continue_execute(0.05, &mut env));
        assert_eq!(env.entity.hands.get(Hand::Off).map(|s| s.code.as_str()), Some("lantern"));
        assert!(env.entity.hands.get(Hand::Main).is_none());
    }

    #[test]
    fn test_walks_to_distant_source() {
        let mut fx = Fixture::on_flat_ground();
        with_lantern(&mut fx);
        let others = vec![EntitySnapshot::new(EntityId::new(), "chest", Vec3::new(8.5, 1.0, 0.5))];
        let view = WorldView::new(&fx.terrain, &fx.catalog, &others);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);

        let mut task = lantern_seeker();
        assert!(task.should_execute(&mut env));
        task.start_execute(&mut env);
        assert_eq!(env.entity.traverser.current_target(), Some(Vec3::new(8.5, 1.0, 0.5)));
        assert!(task.continue_execute(0.05, &mut env));
        assert!(env.entity.hands.get(Hand::Off).is_none());

        task.finish_execute(true, &mut env);
        assert!(!env.entity.traverser.is_active());
    }

    #[test]
    fn test_skips_when_hand_full_or_item_unknown() {
        let mut fx = Fixture::on_flat_ground();
        let others = vec![EntitySnapshot::new(EntityId::new(), "chest", Vec3::new(1.0, 1.0, 0.5))];

        // catalog does not know the lantern yet
        {
            let view = WorldView::new(&fx.terrain, &fx.catalog, &others);
            let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
            assert!(!lantern_seeker().should_execute(&mut env));
        }

        with_lantern(&mut fx);
        fx.entity.hands.set(Hand::Off, fx.catalog.resolve(StackKind::Item, "lantern", 1));
        let view = WorldView::new(&fx.terrain, &fx.catalog, &others);
        let mut env = BehaviorEnv::new(&mut fx.entity, &view, &fx.clock, &mut fx.rng);
        assert!(!lantern_seeker().should_execute(&mut env));
    }
}
