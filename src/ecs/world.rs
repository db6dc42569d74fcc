//! NPC world - owns every scheduled entity and routes commands between them

use ahash::AHashMap;

use crate::activity::context::DirectorCommand;
use crate::activity::director::ActivityDirector;
use crate::core::clock::GameClock;
use crate::core::config::config;
use crate::core::error::{Result, SchedulerError};
use crate::core::types::{EntityId, Tick};
use crate::entity::environment::{EntitySnapshot, ItemCatalog, Terrain, WorldView};
use crate::entity::EntityState;
use crate::npc::{AnswerMessage, Npc};
use crate::tasks::TaskArbiter;

/// Mixed into the base seed so neighbouring entities get unrelated streams
const SEED_STRIDE: u64 = 0x9e37_79b9_7f4a_7c15;

pub struct NpcWorld {
    pub current_tick: Tick,
    pub terrain: Terrain,
    pub catalog: ItemCatalog,
    pub clock: GameClock,
    npcs: AHashMap<EntityId, Npc>,
    /// Spawn order, which is also tick order
    order: Vec<EntityId>,
    base_seed: u64,
    spawned: u64,
}

impl NpcWorld {
    pub fn new(terrain: Terrain, catalog: ItemCatalog) -> Self {
        let cfg = config();
        Self {
            current_tick: 0,
            terrain,
            catalog,
            clock: GameClock::new(cfg.seconds_per_game_hour),
            npcs: AHashMap::new(),
            order: Vec::new(),
            base_seed: cfg.rng_seed,
            spawned: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_clock(mut self, clock: GameClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn spawn(
        &mut self,
        state: EntityState,
        arbiter: Option<TaskArbiter>,
        director: Option<ActivityDirector>,
    ) -> EntityId {
        let seed = self.base_seed ^ self.spawned.wrapping_add(1).wrapping_mul(SEED_STRIDE);
        self.spawned += 1;

        let mut npc = Npc::new(state, seed);
        npc.arbiter = arbiter;
        npc.director = director.map(|mut d| {
            if config().debug_activities {
                d.set_debug(true);
            }
            d
        });
        npc.on_spawn();

        let id = npc.id();
        tracing::debug!(entity = %id, code = %npc.state.code, "npc spawned");
        self.npcs.insert(id, npc);
        self.order.push(id);
        id
    }

    /// Tear down and remove an npc
    pub fn despawn(&mut self, id: EntityId) -> Option<Npc> {
        let mut npc = self.npcs.remove(&id)?;
        self.order.retain(|other| *other != id);
        let snapshots = self.snapshots();
        let view = WorldView::new(&self.terrain, &self.catalog, &snapshots);
        npc.despawn(&view, &self.clock);
        Some(npc)
    }

    pub fn npc(&self, id: EntityId) -> Option<&Npc> {
        self.npcs.get(&id)
    }

    pub fn npc_mut(&mut self, id: EntityId) -> Option<&mut Npc> {
        self.npcs.get_mut(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.npcs.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    /// Positions and tags of every npc as of now
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        self.order
            .iter()
            .filter_map(|id| self.npcs.get(id))
            .map(|npc| npc.state.snapshot())
            .collect()
    }

    /// Advance every npc by `dt` seconds, then deliver the commands they
    /// addressed to each other.
    pub fn tick(&mut self, dt: f32) {
        self.current_tick += 1;
        let snapshots = self.snapshots();
        let view = WorldView::new(&self.terrain, &self.catalog, &snapshots);

        let mut routed: Vec<DirectorCommand> = Vec::new();
        for id in &self.order {
            if let Some(npc) = self.npcs.get_mut(id) {
                routed.extend(npc.tick(dt, &view, &self.clock));
            }
        }

        for command in routed {
            let target = command.target();
            match self.npcs.get_mut(&target) {
                Some(npc) => {
                    if let Err(e) = npc.handle_command(command, &view, &self.clock) {
                        tracing::warn!(entity = %target, error = %e, "routed command failed");
                    }
                }
                None => tracing::warn!(entity = %target, "command for unknown entity dropped"),
            }
        }

        self.clock.advance(dt);
    }

    pub fn deliver_answer(&mut self, answer: &AnswerMessage) -> Result<()> {
        let snapshots = self.snapshots();
        let view = WorldView::new(&self.terrain, &self.catalog, &snapshots);
        let npc = self
            .npcs
            .get_mut(&answer.entity)
            .ok_or(SchedulerError::UnknownEntity(answer.entity))?;
        npc.handle_answer(answer, &view, &self.clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::actions::{StartActivityAction, TeleportAction};
    use crate::activity::sequence::Activity;
    use crate::core::types::Vec3;

    fn gather_director() -> ActivityDirector {
        let call = Activity::new("call", 0, 1.0).with_action(Box::new(StartActivityAction::on_others("come", "e[range=20]")));
        let come = Activity::new("come", 0, 1.0).with_action(Box::new(TeleportAction::new(Vec3::new(2.0, 1.0, 2.0), 0.0)));
        ActivityDirector::with_templates([call, come])
    }

    #[test]
    fn test_commands_route_to_other_entities() {
        let mut world = NpcWorld::new(Terrain::flat(0), ItemCatalog::new()).with_seed(3);
        let caller = world.spawn(
            EntityState::new("villager", Vec3::new(0.5, 1.0, 0.5)),
            None,
            Some(gather_director()),
        );
        let listener = world.spawn(
            EntityState::new("villager", Vec3::new(8.5, 1.0, 8.5)),
            None,
            Some(gather_director()),
        );
        let far = world.spawn(
            EntityState::new("villager", Vec3::new(80.5, 1.0, 80.5)),
            None,
            Some(gather_director()),
        );

        let view_snapshots = world.snapshots();
        let view = WorldView::new(&world.terrain, &world.catalog, &view_snapshots);
        let clock = world.clock.clone();
        let npc = world.npcs.get_mut(&caller).unwrap();
        npc.handle_command(
            DirectorCommand::StartActivity {
                target: caller,
                code: "call".into(),
                priority: None,
                slot: None,
            },
            &view,
            &clock,
        )
        .unwrap();

        world.tick(0.05);

        assert_eq!(world.npc(listener).unwrap().state.pos, Vec3::new(2.0, 1.0, 2.0));
        assert_eq!(world.npc(far).unwrap().state.pos, Vec3::new(80.5, 1.0, 80.5));
        // the caller never targets itself
        assert_eq!(world.npc(caller).unwrap().state.pos, Vec3::new(0.5, 1.0, 0.5));
    }

    #[test]
    fn test_despawn_and_unknown_answer() {
        let mut world = NpcWorld::new(Terrain::flat(0), ItemCatalog::new());
        let id = world.spawn(EntityState::new("villager", Vec3::ZERO), None, None);
        assert_eq!(world.entity_count(), 1);

        let removed = world.despawn(id).unwrap();
        assert!(!removed.state.alive);
        assert_eq!(world.entity_count(), 0);

        let answer = AnswerMessage {
            entity: id,
            answer: "yes".into(),
        };
        assert!(matches!(world.deliver_answer(&answer), Err(SchedulerError::UnknownEntity(_))));
    }

    #[test]
    fn test_tick_advances_clock() {
        let mut world = NpcWorld::new(Terrain::flat(0), ItemCatalog::new());
        world.tick(0.5);
        world.tick(0.5);
        assert_eq!(world.current_tick, 2);
        assert_eq!(world.clock.elapsed_ms(), 1000);
    }
}
