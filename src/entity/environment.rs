//! World-side queries the scheduler consumes
//!
//! Tasks, actions and conditions never own the world. They receive a
//! read-only [`WorldAccess`] view for block, light, item and entity lookups;
//! anything that must change other entities goes out as a command.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::core::types::{BlockPos, EntityId, Vec3};
use crate::entity::selector::EntitySelector;

/// Maximum light level
pub const MAX_LIGHT: u8 = 15;

/// What occupies a block position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub code: String,
    pub solid: bool,
    pub liquid: bool,
    pub light: u8,
}

impl BlockInfo {
    pub fn air(light: u8) -> Self {
        Self {
            code: "air".into(),
            solid: false,
            liquid: false,
            light,
        }
    }

    pub fn solid(code: &str) -> Self {
        Self {
            code: code.into(),
            solid: true,
            liquid: false,
            light: 0,
        }
    }

    pub fn liquid(code: &str, light: u8) -> Self {
        Self {
            code: code.into(),
            solid: false,
            liquid: true,
            light,
        }
    }

    pub fn with_light(mut self, light: u8) -> Self {
        self.light = light.min(MAX_LIGHT);
        self
    }
}

/// Item or block stack kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    #[default]
    Item,
    Block,
}

impl std::fmt::Display for StackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackKind::Item => write!(f, "item"),
            StackKind::Block => write!(f, "block"),
        }
    }
}

/// A resolved stack of items or blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub kind: StackKind,
    pub code: String,
    pub quantity: u32,
}

/// Snapshot of another entity, taken before the tick started
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub code: String,
    pub name: Option<String>,
    pub pos: Vec3,
    pub tags: Vec<String>,
    pub alive: bool,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, code: &str, pos: Vec3) -> Self {
        Self {
            id,
            code: code.into(),
            name: None,
            pos,
            tags: Vec::new(),
            alive: true,
        }
    }
}

/// Read-only world queries
pub trait WorldAccess {
    fn block(&self, pos: BlockPos) -> BlockInfo;

    fn light_level(&self, pos: BlockPos) -> u8 {
        self.block(pos).light
    }

    /// Resolve a configured item/block code into a concrete stack
    fn resolve_stack(&self, kind: StackKind, code: &str, quantity: u32) -> Option<ItemStack>;

    /// Every entity known to the view
    fn entities(&self) -> &[EntitySnapshot];

    fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities().iter().find(|e| e.id == id)
    }

    /// Living entities passing `keep`, nearest to `origin` first
    fn nearest_matching(&self, origin: Vec3, keep: &dyn Fn(&EntitySnapshot) -> bool) -> Vec<&EntitySnapshot> {
        let mut found: Vec<&EntitySnapshot> = self.entities().iter().filter(|e| e.alive && keep(e)).collect();
        found.sort_by(|a, b| {
            a.pos
                .distance_squared(origin)
                .total_cmp(&b.pos.distance_squared(origin))
        });
        found
    }

    /// Living entities within `range` of `center`, nearest first
    fn entities_near(&self, center: Vec3, range: f32) -> Vec<&EntitySnapshot> {
        self.nearest_matching(center, &|e: &EntitySnapshot| e.pos.distance(center) <= range)
    }

    /// Entities matching a selector evaluated from `origin`, nearest first.
    /// `exclude` is dropped before the selector's limit is applied.
    fn select_entities(&self, selector: &EntitySelector, origin: Vec3, exclude: Option<EntityId>) -> Vec<EntityId> {
        let ids = self
            .nearest_matching(origin, &|e: &EntitySnapshot| Some(e.id) != exclude && selector.matches(e, origin))
            .into_iter()
            .map(|e| e.id);
        match selector.limit {
            Some(limit) => ids.take(limit).collect(),
            None => ids.collect(),
        }
    }
}

/// Block grid: everything at or below `ground_level` is solid, liquid fills
/// up to `liquid_level` (if any), overrides win over both.
#[derive(Debug, Clone)]
pub struct Terrain {
    ground_level: i32,
    liquid_level: Option<i32>,
    ambient_light: u8,
    overrides: AHashMap<BlockPos, BlockInfo>,
}

impl Terrain {
    pub fn flat(ground_level: i32) -> Self {
        Self {
            ground_level,
            liquid_level: None,
            ambient_light: MAX_LIGHT,
            overrides: AHashMap::new(),
        }
    }

    /// Flat ground covered by liquid up to and including `liquid_level`
    pub fn lake(ground_level: i32, liquid_level: i32) -> Self {
        Self {
            liquid_level: Some(liquid_level),
            ..Self::flat(ground_level)
        }
    }

    pub fn with_ambient_light(mut self, light: u8) -> Self {
        self.ambient_light = light.min(MAX_LIGHT);
        self
    }

    pub fn set_block(&mut self, pos: BlockPos, block: BlockInfo) {
        self.overrides.insert(pos, block);
    }

    pub fn ground_level(&self) -> i32 {
        self.ground_level
    }

    pub fn block(&self, pos: BlockPos) -> BlockInfo {
        if let Some(block) = self.overrides.get(&pos) {
            return block.clone();
        }
        if pos.y <= self.ground_level {
            return BlockInfo::solid("soil");
        }
        match self.liquid_level {
            Some(level) if pos.y <= level => BlockInfo::liquid("water", self.ambient_light),
            _ => BlockInfo::air(self.ambient_light),
        }
    }
}

/// Known item and block codes
#[derive(Debug, Clone, Default)]
pub struct ItemCatalog {
    known: AHashSet<(StackKind, String)>,
}

impl ItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: StackKind, code: &str) {
        self.known.insert((kind, code.to_string()));
    }

    pub fn with(mut self, kind: StackKind, code: &str) -> Self {
        self.register(kind, code);
        self
    }

    pub fn resolve(&self, kind: StackKind, code: &str, quantity: u32) -> Option<ItemStack> {
        if quantity == 0 || !self.known.contains(&(kind, code.to_string())) {
            return None;
        }
        Some(ItemStack {
            kind,
            code: code.to_string(),
            quantity,
        })
    }
}

/// Borrowed world view handed to every behavior during a tick
#[derive(Debug, Clone, Copy)]
pub struct WorldView<'a> {
    terrain: &'a Terrain,
    catalog: &'a ItemCatalog,
    entities: &'a [EntitySnapshot],
}

impl<'a> WorldView<'a> {
    pub fn new(terrain: &'a Terrain, catalog: &'a ItemCatalog, entities: &'a [EntitySnapshot]) -> Self {
        Self {
            terrain,
            catalog,
            entities,
        }
    }
}

impl WorldAccess for WorldView<'_> {
    fn block(&self, pos: BlockPos) -> BlockInfo {
        self.terrain.block(pos)
    }

    fn resolve_stack(&self, kind: StackKind, code: &str, quantity: u32) -> Option<ItemStack> {
        self.catalog.resolve(kind, code, quantity)
    }

    fn entities(&self) -> &[EntitySnapshot] {
        self.entities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::IVec3;

    #[test]
    fn test_terrain_layers() {
        let terrain = Terrain::lake(0, 3);
        assert!(terrain.block(IVec3::new(0, 0, 0)).solid);
        assert!(terrain.block(IVec3::new(0, 2, 0)).liquid);
        assert!(!terrain.block(IVec3::new(0, 4, 0)).liquid);
        assert!(!terrain.block(IVec3::new(0, 4, 0)).solid);
    }

    #[test]
    fn test_overrides_win() {
        let mut terrain = Terrain::flat(0);
        terrain.set_block(IVec3::new(1, 1, 1), BlockInfo::solid("rock"));
        assert_eq!(terrain.block(IVec3::new(1, 1, 1)).code, "rock");
    }

    #[test]
    fn test_catalog_resolution() {
        let catalog = ItemCatalog::new().with(StackKind::Item, "sword");
        assert!(catalog.resolve(StackKind::Item, "sword", 1).is_some());
        assert!(catalog.resolve(StackKind::Block, "sword", 1).is_none());
        assert!(catalog.resolve(StackKind::Item, "axe", 1).is_none());
    }

    #[test]
    fn test_entities_near_sorted_by_distance() {
        let far = EntitySnapshot::new(EntityId::new(), "wolf", Vec3::new(8.0, 0.0, 0.0));
        let near = EntitySnapshot::new(EntityId::new(), "wolf", Vec3::new(2.0, 0.0, 0.0));
        let out = EntitySnapshot::new(EntityId::new(), "wolf", Vec3::new(30.0, 0.0, 0.0));
        let entities = vec![far.clone(), near.clone(), out];

        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &entities);

        let found = view.entities_near(Vec3::ZERO, 10.0);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, near.id);
        assert_eq!(found[1].id, far.id);
    }

    #[test]
    fn test_select_entities_excludes_before_limit() {
        let me = EntitySnapshot::new(EntityId::new(), "villager", Vec3::ZERO);
        let near = EntitySnapshot::new(EntityId::new(), "villager", Vec3::new(2.0, 0.0, 0.0));
        let far = EntitySnapshot::new(EntityId::new(), "villager", Vec3::new(6.0, 0.0, 0.0));
        let entities = vec![far, me.clone(), near.clone()];

        let terrain = Terrain::flat(0);
        let catalog = ItemCatalog::new();
        let view = WorldView::new(&terrain, &catalog, &entities);
        let selector = EntitySelector::parse("e[limit=1]").unwrap();

        assert_eq!(view.select_entities(&selector, Vec3::ZERO, None), vec![me.id]);
        assert_eq!(view.select_entities(&selector, Vec3::ZERO, Some(me.id)), vec![near.id]);
    }
}
