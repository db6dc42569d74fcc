//! The entity as seen by the scheduler
//!
//! Rendering, inventory and physics live elsewhere; the scheduler only needs
//! position, orientation, the persisted attribute store, hand slots, a few
//! motion flags and the movement traverser.

pub mod attributes;
pub mod environment;
pub mod selector;
pub mod traverser;

use crate::core::types::{EntityId, Hand, Vec3};
use attributes::AttributeTree;
use environment::{EntitySnapshot, ItemStack};
use traverser::{StraightLineTraverser, Traverser};

pub use attributes::AttributeValue;
pub use environment::WorldAccess;

/// Motion flags maintained by the physics layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotionState {
    pub on_ground: bool,
    pub swimming: bool,
}

/// Contents of both hands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandSlots {
    pub main: Option<ItemStack>,
    pub off: Option<ItemStack>,
}

impl HandSlots {
    pub fn get(&self, hand: Hand) -> Option<&ItemStack> {
        match hand {
            Hand::Main => self.main.as_ref(),
            Hand::Off => self.off.as_ref(),
        }
    }

    pub fn set(&mut self, hand: Hand, stack: Option<ItemStack>) {
        match hand {
            Hand::Main => self.main = stack,
            Hand::Off => self.off = stack,
        }
    }
}

#[derive(Debug)]
pub struct EntityState {
    pub id: EntityId,
    pub code: String,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub pos: Vec3,
    /// Radians
    pub yaw: f32,
    pub attributes: AttributeTree,
    pub hands: HandSlots,
    pub motion: MotionState,
    pub alive: bool,
    pub traverser: Box<dyn Traverser>,
}

impl EntityState {
    pub fn new(code: &str, pos: Vec3) -> Self {
        Self {
            id: EntityId::new(),
            code: code.to_string(),
            name: None,
            tags: Vec::new(),
            pos,
            yaw: 0.0,
            attributes: AttributeTree::new(),
            hands: HandSlots::default(),
            motion: MotionState {
                on_ground: true,
                swimming: false,
            },
            alive: true,
            traverser: Box::new(StraightLineTraverser::new()),
        }
    }

    pub fn with_traverser(mut self, traverser: Box<dyn Traverser>) -> Self {
        self.traverser = traverser;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id,
            code: self.code.clone(),
            name: self.name.clone(),
            pos: self.pos,
            tags: self.tags.clone(),
            alive: self.alive,
        }
    }
}
