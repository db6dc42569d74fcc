//! Behavior Scheduler - per-entity AI tasks and scripted activities
//!
//! Two cooperating layers run on every entity tick. The [`tasks`] layer
//! arbitrates reactive behaviors (wandering, fleeing) by slot and priority.
//! The [`activity`] layer plays authored sequences of actions gated by
//! conditions, relocatable through a per-director offset.

pub mod activity;
pub mod context;
pub mod core;
pub mod ecs;
pub mod entity;
pub mod npc;
pub mod registry;
pub mod tasks;
