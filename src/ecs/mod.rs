//! Entity hosting

pub mod world;

pub use world::NpcWorld;
