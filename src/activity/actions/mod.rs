//! Built-in actions

pub mod equip;
pub mod jump_to;
pub mod set_variable;
pub mod start_activity;
pub mod teleport;
pub mod wait;
pub mod walk_to;

pub use equip::EquipAction;
pub use jump_to::JumpToAction;
pub use set_variable::SetVariableAction;
pub use start_activity::{StartActivityAction, StartTarget};
pub use teleport::TeleportAction;
pub use wait::WaitAction;
pub use walk_to::WalkToAction;
