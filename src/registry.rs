//! Process-wide behavior registry
//!
//! Task, action and condition factories are registered once at startup,
//! in a fixed order, and torn down explicitly. Code that needs the
//! registry takes an `Arc` handle from [`global`].

use std::sync::{Arc, RwLock};

use crate::activity::registry::ActivityRegistry;
use crate::core::error::{Result, SchedulerError};
use crate::tasks::registry::TaskRegistry;

#[derive(Debug, Clone, Default)]
pub struct BehaviorRegistry {
    pub tasks: TaskRegistry,
    pub activities: ActivityRegistry,
}

impl BehaviorRegistry {
    pub fn with_builtins() -> Self {
        Self {
            tasks: TaskRegistry::with_builtins(),
            activities: ActivityRegistry::with_builtins(),
        }
    }
}

static GLOBAL: RwLock<Option<Arc<BehaviorRegistry>>> = RwLock::new(None);

/// Install the process registry. Fails if one is already installed.
pub fn init_global(registry: BehaviorRegistry) -> Result<Arc<BehaviorRegistry>> {
    let mut slot = GLOBAL.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    if slot.is_some() {
        return Err(SchedulerError::RegistryAlreadyInitialized);
    }
    let registry = Arc::new(registry);
    *slot = Some(Arc::clone(&registry));
    tracing::info!(
        tasks = registry.tasks.codes().count(),
        actions = registry.activities.action_types().count(),
        conditions = registry.activities.condition_types().count(),
        "behavior registry initialised"
    );
    Ok(registry)
}

pub fn global() -> Result<Arc<BehaviorRegistry>> {
    GLOBAL
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
        .ok_or(SchedulerError::RegistryNotInitialized)
}

/// Remove the process registry. Handles already taken stay valid.
pub fn teardown_global() -> Option<Arc<BehaviorRegistry>> {
    let removed = GLOBAL
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    if removed.is_some() {
        tracing::info!("behavior registry torn down");
    }
    removed
}
