//! Host collaborator interface.
//!
//! The host typically keeps its own per-creature caches over offered
//! procedures; the engine notifies it through this trait instead of reaching
//! into host internals.

use crate::ids::CreatureId;

/// Callbacks the engine makes into the embedding host.
pub trait HostBridge {
    /// A creature's offered-procedure list changed; any host-side recipe
    /// cache for it must be recomputed.
    fn invalidate_recipe_cache(&mut self, creature: CreatureId) {
        let _ = creature;
    }
}

/// Bridge for hosts (and tests) with nothing to invalidate.
#[derive(Debug, Default)]
pub struct NoopBridge;

impl HostBridge for NoopBridge {}
