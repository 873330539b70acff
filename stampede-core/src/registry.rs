use ahash::AHashSet;
use parking_lot::RwLock;
use rand::Rng as _;
use std::sync::Arc;

pub type EntityId = Arc<str>;

#[derive(Debug, Default)]
struct EntityTable {
    ids: Vec<EntityId>,
    index: AHashSet<EntityId>,
}

/// Process-wide set of identifiers produced by workers (e.g. created
/// resources), readable and writable by all workers. Entries are never
/// removed during a run, so a sampled id stays valid for its lifetime.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    inner: RwLock<EntityTable>,
}

impl EntityRegistry {
    /// Idempotent insert; returns whether the id was new.
    pub fn add(&self, id: &str) -> bool {
        let mut table = self.inner.write();
        if table.index.contains(id) {
            return false;
        }
        let id: EntityId = Arc::from(id);
        table.ids.push(id.clone());
        table.index.insert(id);
        true
    }

    /// Uniformly-random existing id, or `None` when nothing has been
    /// registered yet.
    pub fn sample(&self) -> Option<EntityId> {
        let table = self.inner.read();
        if table.ids.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..table.ids.len());
        Some(table.ids[idx].clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().ids.is_empty()
    }
}
