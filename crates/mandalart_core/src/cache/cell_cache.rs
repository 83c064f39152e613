//! TTL cache of cells and their direct children.
//!
//! # Responsibility
//! - Avoid refetching a cell and its children when the user revisits it.
//! - Expire entries after a fixed TTL and support manual invalidation.
//!
//! # Invariants
//! - `get` never returns an entry older than the TTL; expired entries are
//!   removed on read.
//! - The cache holds no authority: a miss always falls back to storage.
//! - All access goes through one mutex; a poisoned lock is recovered.

use crate::model::cell::{Cell, CellId};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Default entry lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Time source used for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    cell: Cell,
    children: Vec<Cell>,
    inserted_at: Instant,
}

/// Hit payload: the cached cell and its children.
pub type CachedCell = (Cell, Vec<Cell>);

/// In-memory cell cache shared by services of one session.
pub struct CellCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CellId, CacheEntry>>,
}

impl Debug for CellCache {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish()
    }
}

impl Default for CellCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl CellCache {
    /// Creates a cache reading wall-clock time.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a cache with an explicit time source.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores `cell` and `children` under `cell_id`, replacing any entry.
    pub fn set(&self, cell_id: CellId, cell: Cell, children: Vec<Cell>) {
        let inserted_at = self.clock.now();
        self.lock().insert(
            cell_id,
            CacheEntry {
                cell,
                children,
                inserted_at,
            },
        );
    }

    /// Returns the cached pair, or `None` when absent or expired.
    pub fn get(&self, cell_id: CellId) -> Option<CachedCell> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.get(&cell_id) {
            None => return None,
            Some(entry) => self.is_expired(entry, now),
        };
        if expired {
            entries.remove(&cell_id);
            return None;
        }
        entries
            .get(&cell_id)
            .map(|entry| (entry.cell.clone(), entry.children.clone()))
    }

    /// Removes one entry. Returns whether it was present.
    pub fn remove(&self, cell_id: CellId) -> bool {
        self.lock().remove(&cell_id).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Evicts every expired entry. Returns the number evicted.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CellId, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Clock advanced by hand.
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::CellCache;
    use crate::model::cell::Cell;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;

    fn cache_with_clock(ttl: Duration) -> (CellCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (CellCache::with_clock(ttl, clock.clone()), clock)
    }

    #[test]
    fn set_then_get_returns_cell_and_children() {
        let (cache, _) = cache_with_clock(Duration::from_secs(300));
        let root = Cell::new_root(Uuid::new_v4(), "Centre");
        let child = Cell::new_child(&root, 0, "Child");

        cache.set(root.id, root.clone(), vec![child.clone()]);
        let (cell, children) = cache.get(root.id).expect("fresh entry should hit");
        assert_eq!(cell, root);
        assert_eq!(children, vec![child]);
    }

    #[test]
    fn get_after_ttl_is_a_miss_and_drops_entry() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(300));
        let root = Cell::new_root(Uuid::new_v4(), "Centre");
        cache.set(root.id, root.clone(), Vec::new());

        clock.advance(Duration::from_secs(299));
        assert!(cache.get(root.id).is_some());

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(root.id).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_and_clear_invalidate() {
        let (cache, _) = cache_with_clock(Duration::from_secs(300));
        let a = Cell::new_root(Uuid::new_v4(), "a");
        let b = Cell::new_root(Uuid::new_v4(), "b");
        cache.set(a.id, a.clone(), Vec::new());
        cache.set(b.id, b.clone(), Vec::new());

        assert!(cache.remove(a.id));
        assert!(!cache.remove(a.id));
        assert!(cache.get(a.id).is_none());
        assert!(cache.get(b.id).is_some());

        cache.clear();
        assert!(cache.get(b.id).is_none());
    }

    #[test]
    fn sweep_evicts_only_expired_entries() {
        let (cache, clock) = cache_with_clock(Duration::from_secs(60));
        let old = Cell::new_root(Uuid::new_v4(), "old");
        cache.set(old.id, old.clone(), Vec::new());

        clock.advance(Duration::from_secs(45));
        let fresh = Cell::new_root(Uuid::new_v4(), "fresh");
        cache.set(fresh.id, fresh.clone(), Vec::new());

        clock.advance(Duration::from_secs(20));
        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(fresh.id).is_some());
    }
}
