//! In-memory order cache.
//!
//! The cache is the only read path after startup. It is populated once from
//! the durable store ([`OrderCache::load_snapshot`]) and then incrementally,
//! after each committed ingest ([`OrderCache::upsert`]).
//!
//! A single `RwLock` guards the table. Orders are stored as `Arc<Order>` and
//! replaced whole, so a reader holds either the previous or the new value of
//! an entry, never a partially written one. A snapshot load builds the new
//! table outside the lock and swaps it in with one assignment; readers see
//! either the old generation or the new one. No lock is held across I/O.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use order_service_core::{Order, OrderUid};

type OrderTable = HashMap<OrderUid, Arc<Order>>;

/// Concurrent map from order uid to order snapshot.
///
/// Cheaply cloneable; clones share the same table.
#[derive(Clone, Default)]
pub struct OrderCache {
    table: Arc<RwLock<OrderTable>>,
}

impl OrderCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `order.order_uid`.
    pub fn upsert(&self, order: Order) {
        let order = Arc::new(order);
        let previous = self
            .table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order.order_uid.clone(), order);
        // Drop the replaced order outside the critical section
        drop(previous);
    }

    /// Look up an order by uid.
    #[must_use]
    pub fn get(&self, uid: &str) -> Option<Arc<Order>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uid)
            .cloned()
    }

    /// Replace the whole table with `orders`, keyed by their uids.
    ///
    /// Returns the number of entries in the new table. If `orders` holds the
    /// same uid twice, the later one wins.
    pub fn load_snapshot(&self, orders: impl IntoIterator<Item = Order>) -> usize {
        let table: OrderTable = orders
            .into_iter()
            .map(|order| (order.order_uid.clone(), Arc::new(order)))
            .collect();
        let len = table.len();

        let previous = {
            let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, table)
        };
        drop(previous);

        len
    }

    /// A consistent copy of the whole table.
    ///
    /// Orders are shared, not cloned.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<OrderUid, Arc<Order>> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of cached orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn order(uid: &str, track: &str) -> Order {
        Order {
            order_uid: OrderUid::new(uid),
            track_number: track.to_owned(),
            ..Order::default()
        }
    }

    #[test]
    fn test_get_missing() {
        let cache = OrderCache::new();
        assert!(cache.get("nope").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_upsert_then_get() {
        let cache = OrderCache::new();
        cache.upsert(order("A1", "T1"));

        let found = cache.get("A1").unwrap();
        assert_eq!(found.track_number, "T1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_upsert_overwrites() {
        let cache = OrderCache::new();
        cache.upsert(order("A1", "T1"));
        cache.upsert(order("A1", "T2"));

        assert_eq!(cache.get("A1").unwrap().track_number, "T2");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reader_keeps_its_snapshot_after_overwrite() {
        let cache = OrderCache::new();
        cache.upsert(order("A1", "T1"));
        let held = cache.get("A1").unwrap();

        cache.upsert(order("A1", "T2"));

        assert_eq!(held.track_number, "T1");
        assert_eq!(cache.get("A1").unwrap().track_number, "T2");
    }

    #[test]
    fn test_load_snapshot_replaces_everything() {
        let cache = OrderCache::new();
        cache.upsert(order("old", "T0"));

        let loaded = cache.load_snapshot(vec![order("A1", "T1"), order("B2", "T2")]);

        assert_eq!(loaded, 2);
        assert!(cache.get("old").is_none());
        assert!(cache.get("A1").is_some());
        assert!(cache.get("B2").is_some());
    }

    #[test]
    fn test_load_empty_snapshot() {
        let cache = OrderCache::new();
        cache.upsert(order("A1", "T1"));
        assert_eq!(cache.load_snapshot(Vec::new()), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clones_share_the_table() {
        let cache = OrderCache::new();
        let reader = cache.clone();
        cache.upsert(order("A1", "T1"));
        assert!(reader.get("A1").is_some());
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_generations() {
        const KEYS: usize = 50;
        const GENERATIONS: usize = 200;

        fn generation(g: usize) -> Vec<Order> {
            (0..KEYS)
                .map(|i| order(&format!("g{g}-{i}"), &g.to_string()))
                .collect()
        }

        let cache = OrderCache::new();
        cache.load_snapshot(generation(0));
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let mut last_seen = 0;
                    while !done.load(Ordering::Acquire) {
                        let table = cache.snapshot();
                        assert_eq!(table.len(), KEYS);

                        let mut generations = table
                            .values()
                            .map(|o| o.track_number.parse::<usize>().unwrap());
                        let first = generations.next().unwrap();
                        assert!(generations.all(|g| g == first), "mixed generations");
                        assert!(first >= last_seen, "generation went backwards");
                        last_seen = first;
                    }
                });
            }

            for g in 1..=GENERATIONS {
                cache.load_snapshot(generation(g));
            }
            done.store(true, Ordering::Release);
        });

        assert_eq!(cache.len(), KEYS);
        assert!(cache.get(&format!("g{GENERATIONS}-0")).is_some());
        assert!(cache.get("g0-0").is_none());
    }
}
