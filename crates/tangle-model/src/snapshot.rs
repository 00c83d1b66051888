// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Copy-on-write map with lock-free reads.
//!
//! Readers load the current snapshot without locking. A writer copies the
//! snapshot, inserts, and publishes the copy with a compare-and-swap; when
//! another writer got there first it retries against the fresh snapshot.
//! The first publication of a key wins and every later candidate for it is
//! dropped, so all callers converge on one retained value per key.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use rustc_hash::FxHashMap;
use tracing::trace;

/// Outcome of [`SnapshotMap::publish`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Publish<V> {
    /// The candidate was published.
    Inserted(V),
    /// Another publication of the key won; this is the retained value.
    Existing(V),
}

impl<V> Publish<V> {
    /// The value now held by the map.
    pub fn into_inner(self) -> V {
        match self {
            Self::Inserted(v) | Self::Existing(v) => v,
        }
    }

    /// Whether this call's candidate was the one retained.
    #[must_use]
    pub fn was_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

/// Lock-free copy-on-write map.
pub struct SnapshotMap<K, V> {
    inner: ArcSwap<FxHashMap<K, V>>,
}

impl<K, V> Default for SnapshotMap<K, V> {
    fn default() -> Self {
        Self {
            inner: ArcSwap::from_pointee(FxHashMap::default()),
        }
    }
}

impl<K, V> SnapshotMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a key up in the current snapshot.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.load().get(key).cloned()
    }

    /// Whether the current snapshot holds `key`.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.load().contains_key(key)
    }

    /// Number of entries in the current snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.load().len()
    }

    /// Whether the current snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.load().is_empty()
    }

    /// Pins the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<FxHashMap<K, V>> {
        self.inner.load_full()
    }

    /// Publishes `value` under `key` unless the key is already present.
    pub fn publish(&self, key: K, value: V) -> Publish<V> {
        let mut current = self.inner.load_full();
        loop {
            if let Some(existing) = current.get(&key) {
                return Publish::Existing(existing.clone());
            }
            let mut next = FxHashMap::clone(&current);
            next.insert(key.clone(), value.clone());
            let previous = self.inner.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return Publish::Inserted(value);
            }
            trace!("snapshot publication raced; retrying");
            current = Guard::into_inner(previous);
        }
    }
}

impl<K, V> fmt::Debug for SnapshotMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotMap")
            .field("len", &self.inner.load().len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn first_publication_wins() {
        let map = SnapshotMap::<&str, u32>::new();
        assert_eq!(map.publish("a", 1), Publish::Inserted(1));
        assert_eq!(map.publish("a", 2), Publish::Existing(1));
        assert_eq!(map.get("a"), Some(1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn old_snapshots_stay_readable() {
        let map = SnapshotMap::<u32, u32>::new();
        map.publish(1, 10);
        let pinned = map.snapshot();
        map.publish(2, 20);
        assert_eq!(pinned.len(), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn racing_writers_converge() {
        let map = SnapshotMap::<u32, Arc<u32>>::new();
        let winners: Vec<Arc<u32>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let map = &map;
                    s.spawn(move || {
                        for key in 0..64 {
                            map.publish(key, Arc::new(i));
                        }
                        map.get(&7).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(map.len(), 64);
        for w in &winners {
            assert!(Arc::ptr_eq(w, &winners[0]));
        }
    }
}
