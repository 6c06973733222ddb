//! Navigation trail cache.
//!
//! A trail is the ordered breadcrumb history of one drilldown exploration.
//! Trails are immutable once stored: appending a hop writes a brand-new
//! entry under a fresh cache id and leaves the original untouched, so
//! "back" navigation is just re-using an older id, never a replay. Every
//! entry carries an absolute expiry; reads after expiry behave exactly as
//! not-found, and a missing or expired id is treated as an empty trail
//! rather than an error.

use crate::config::TrailConfig;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One visited node of a drilldown: a stable node key plus what the user
/// saw on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    pub node_key: String,
    pub label: String,
}

impl Hop {
    pub fn new(node_key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            node_key: node_key.into(),
            label: label.into(),
        }
    }
}

/// An ordered, immutable sequence of hops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trail {
    pub hops: Vec<Hop>,
    pub created_at: DateTime<Utc>,
}

/// External key-value store with per-key TTL. Entries are never mutated
/// after creation; expiry is the store's responsibility.
pub trait TrailStore: Send + Sync {
    fn put(&self, key: String, trail: Trail, ttl: Duration);

    /// The trail under `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Option<Trail>;
}

/// In-memory reference store. Expired entries are garbage-collected
/// lazily on read.
#[derive(Default)]
pub struct MemoryTrailStore {
    entries: RwLock<HashMap<String, (Trail, Instant)>>,
}

impl MemoryTrailStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrailStore for MemoryTrailStore {
    fn put(&self, key: String, trail: Trail, ttl: Duration) {
        self.entries
            .write()
            .insert(key, (trail, Instant::now() + ttl));
    }

    fn get(&self, key: &str) -> Option<Trail> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((trail, expires_at)) if *expires_at > Instant::now() => {
                    return Some(trail.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired: drop the entry on the way out.
        self.entries.write().remove(key);
        None
    }
}

/// Drilldown breadcrumb cache over a TTL key-value store.
pub struct BreadcrumbCache<S: TrailStore> {
    store: S,
    ttl: Duration,
}

impl BreadcrumbCache<MemoryTrailStore> {
    /// In-memory cache with the configured expiry.
    pub fn from_config(config: &TrailConfig) -> Self {
        Self::new(MemoryTrailStore::new(), Duration::from_secs(config.ttl_secs))
    }
}

impl<S: TrailStore> BreadcrumbCache<S> {
    pub fn new(store: S, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Seed a trail, empty or with a single starting hop, and return its
    /// opaque cache id.
    pub fn create(&self, root: Option<Hop>) -> String {
        let hops = root.into_iter().collect();
        self.save(hops)
    }

    /// Store the trail under `cache_id` plus one new hop, under a freshly
    /// generated id. The original entry is left untouched. A missing or
    /// expired `cache_id` is treated as an empty trail.
    pub fn append(&self, cache_id: &str, hop: Hop) -> String {
        let mut hops = self
            .load(cache_id)
            .map(|trail| trail.hops)
            .unwrap_or_default();
        hops.push(hop);
        self.save(hops)
    }

    /// The trail under `cache_id`; `None` when absent or expired.
    pub fn load(&self, cache_id: &str) -> Option<Trail> {
        self.store.get(cache_id)
    }

    fn save(&self, hops: Vec<Hop>) -> String {
        let cache_id = new_cache_id();
        self.store.put(
            cache_id.clone(),
            Trail {
                hops,
                created_at: Utc::now(),
            },
            self.ttl,
        );
        cache_id
    }
}

fn new_cache_id() -> String {
    format!("trail_{:016x}", rand::random::<u64>())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl: Duration) -> BreadcrumbCache<MemoryTrailStore> {
        BreadcrumbCache::new(MemoryTrailStore::new(), ttl)
    }

    #[test]
    fn test_create_empty_and_seeded() {
        let cache = cache(Duration::from_secs(60));

        let empty = cache.create(None);
        assert!(cache.load(&empty).unwrap().hops.is_empty());

        let seeded = cache.create(Some(Hop::new("root", "Workspace")));
        let trail = cache.load(&seeded).unwrap();
        assert_eq!(trail.hops.len(), 1);
        assert_eq!(trail.hops[0].node_key, "root");
    }

    #[test]
    fn test_append_returns_fresh_id_and_extends() {
        let cache = cache(Duration::from_secs(60));

        let first = cache.create(Some(Hop::new("a", "A")));
        let second = cache.append(&first, Hop::new("b", "B"));
        assert_ne!(first, second);

        let trail = cache.load(&second).unwrap();
        let keys: Vec<&str> = trail.hops.iter().map(|h| h.node_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_append_never_mutates_the_original_trail() {
        let cache = cache(Duration::from_secs(60));

        let first = cache.create(Some(Hop::new("a", "A")));
        let before = cache.load(&first).unwrap();

        let second = cache.append(&first, Hop::new("b", "B"));
        let third = cache.append(&first, Hop::new("c", "C"));

        // The original still reads back unchanged: back-navigation is
        // simply keeping the previous id.
        assert_eq!(cache.load(&first).unwrap(), before);

        let forked_b = cache.load(&second).unwrap();
        let forked_c = cache.load(&third).unwrap();
        assert_eq!(forked_b.hops.last().unwrap().node_key, "b");
        assert_eq!(forked_c.hops.last().unwrap().node_key, "c");
    }

    #[test]
    fn test_append_on_unknown_id_behaves_as_empty_trail() {
        let cache = cache(Duration::from_secs(60));

        let id = cache.append("trail_does_not_exist", Hop::new("x", "X"));
        let trail = cache.load(&id).unwrap();
        assert_eq!(trail.hops.len(), 1);
        assert_eq!(trail.hops[0].node_key, "x");
    }

    #[test]
    fn test_expired_entries_read_as_not_found() {
        let cache = cache(Duration::from_millis(10));

        let id = cache.create(Some(Hop::new("a", "A")));
        assert!(cache.load(&id).is_some());

        std::thread::sleep(Duration::from_millis(20));
        assert!(cache.load(&id).is_none());

        // Appending to the expired id starts from an empty trail.
        let fresh = cache.append(&id, Hop::new("b", "B"));
        let trail = cache.load(&fresh).unwrap();
        assert_eq!(trail.hops.len(), 1);
        assert_eq!(trail.hops[0].node_key, "b");
    }

    #[test]
    fn test_from_config_applies_ttl() {
        let config = TrailConfig { ttl_secs: 3_600 };
        let cache = BreadcrumbCache::from_config(&config);
        let id = cache.create(Some(Hop::new("root", "Workspace")));
        assert!(cache.load(&id).is_some());
    }

    #[test]
    fn test_cache_ids_are_opaque_and_unique() {
        let cache = cache(Duration::from_secs(60));
        let mut ids = std::collections::HashSet::new();
        for _ in 0..64 {
            let id = cache.create(None);
            assert!(id.starts_with("trail_"));
            assert!(ids.insert(id));
        }
    }
}
