//! In-process memory store with a short-term and a long-term partition.
//!
//! Expiry is lazy: reads evict the expired entries they touch, and a full
//! sweep only happens through [`MemoryStore::cleanup_expired`] or
//! [`MemoryStore::statistics`].

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;
use triad_core::memory::{MemoryEntry, MemoryType};

/// TTL given to short-term entries stored without one.
pub const DEFAULT_SHORT_TERM_TTL_SECS: i64 = 30 * 60;

/// Id of the metadata entry seeded on construction.
pub const SYSTEM_METADATA_ID: &str = "system_metadata";

#[derive(Debug, Default)]
struct Partitions {
    short_term: HashMap<String, MemoryEntry>,
    long_term: HashMap<String, MemoryEntry>,
}

impl Partitions {
    fn get(&self, kind: MemoryType) -> &HashMap<String, MemoryEntry> {
        match kind {
            MemoryType::ShortTerm => &self.short_term,
            MemoryType::LongTerm => &self.long_term,
        }
    }

    fn get_mut(&mut self, kind: MemoryType) -> &mut HashMap<String, MemoryEntry> {
        match kind {
            MemoryType::ShortTerm => &mut self.short_term,
            MemoryType::LongTerm => &mut self.long_term,
        }
    }

    /// Remove every expired entry in one partition, returning how many went.
    fn sweep(&mut self, kind: MemoryType, now: DateTime<Utc>) -> usize {
        let map = self.get_mut(kind);
        let before = map.len();
        map.retain(|_, e| !e.is_expired_at(now));
        before - map.len()
    }
}

/// Partitions to visit for an optional partition filter, short-term first.
fn scope(kind: Option<MemoryType>) -> &'static [MemoryType] {
    match kind {
        Some(MemoryType::ShortTerm) => &[MemoryType::ShortTerm],
        Some(MemoryType::LongTerm) => &[MemoryType::LongTerm],
        None => &[MemoryType::ShortTerm, MemoryType::LongTerm],
    }
}

/// Per-partition figures reported by [`MemoryStore::statistics`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionStats {
    pub count: usize,
    pub size_estimate: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStatistics {
    pub short_term: PartitionStats,
    pub long_term: PartitionStats,
    pub timestamp: DateTime<Utc>,
}

/// Thread-safe two-partition key/value store.
///
/// One coarse lock guards both partitions; every operation holds it for
/// its whole duration.
pub struct MemoryStore {
    partitions: RwLock<Partitions>,
}

impl MemoryStore {
    /// Create a store seeded with the `system_metadata` long-term entry.
    pub fn new() -> Self {
        let store = Self::empty();
        store.store(
            MemoryEntry::new(
                SYSTEM_METADATA_ID,
                json!({
                    "initialized": Utc::now().to_rfc3339(),
                    "version": env!("CARGO_PKG_VERSION"),
                    "status": "active",
                }),
                MemoryType::LongTerm,
            )
            .with_tags(["system", "metadata"])
            .with_priority(10),
        );
        store
    }

    /// Create a store with nothing in it.
    pub fn empty() -> Self {
        Self {
            partitions: RwLock::new(Partitions::default()),
        }
    }

    /// Insert or overwrite an entry in its own partition.
    ///
    /// Short-term entries without a TTL get [`DEFAULT_SHORT_TERM_TTL_SECS`].
    pub fn store(&self, mut entry: MemoryEntry) {
        if entry.memory_type == MemoryType::ShortTerm && entry.ttl.is_none() {
            entry.ttl = Some(TimeDelta::seconds(DEFAULT_SHORT_TERM_TTL_SECS));
        }
        debug!(id = %entry.id, partition = %entry.memory_type, "Memory entry stored");
        let kind = entry.memory_type;
        self.partitions
            .write()
            .unwrap()
            .get_mut(kind)
            .insert(entry.id.clone(), entry);
    }

    /// Look an entry up, short-term first when no partition is given.
    ///
    /// An expired entry is evicted and reported as absent.
    pub fn retrieve(&self, id: &str, memory_type: Option<MemoryType>) -> Option<MemoryEntry> {
        let now = Utc::now();
        let mut parts = self.partitions.write().unwrap();
        for &kind in scope(memory_type) {
            let map = parts.get_mut(kind);
            match map.get(id) {
                Some(e) if e.is_expired_at(now) => {
                    debug!(id, partition = %kind, "Evicted expired memory entry");
                    map.remove(id);
                }
                Some(e) => return Some(e.clone()),
                None => {}
            }
        }
        None
    }

    /// Entries carrying any of `tags` (all entries when `tags` is empty),
    /// sorted by priority then creation time, both descending.
    pub fn search<S: AsRef<str>>(&self, tags: &[S], memory_type: Option<MemoryType>) -> Vec<MemoryEntry> {
        let now = Utc::now();
        let mut parts = self.partitions.write().unwrap();
        let mut results = Vec::new();
        for &kind in scope(memory_type) {
            parts.sweep(kind, now);
            results.extend(
                parts
                    .get(kind)
                    .values()
                    .filter(|e| tags.is_empty() || e.has_any_tag(tags))
                    .cloned(),
            );
        }
        results.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.creation_time.cmp(&a.creation_time))
        });
        results
    }

    /// Replace an entry's content (and tags, when given) in place.
    ///
    /// Returns `false` if the id is unknown or the entry has expired.
    pub fn update(&self, id: &str, content: serde_json::Value, tags: Option<Vec<String>>) -> bool {
        let now = Utc::now();
        let mut parts = self.partitions.write().unwrap();
        for &kind in scope(None) {
            if let Some(entry) = parts.get_mut(kind).get_mut(id) {
                if entry.is_expired_at(now) {
                    return false;
                }
                entry.content = content;
                if let Some(tags) = tags {
                    entry.tags = tags;
                }
                return true;
            }
        }
        false
    }

    /// Remove an entry from one partition, or from both when none is given.
    pub fn delete(&self, id: &str, memory_type: Option<MemoryType>) -> bool {
        let mut parts = self.partitions.write().unwrap();
        let mut removed = false;
        for &kind in scope(memory_type) {
            removed |= parts.get_mut(kind).remove(id).is_some();
        }
        removed
    }

    /// Sweep both partitions, returning the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut parts = self.partitions.write().unwrap();
        let removed = parts.sweep(MemoryType::ShortTerm, now) + parts.sweep(MemoryType::LongTerm, now);
        if removed > 0 {
            debug!(removed, "Expired memory entries cleaned up");
        }
        removed
    }

    /// Clean up, then count and size each partition.
    pub fn statistics(&self) -> MemoryStatistics {
        self.cleanup_expired();
        let parts = self.partitions.read().unwrap();
        let stats = |kind| {
            let map: &HashMap<String, MemoryEntry> = parts.get(kind);
            PartitionStats {
                count: map.len(),
                size_estimate: map.values().map(MemoryEntry::size_estimate).sum(),
            }
        };
        MemoryStatistics {
            short_term: stats(MemoryType::ShortTerm),
            long_term: stats(MemoryType::LongTerm),
            timestamp: Utc::now(),
        }
    }

    /// Empty one partition, or both.
    pub fn clear(&self, memory_type: Option<MemoryType>) {
        let mut parts = self.partitions.write().unwrap();
        for &kind in scope(memory_type) {
            parts.get_mut(kind).clear();
        }
    }

    /// Number of stored entries (expired ones included until swept).
    pub fn len(&self) -> usize {
        let parts = self.partitions.read().unwrap();
        parts.short_term.len() + parts.long_term.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short(id: &str) -> MemoryEntry {
        MemoryEntry::new(id, json!(id), MemoryType::ShortTerm)
    }

    fn long(id: &str) -> MemoryEntry {
        MemoryEntry::new(id, json!(id), MemoryType::LongTerm)
    }

    #[test]
    fn new_store_seeds_system_metadata() {
        let mem = MemoryStore::new();
        let meta = mem.retrieve(SYSTEM_METADATA_ID, Some(MemoryType::LongTerm)).unwrap();
        assert_eq!(meta.priority, 10);
        assert_eq!(meta.content["status"], "active");
        assert!(meta.tags.contains(&"system".to_string()));
    }

    #[test]
    fn short_term_entries_get_default_ttl() {
        let mem = MemoryStore::empty();
        mem.store(short("a"));
        let entry = mem.retrieve("a", None).unwrap();
        assert_eq!(entry.ttl, Some(TimeDelta::minutes(30)));

        mem.store(long("b"));
        assert!(mem.retrieve("b", None).unwrap().ttl.is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_retrieve() {
        let mem = MemoryStore::empty();
        mem.store(
            short("old")
                .with_ttl(TimeDelta::seconds(5))
                .created_at(Utc::now() - TimeDelta::seconds(60)),
        );
        assert_eq!(mem.len(), 1);
        assert!(mem.retrieve("old", None).is_none());
        assert_eq!(mem.len(), 0);
    }

    #[test]
    fn entry_without_ttl_survives_indefinitely() {
        let mem = MemoryStore::empty();
        mem.store(long("forever").created_at(Utc::now() - TimeDelta::days(400)));
        let entry = mem.retrieve("forever", None).unwrap();
        assert_eq!(entry.content, json!("forever"));
    }

    #[test]
    fn retrieve_prefers_short_term() {
        let mem = MemoryStore::empty();
        mem.store(MemoryEntry::new("dup", json!("long"), MemoryType::LongTerm));
        mem.store(MemoryEntry::new("dup", json!("short"), MemoryType::ShortTerm));
        assert_eq!(mem.retrieve("dup", None).unwrap().content, json!("short"));
        assert_eq!(
            mem.retrieve("dup", Some(MemoryType::LongTerm)).unwrap().content,
            json!("long")
        );
    }

    #[test]
    fn search_orders_by_priority_then_recency() {
        let mem = MemoryStore::empty();
        let now = Utc::now();
        mem.store(long("low").with_priority(2).created_at(now));
        mem.store(long("high-old").with_priority(8).created_at(now - TimeDelta::hours(1)));
        mem.store(long("high-new").with_priority(8).created_at(now));
        mem.store(
            short("expired")
                .with_priority(10)
                .with_ttl(TimeDelta::seconds(1))
                .created_at(now - TimeDelta::minutes(1)),
        );

        let ids: Vec<_> = mem
            .search::<&str>(&[], None)
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["high-new", "high-old", "low"]);
        // The expired entry was swept as a side effect.
        assert_eq!(mem.len(), 3);
    }

    #[test]
    fn search_uses_or_semantics_for_tags() {
        let mem = MemoryStore::empty();
        mem.store(long("a").with_tags(["alpha"]));
        mem.store(long("b").with_tags(["beta", "gamma"]));
        mem.store(long("c").with_tags(["delta"]));

        let hits = mem.search(&["alpha", "gamma"], Some(MemoryType::LongTerm));
        let mut ids: Vec<_> = hits.into_iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(mem.search(&["alpha"], Some(MemoryType::ShortTerm)).is_empty());
    }

    #[test]
    fn update_replaces_content_and_tags() {
        let mem = MemoryStore::empty();
        mem.store(long("x").with_tags(["old"]));
        assert!(mem.update("x", json!({"v": 2}), Some(vec!["new".into()])));
        let entry = mem.retrieve("x", None).unwrap();
        assert_eq!(entry.content, json!({"v": 2}));
        assert_eq!(entry.tags, vec!["new"]);

        assert!(mem.update("x", json!(3), None));
        assert_eq!(mem.retrieve("x", None).unwrap().tags, vec!["new"]);
    }

    #[test]
    fn update_fails_for_missing_or_expired() {
        let mem = MemoryStore::empty();
        assert!(!mem.update("ghost", json!(1), None));
        mem.store(
            short("stale")
                .with_ttl(TimeDelta::seconds(1))
                .created_at(Utc::now() - TimeDelta::minutes(5)),
        );
        assert!(!mem.update("stale", json!(1), None));
    }

    #[test]
    fn delete_is_idempotent() {
        let mem = MemoryStore::empty();
        mem.store(short("s"));
        mem.store(long("s"));
        assert!(mem.delete("s", Some(MemoryType::LongTerm)));
        assert!(!mem.delete("s", Some(MemoryType::LongTerm)));
        assert!(mem.delete("s", None));
        assert!(!mem.delete("s", None));
    }

    #[test]
    fn statistics_cleans_up_first() {
        let mem = MemoryStore::empty();
        mem.store(MemoryEntry::new("a", json!("abc"), MemoryType::ShortTerm));
        mem.store(
            short("gone")
                .with_ttl(TimeDelta::seconds(1))
                .created_at(Utc::now() - TimeDelta::minutes(1)),
        );
        mem.store(MemoryEntry::new("b", json!("hello"), MemoryType::LongTerm));

        let stats = mem.statistics();
        assert_eq!(stats.short_term, PartitionStats { count: 1, size_estimate: 3 });
        assert_eq!(stats.long_term, PartitionStats { count: 1, size_estimate: 5 });
    }

    #[test]
    fn clear_one_partition() {
        let mem = MemoryStore::new();
        mem.store(short("a"));
        mem.clear(Some(MemoryType::ShortTerm));
        assert!(mem.retrieve("a", None).is_none());
        assert!(mem.retrieve(SYSTEM_METADATA_ID, None).is_some());
        mem.clear(None);
        assert!(mem.is_empty());
    }
}
