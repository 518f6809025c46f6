//! Time-bounded result cache for idempotent read actions
//!
//! Keys are a canonical encoding of (action name, argument mapping) with
//! object keys sorted recursively, so two semantically identical calls
//! collide regardless of key insertion order. Entries are evicted lazily on
//! read once they outlive the TTL; there is no background sweep.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::RwLock;

use crate::agent::domain::ActionResult;

struct CacheEntry {
    result: ActionResult,
    inserted_at: Instant,
}

pub struct ResultCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, action: &str, arguments: &Value) -> Option<ActionResult> {
        self.get_at(action, arguments, Instant::now()).await
    }

    pub async fn put(&self, action: &str, arguments: &Value, result: ActionResult) {
        self.put_at(action, arguments, result, Instant::now()).await;
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    async fn get_at(&self, action: &str, arguments: &Value, now: Instant) -> Option<ActionResult> {
        let key = cache_key(action, arguments);
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if now.duration_since(entry.inserted_at) <= self.ttl => {
                    return Some(entry.result.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Stale entry: evict and report a miss.
        self.entries.write().await.remove(&key);
        None
    }

    async fn put_at(&self, action: &str, arguments: &Value, result: ActionResult, now: Instant) {
        let key = cache_key(action, arguments);
        self.entries.write().await.insert(
            key,
            CacheEntry {
                result,
                inserted_at: now,
            },
        );
    }
}

/// Deterministic cache key for an action invocation
pub fn cache_key(action: &str, arguments: &Value) -> String {
    format!("{}:{}", action, canonicalize(arguments))
}

/// Rebuild a JSON value with all object keys in sorted order. serde_json's
/// default map is already ordered, but the `preserve_order` feature is
/// additive across the dependency graph, so the sort is made explicit here.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            let mut out = serde_json::Map::with_capacity(sorted.len());
            for (key, child) in sorted {
                out.insert(key.clone(), canonicalize(child));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(marker: &str) -> ActionResult {
        ActionResult::new(json!({ "marker": marker }))
    }

    #[test]
    fn key_is_independent_of_field_order() {
        let a = json!({ "query": "Italian", "limit": 5, "filter": { "locality": "New York", "neighborhood": "Williamsburg" } });
        let b = json!({ "filter": { "neighborhood": "Williamsburg", "locality": "New York" }, "limit": 5, "query": "Italian" });
        assert_eq!(
            cache_key("search_restaurants", &a),
            cache_key("search_restaurants", &b)
        );
    }

    #[test]
    fn key_distinguishes_different_arguments() {
        let a = json!({ "query": "Italian" });
        let b = json!({ "query": "ramen" });
        assert_ne!(
            cache_key("search_restaurants", &a),
            cache_key("search_restaurants", &b)
        );
    }

    #[tokio::test]
    async fn hit_within_ttl_miss_after() {
        let cache = ResultCache::new(Duration::from_secs(300));
        let args = json!({ "query": "Italian" });
        let t0 = Instant::now();

        cache.put_at("search_restaurants", &args, result("first"), t0).await;

        let hit = cache
            .get_at("search_restaurants", &args, t0 + Duration::from_secs(299))
            .await;
        assert_eq!(hit.unwrap().value["marker"], "first");

        let stale = cache
            .get_at("search_restaurants", &args, t0 + Duration::from_secs(301))
            .await;
        assert!(stale.is_none());

        // The stale entry was evicted, not just skipped.
        assert!(cache.entries.read().await.is_empty());
    }

    #[tokio::test]
    async fn reordered_arguments_hit_the_same_entry() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache
            .put(
                "search_restaurants",
                &json!({ "query": "Italian", "limit": 5 }),
                result("cached"),
            )
            .await;

        let hit = cache
            .get("search_restaurants", &json!({ "limit": 5, "query": "Italian" }))
            .await;
        assert_eq!(hit.unwrap().value["marker"], "cached");
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let cache = ResultCache::new(Duration::from_secs(300));
        cache
            .put("search_restaurants", &json!({ "query": "a" }), result("x"))
            .await;
        cache.clear().await;
        assert!(cache
            .get("search_restaurants", &json!({ "query": "a" }))
            .await
            .is_none());
    }
}
