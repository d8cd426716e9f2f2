//! Storage Module Tests
//!
//! Validates the in-memory backends and the store policy.
//!
//! ## Test Scopes
//! - **Sorted sets**: idempotent add/remove, score ordering, lexicographic ranges.
//! - **Batches**: all-or-nothing visibility and key cleanup.
//! - **TTL values**: expiry of cached entries.
//! - **Snapshots**: upsert, lookup and type-filtered bulk fetch.
//! - **Policy**: deadlines and bounded retries.

#[cfg(test)]
mod tests {
    use crate::error::{Error, Stage};
    use crate::index::types::IndexableEntity;
    use crate::storage::memory::{MemoryIndexStore, MemorySnapshotStore, MemorySourceStore};
    use crate::storage::policy::StorePolicy;
    use crate::storage::protocol::{Batch, hashtag_key, inverted_key};
    use crate::storage::store::{IndexStore, SnapshotStore, SourceStore, touched_keys};
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn entity(id: &str, entity_type: &str) -> IndexableEntity {
        IndexableEntity::new(
            id,
            entity_type,
            "Title",
            "Description",
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        )
    }

    // ============================================================
    // KEY LAYOUT
    // ============================================================

    #[test]
    fn test_keys_are_partitioned_by_type() {
        assert_eq!(inverted_key("events", "golang"), "inverted:events:golang");
        assert_eq!(hashtag_key("events", "#golang"), "hashtag:events:#golang");
        assert_ne!(inverted_key("events", "go"), inverted_key("places", "go"));
    }

    #[test]
    fn test_touched_keys_counts_distinct_keys() {
        let mut batch = Batch::new();
        batch.add("a".to_string(), "1", 1.0);
        batch.add("a".to_string(), "2", 1.0);
        batch.remove("b".to_string(), "1");

        assert_eq!(batch.len(), 3);
        assert_eq!(touched_keys(&batch), 2);
    }

    // ============================================================
    // SORTED SET TESTS
    // ============================================================

    #[tokio::test]
    async fn test_add_member_is_idempotent_and_last_write_wins() {
        let store = MemoryIndexStore::new();

        store.add_member("k", "e1", 10.0).await.unwrap();
        store.add_member("k", "e1", 20.0).await.unwrap();

        let members = store.range_by_score_desc("k").await.unwrap();
        assert_eq!(members, vec![("e1".to_string(), 20.0)]);
    }

    #[tokio::test]
    async fn test_range_by_score_desc_orders_by_recency() {
        let store = MemoryIndexStore::new();
        store.add_member("k", "old", 1.0).await.unwrap();
        store.add_member("k", "new", 3.0).await.unwrap();
        store.add_member("k", "mid", 2.0).await.unwrap();

        let ids: Vec<String> = store
            .range_by_score_desc("k")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_unknown_key_is_empty_not_error() {
        let store = MemoryIndexStore::new();

        assert!(store.range_by_score_desc("missing").await.unwrap().is_empty());
        assert_eq!(store.score("missing", "x").await, None);
    }

    #[tokio::test]
    async fn test_remove_non_member_is_noop() {
        let store = MemoryIndexStore::new();
        store.add_member("k", "e1", 1.0).await.unwrap();

        store.remove_member("k", "ghost").await.unwrap();
        store.remove_member("other", "e1").await.unwrap();

        assert_eq!(store.score("k", "e1").await, Some(1.0));
    }

    #[tokio::test]
    async fn test_removing_last_member_drops_key() {
        let store = MemoryIndexStore::new();
        store.add_member("k", "e1", 1.0).await.unwrap();
        assert_eq!(store.key_count().await, 1);

        store.remove_member("k", "e1").await.unwrap();

        assert_eq!(store.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_range_by_lex_is_closed_open_and_limited() {
        let store = MemoryIndexStore::new();
        for word in ["cab", "car", "cat", "dog", "ca", "c"] {
            store.add_member("vocab", word, 0.0).await.unwrap();
        }

        let max = format!("ca{}", char::MAX);
        let all = store.range_by_lex("vocab", "ca", &max, 10).await.unwrap();
        assert_eq!(all, vec!["ca", "cab", "car", "cat"]);

        let limited = store.range_by_lex("vocab", "ca", &max, 2).await.unwrap();
        assert_eq!(limited, vec!["ca", "cab"]);

        let inverted = store.range_by_lex("vocab", "z", "a", 10).await.unwrap();
        assert!(inverted.is_empty());
    }

    // ============================================================
    // BATCH TESTS
    // ============================================================

    #[tokio::test]
    async fn test_batch_applies_all_ops_in_order() {
        let store = MemoryIndexStore::new();
        let mut batch = Batch::new();
        batch.add("a".to_string(), "e1", 1.0);
        batch.add("b".to_string(), "e1", 1.0);
        batch.remove("a".to_string(), "e1");

        store.apply(&batch).await.unwrap();

        assert!(store.members("a").await.is_empty());
        assert_eq!(store.members("b").await, vec!["e1"]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let store = MemoryIndexStore::new();
        store.apply(&Batch::new()).await.unwrap();
        assert_eq!(store.key_count().await, 0);
    }

    // ============================================================
    // TTL VALUE TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires_after_ttl() {
        let store = MemoryIndexStore::new();
        store
            .set_ex("cache", "value".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.get("cache").await.unwrap(), Some("value".to_string()));

        tokio::time::advance(Duration::from_secs(61)).await;

        assert_eq!(store.get("cache").await.unwrap(), None);
    }

    // ============================================================
    // SNAPSHOT STORE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_snapshot_upsert_overwrites() {
        let store = MemorySnapshotStore::new();
        let mut e = entity("e1", "events");
        store.upsert(&e).await.unwrap();

        e.title = "Renamed".to_string();
        store.upsert(&e).await.unwrap();

        let found = store.find_by_id("e1").await.unwrap().unwrap();
        assert_eq!(found.title, "Renamed");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_delete_is_idempotent() {
        let store = MemorySnapshotStore::new();
        store.upsert(&entity("e1", "events")).await.unwrap();

        store.delete_by_id("e1").await.unwrap();
        store.delete_by_id("e1").await.unwrap();

        assert!(store.find_by_id("e1").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_find_many_filters_by_type_and_skips_missing() {
        let store = MemorySnapshotStore::new();
        store.upsert(&entity("e1", "events")).await.unwrap();
        store.upsert(&entity("p1", "places")).await.unwrap();

        let ids = vec!["e1".to_string(), "p1".to_string(), "gone".to_string()];
        let found = store
            .find_many_by_ids_and_type(&ids, "events")
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "e1");
    }

    #[tokio::test]
    async fn test_source_store_roundtrip() {
        let store = MemorySourceStore::new();
        store.insert("event", "e1", serde_json::json!({"title": "Tech"}));

        assert!(store.fetch("event", "e1").await.unwrap().is_some());
        assert!(store.fetch("place", "e1").await.unwrap().is_none());

        store.remove("event", "e1");
        assert!(store.fetch("event", "e1").await.unwrap().is_none());
    }

    // ============================================================
    // POLICY TESTS
    // ============================================================

    #[tokio::test(start_paused = true)]
    async fn test_call_times_out() {
        let policy = StorePolicy::new(Duration::from_millis(100), 3, Duration::ZERO);

        let result: Result<(), Error> = policy
            .call(Stage::IndexStore, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;

        match result {
            Err(Error::Timeout { stage, after }) => {
                assert_eq!(stage, Stage::IndexStore);
                assert_eq!(after, Duration::from_millis(100));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let policy = StorePolicy::new(Duration::from_secs(1), 3, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result = policy
            .call_with_retry(Stage::IndexStore, move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::IndexStore("connection reset".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_attempts() {
        let policy = StorePolicy::new(Duration::from_secs(1), 3, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result: Result<(), Error> = policy
            .call_with_retry(Stage::SnapshotStore, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::SnapshotStore("down".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_permanent_errors() {
        let policy = StorePolicy::new(Duration::from_secs(1), 3, Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let result: Result<(), Error> = policy
            .call_with_retry(Stage::SourceStore, move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(Error::projection("event", "e1", "not found"))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
