//! Ingestion Module Tests
//!
//! Covers the change-event contract, the in-memory feed and the worker,
//! including the full path from submit to searchable entity.

#[cfg(test)]
mod tests {
    use crate::app::App;
    use crate::config::Config;
    use crate::error::Error;
    use crate::index::projector::ProjectorRegistry;
    use crate::index::types::IndexOutcome;
    use crate::ingestion::feed::{ChangeFeed, MemoryFeed};
    use crate::ingestion::types::{ChangeEvent, Method};
    use crate::storage::memory::{MemoryIndexStore, MemorySnapshotStore, MemorySourceStore};

    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const TOPIC: &str = "indexing-events";

    fn event_record(id: &str, title: &str, description: &str) -> serde_json::Value {
        json!({
            "eventid": id,
            "title": title,
            "description": description,
            "banner_image": ["banner.png", "alt.png"],
            "date": 1_700_000_000_000_i64,
        })
    }

    fn test_app() -> (App, Arc<MemorySourceStore>, Arc<MemoryFeed>) {
        let source = MemorySourceStore::new();
        let feed = MemoryFeed::new();
        let app = App::new(
            Config::default(),
            MemoryIndexStore::new(),
            MemorySnapshotStore::new(),
            source.clone(),
            ProjectorRegistry::with_defaults(),
            feed.clone(),
        );
        (app, source, feed)
    }

    async fn search_ids(app: &App, entity_type: &str, query: &str) -> Vec<String> {
        app.service
            .search(entity_type, query, None)
            .await
            .unwrap()
            .into_iter()
            .map(|hit| hit.entity.id)
            .collect()
    }

    /// Polls until `query` returns `expected` or the attempts run out.
    async fn wait_for_ids(app: &App, entity_type: &str, query: &str, expected: &[&str]) -> bool {
        for _ in 0..200 {
            if search_ids(app, entity_type, query).await == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    // ============================================================
    // CHANGE EVENT TESTS
    // ============================================================

    #[test]
    fn test_method_is_case_insensitive() {
        assert_eq!("create".parse::<Method>().unwrap(), Method::Create);
        assert_eq!("Update".parse::<Method>().unwrap(), Method::Update);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
    }

    #[test]
    fn test_method_accepts_http_verbs() {
        assert_eq!("POST".parse::<Method>().unwrap(), Method::Create);
        assert_eq!("put".parse::<Method>().unwrap(), Method::Update);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Update);
        assert!("GET".parse::<Method>().is_err());
    }

    #[test]
    fn test_parse_event_keeps_passthrough_fields() {
        let event = ChangeEvent::parse(
            r#"{"entity_type":"event","method":"create","entity_id":"ev1","item_id":"x","item_type":"y"}"#,
        )
        .unwrap();

        assert_eq!(event.entity_type, "event");
        assert_eq!(event.method, Method::Create);
        assert_eq!(event.entity_id, "ev1");
        assert_eq!(event.extra["item_id"], "x");
    }

    #[test]
    fn test_event_serializes_method_uppercase() {
        let event = ChangeEvent::new("event", Method::Delete, "ev1");

        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["method"], "DELETE");
    }

    #[test]
    fn test_parse_rejects_invalid_events() {
        assert!(matches!(
            ChangeEvent::parse("not json"),
            Err(Error::MalformedEvent(_))
        ));
        assert!(matches!(
            ChangeEvent::parse(r#"{"entity_type":"event","method":"explode","entity_id":"1"}"#),
            Err(Error::MalformedEvent(_))
        ));
        assert!(matches!(
            ChangeEvent::parse(r#"{"entity_type":"event","method":"create","entity_id":" "}"#),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            ChangeEvent::parse(r#"{"method":"update","entity_id":"1"}"#),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delete_does_not_need_type() {
        let event = ChangeEvent::parse(r#"{"method":"delete","entity_id":"ev1"}"#).unwrap();

        assert_eq!(event.method, Method::Delete);
        assert!(event.entity_type.is_empty());
    }

    // ============================================================
    // FEED TESTS
    // ============================================================

    #[tokio::test]
    async fn test_publish_without_subscribers_is_not_an_error() {
        let feed = MemoryFeed::new();

        assert_eq!(feed.publish(TOPIC, "{}".to_string()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_in_order() {
        let feed = MemoryFeed::new();
        let mut sub = feed.subscribe(TOPIC).await.unwrap();

        assert_eq!(feed.publish(TOPIC, "one".to_string()).await.unwrap(), 1);
        feed.publish(TOPIC, "two".to_string()).await.unwrap();

        assert_eq!(sub.recv().await.as_deref(), Some("one"));
        assert_eq!(sub.recv().await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let feed = MemoryFeed::new();
        let mut other = feed.subscribe("other").await.unwrap();

        assert_eq!(feed.publish(TOPIC, "x".to_string()).await.unwrap(), 0);
        feed.close("other");

        assert_eq!(other.recv().await, None);
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let feed = MemoryFeed::new();
        let mut sub = feed.subscribe(TOPIC).await.unwrap();
        feed.publish(TOPIC, "last".to_string()).await.unwrap();

        feed.close(TOPIC);

        assert_eq!(sub.recv().await.as_deref(), Some("last"));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected() {
        let feed = MemoryFeed::new();

        assert!(matches!(feed.subscribe("").await, Err(Error::Feed(_))));
    }

    // ============================================================
    // WORKER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_worker_indexes_create_event() {
        let (app, source, _) = test_app();
        source.insert("event", "ev1", event_record("ev1", "Tech Conference", "AI and Go talks #golang"));

        let outcome = app
            .worker
            .process(r#"{"entity_type":"event","method":"CREATE","entity_id":"ev1"}"#)
            .await;

        assert_eq!(outcome, Some(IndexOutcome::Indexed { tokens: 6 }));
        assert_eq!(search_ids(&app, "events", "golang").await, vec!["ev1"]);

        let hit = &app.service.search("events", "golang", None).await.unwrap()[0];
        assert_eq!(hit.entity.image, "banner.png");
        assert_eq!(hit.entity.created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_worker_drops_poison_messages() {
        let (app, _, _) = test_app();

        assert_eq!(app.worker.process("{{{").await, None);
        assert_eq!(app.worker.process(r#"{"method":"create"}"#).await, None);

        assert_eq!(app.worker.stats().dropped.load(Ordering::Relaxed), 2);
        assert_eq!(app.worker.stats().processed.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_worker_survives_indexer_failures() {
        let (app, source, _) = test_app();

        // Unknown source type, then a record that does not exist.
        app.worker
            .process(r#"{"entity_type":"spaceship","method":"create","entity_id":"s1"}"#)
            .await;
        app.worker
            .process(r#"{"entity_type":"event","method":"create","entity_id":"missing"}"#)
            .await;
        assert_eq!(app.worker.stats().failed.load(Ordering::Relaxed), 2);

        source.insert("event", "ev1", event_record("ev1", "Still works", ""));
        let outcome = app
            .worker
            .process(r#"{"entity_type":"event","method":"create","entity_id":"ev1"}"#)
            .await;
        assert!(matches!(outcome, Some(IndexOutcome::Indexed { .. })));
    }

    #[tokio::test]
    async fn test_worker_applies_update_and_delete() {
        let (app, source, _) = test_app();
        source.insert("event", "ev1", event_record("ev1", "Red apple", ""));
        app.worker
            .process(r#"{"entity_type":"event","method":"create","entity_id":"ev1"}"#)
            .await;

        source.insert("event", "ev1", event_record("ev1", "Green apple", ""));
        let outcome = app
            .worker
            .process(r#"{"entity_type":"event","method":"update","entity_id":"ev1"}"#)
            .await;
        assert_eq!(
            outcome,
            Some(IndexOutcome::Updated {
                added: 1,
                removed: 1
            })
        );
        assert!(search_ids(&app, "events", "red").await.is_empty());
        assert_eq!(search_ids(&app, "events", "green apple").await, vec!["ev1"]);

        let outcome = app
            .worker
            .process(r#"{"method":"delete","entity_id":"ev1"}"#)
            .await;
        assert_eq!(outcome, Some(IndexOutcome::Deleted { tokens: 2 }));
        assert!(search_ids(&app, "events", "apple").await.is_empty());
    }

    // ============================================================
    // END-TO-END TESTS
    // ============================================================

    #[tokio::test]
    async fn test_submitted_event_becomes_searchable() {
        let (app, source, feed) = test_app();
        let worker = app.spawn_worker().await.unwrap();
        source.insert("event", "ev1", event_record("ev1", "Tech Conference", "AI and Go talks #golang"));

        let delivered = app
            .service
            .submit_change_event(r#"{"entity_type":"event","method":"create","entity_id":"ev1"}"#)
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        assert!(wait_for_ids(&app, "events", "conference", &["ev1"]).await);

        feed.close(TOPIC);
        tokio::time::timeout(Duration::from_secs(1), worker)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_worker_keeps_consuming_after_poison_message() {
        let (app, source, _) = test_app();
        app.spawn_worker().await.unwrap();
        source.insert("event", "ev2", event_record("ev2", "Poetry slam", ""));

        app.feed.publish(TOPIC, "garbage".to_string()).await.unwrap();
        app.feed
            .publish(
                TOPIC,
                r#"{"entity_type":"event","method":"create","entity_id":"ev2"}"#.to_string(),
            )
            .await
            .unwrap();

        assert!(wait_for_ids(&app, "events", "slam", &["ev2"]).await);
        assert_eq!(app.worker.stats().dropped.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_payload_without_publishing() {
        let (app, _, feed) = test_app();
        let mut sub = feed.subscribe(TOPIC).await.unwrap();

        let err = app
            .service
            .submit_change_event(r#"{"entity_type":"event","method":"create"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedEvent(_)));

        feed.close(TOPIC);
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_source_type_without_publishing() {
        let (app, _, feed) = test_app();
        let mut sub = feed.subscribe(TOPIC).await.unwrap();

        for method in ["CREATE", "update"] {
            let raw = format!(
                r#"{{"entity_type":"spaceship","method":"{}","entity_id":"s1"}}"#,
                method
            );
            let err = app.service.submit_change_event(&raw).await.unwrap_err();
            assert!(matches!(err, Error::UnsupportedType(ref t) if t == "spaceship"));
        }

        // Deletes are keyed by id alone, so the type is not checked.
        let delete = r#"{"entity_type":"spaceship","method":"delete","entity_id":"s1"}"#;
        assert_eq!(app.service.submit_change_event(delete).await.unwrap(), 1);

        feed.close(TOPIC);
        assert_eq!(sub.recv().await.as_deref(), Some(delete));
        assert_eq!(sub.recv().await, None);
    }
}
