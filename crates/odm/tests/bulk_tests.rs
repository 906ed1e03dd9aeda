//! Tests for bulk request accumulation and commit.

mod common;

use std::sync::Arc;

use serde_json::{Map, json};

use common::{RecordingTransport, TestContext};
use helios_odm::Bulk;
use helios_odm::error::{OdmError, QueryError};

fn bulk(transport: &RecordingTransport) -> Bulk {
    Bulk::new(Arc::new(transport.clone()), Some("posts".to_string()))
}

#[tokio::test]
async fn test_actions_build_metadata_and_payload_lines() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);

    bulk.id("1").insert(json!({"title": "a"})).await.unwrap();
    bulk.index("archive").id("2").update(json!({"title": "b"})).await.unwrap();
    bulk.id("3").delete().await.unwrap();

    assert_eq!(bulk.operation_count(), 3);
    assert_eq!(
        bulk.body(),
        &[
            json!({"index": {"_index": "posts", "_id": "1"}}),
            json!({"title": "a"}),
            json!({"update": {"_index": "archive", "_id": "2"}}),
            json!({"doc": {"title": "b"}}),
            json!({"delete": {"_index": "posts", "_id": "3"}}),
        ]
    );
}

#[tokio::test]
async fn test_target_resets_after_each_action() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);

    bulk.index("other").id("1").insert(json!({})).await.unwrap();
    bulk.insert(json!({})).await.unwrap();

    assert_eq!(bulk.body()[2], json!({"index": {"_index": "posts"}}));
}

#[tokio::test]
async fn test_update_and_delete_require_an_id() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);

    let err = bulk.update(json!({"a": 1})).await.unwrap_err();
    assert!(matches!(err, OdmError::Query(QueryError::MissingIdentifier { .. })));
    assert!(bulk.delete().await.is_err());
    assert!(bulk.is_empty());
}

#[tokio::test]
async fn test_commit_sends_one_request_and_clears() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);
    bulk.id("1").insert(json!({"title": "a"})).await.unwrap();
    bulk.id("2").delete().await.unwrap();

    let response = bulk.commit().await.unwrap();
    assert!(response.is_some());
    assert!(bulk.is_empty());
    assert_eq!(bulk.operation_count(), 0);

    let call = transport.last("bulk").unwrap();
    assert_eq!(call.params["body"].as_array().unwrap().len(), 3);
    assert!(call.params.get("client").is_none());
}

#[tokio::test]
async fn test_empty_commit_is_noop() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);

    assert!(bulk.commit().await.unwrap().is_none());
    assert_eq!(transport.count("bulk"), 0);
}

#[tokio::test]
async fn test_autocommit_threshold() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport).autocommit_after(2);

    bulk.id("1").insert(json!({})).await.unwrap();
    assert_eq!(transport.count("bulk"), 0);
    bulk.id("2").insert(json!({})).await.unwrap();
    assert_eq!(transport.count("bulk"), 1);
    assert!(bulk.is_empty());

    bulk.id("3").insert(json!({})).await.unwrap();
    bulk.commit().await.unwrap();
    assert_eq!(transport.count("bulk"), 2);
}

#[tokio::test]
async fn test_failed_commit_keeps_actions_for_retry() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport);
    bulk.id("1").insert(json!({"title": "a"})).await.unwrap();

    transport.fail("bulk", 503);
    assert!(bulk.commit().await.is_err());
    assert_eq!(bulk.operation_count(), 1);
    assert_eq!(bulk.body().len(), 2);

    assert!(bulk.commit().await.unwrap().is_some());
    assert!(bulk.is_empty());
    let calls = transport.calls_to("bulk");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].params["body"], calls[1].params["body"]);
}

#[tokio::test]
async fn test_failed_autocommit_keeps_triggering_action() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport).autocommit_after(1);

    transport.fail("bulk", 503);
    assert!(bulk.id("1").insert(json!({})).await.is_err());
    assert_eq!(bulk.operation_count(), 1);

    bulk.commit().await.unwrap();
    assert!(bulk.is_empty());
    assert_eq!(transport.count("bulk"), 2);
}

#[tokio::test]
async fn test_ignored_statuses_forwarded() {
    let transport = RecordingTransport::new();
    let mut bulk = bulk(&transport).ignore([409, 404]);
    bulk.id("1").delete().await.unwrap();
    bulk.commit().await.unwrap();

    let call = transport.last("bulk").unwrap();
    assert_eq!(call.params["client"], json!({"ignore": [404, 409]}));
}

#[tokio::test]
async fn test_bulk_documents_from_builder() {
    let ctx = TestContext::new();
    let posts = ctx.posts();

    let mut documents = Map::new();
    documents.insert("1".to_string(), json!({"title": "a"}));
    documents.insert("2".to_string(), json!({"title": "b"}));

    posts
        .new_query()
        .bulk_documents(documents)
        .await
        .unwrap();

    let call = ctx.transport.last("bulk").unwrap();
    let lines = call.params["body"].as_array().unwrap().clone();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], json!({"index": {"_index": "posts", "_id": "1"}}));
    assert_eq!(lines[3], json!({"title": "b"}));
}

#[tokio::test]
async fn test_bulk_with_sequences_actions() {
    let ctx = TestContext::new();
    let posts = ctx.posts();

    let response = posts
        .new_query()
        .ignore([404])
        .bulk_with(async |bulk| {
            bulk.id("1").insert(json!({"title": "a"})).await?;
            bulk.id("2").delete().await?;
            Ok(())
        })
        .await
        .unwrap();

    assert!(response.is_some());
    let call = ctx.transport.last("bulk").unwrap();
    assert_eq!(call.params["body"].as_array().unwrap().len(), 3);
    assert_eq!(call.params["client"], json!({"ignore": [404]}));
}

#[tokio::test]
async fn test_bulk_with_error_skips_commit() {
    let ctx = TestContext::new();
    let posts = ctx.posts();

    let result = posts
        .new_query()
        .bulk_with(async |bulk| {
            bulk.id("1").insert(json!({})).await?;
            bulk.update(json!({"missing": "id"})).await?;
            Ok(())
        })
        .await;

    assert!(result.is_err());
    assert_eq!(ctx.transport.count("bulk"), 0);
}
