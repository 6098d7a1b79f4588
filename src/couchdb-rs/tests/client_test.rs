mod support;

use couchdb_rs::{Context, Document, ErrorKind};
use serde_json::json;

use support::{client_with, init_tracing, MemoryCouch};

fn is_hex(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

fn is_first_revision(value: &str) -> bool {
    value
        .strip_prefix("1-")
        .is_some_and(|hash| is_hex(hash, 32))
}

#[tokio::test]
async fn test_document_lifecycle() {
    init_tracing();
    let client = client_with(MemoryCouch::new());
    let ctx = Context::background();
    let db = client.database("test");

    let status = db.create().send(&ctx).await.unwrap();
    assert!(status.ok);

    let err = db.create().send(&ctx).await.unwrap_err();
    assert!(err.is_already_exists(), "got {err}");

    let document = Document::try_from(json!({"test": "value"})).unwrap();
    let created = db.create_document(document).send(&ctx).await.unwrap();
    assert!(created.ok);
    assert!(is_hex(&created.id, 32), "id {}", created.id);
    assert!(is_first_revision(&created.revision), "rev {}", created.revision);

    let fetched = db
        .document(&created.id)
        .fetch()
        .send(&ctx)
        .await
        .unwrap()
        .modified()
        .unwrap();
    let doc = fetched.document;
    assert_eq!(doc.len(), 3);
    assert_eq!(doc.get("test"), Some(&json!("value")));
    assert_eq!(doc.id(), Some(created.id.as_str()));
    assert_eq!(doc.revision(), Some(created.revision.as_str()));
    assert!(fetched.attachments.is_empty());

    let updated = db
        .document(&created.id)
        .update(&created.revision, doc)
        .send(&ctx)
        .await
        .unwrap();
    assert!(updated.ok);
    assert_ne!(updated.revision, created.revision);

    let deleted = db
        .document(&created.id)
        .delete(&updated.revision)
        .send(&ctx)
        .await
        .unwrap();
    assert!(deleted.ok);

    let err = db.document(&created.id).fetch().send(&ctx).await.unwrap_err();
    assert!(err.is_not_found(), "got {err}");
}

#[tokio::test]
async fn test_stale_revision_conflicts() {
    let client = client_with(MemoryCouch::new());
    let ctx = Context::background();
    let db = client.database("stale");
    db.create().send(&ctx).await.unwrap();

    let doc = db.document("fixed-id");
    let first = doc
        .create(Document::try_from(json!({"n": 1})).unwrap())
        .send(&ctx)
        .await
        .unwrap();
    assert_eq!(first.id, "fixed-id");

    doc.update(&first.revision, Document::try_from(json!({"n": 2})).unwrap())
        .send(&ctx)
        .await
        .unwrap();

    let err = doc
        .update(&first.revision, Document::try_from(json!({"n": 3})).unwrap())
        .send(&ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(err.message(), Some("Document update conflict."));

    let err = doc.delete(&first.revision).send(&ctx).await.unwrap_err();
    assert!(err.is_already_exists());
}

#[tokio::test]
async fn test_conditional_fetch() {
    let client = client_with(MemoryCouch::new());
    let ctx = Context::background();
    let db = client.database("conditional");
    db.create().send(&ctx).await.unwrap();

    let created = db
        .create_document(Document::try_from(json!({"a": 1})).unwrap())
        .send(&ctx)
        .await
        .unwrap();
    let doc = db.document(&created.id);

    let fetched = doc
        .fetch()
        .revision(&created.revision)
        .send(&ctx)
        .await
        .unwrap();
    assert!(fetched.is_not_modified());

    let meta = doc.fetch_meta().send(&ctx).await.unwrap().modified().unwrap();
    assert_eq!(meta.revision, created.revision);
    assert!(meta.content_length > 0);

    let meta = doc
        .fetch_meta()
        .revision(&created.revision)
        .send(&ctx)
        .await
        .unwrap();
    assert!(meta.is_not_modified());
}

#[tokio::test]
async fn test_database_management() {
    let client = client_with(MemoryCouch::new());
    let ctx = Context::background();

    let info = client.instance_info().send(&ctx).await.unwrap();
    assert_eq!(info.couchdb, "Welcome");
    assert_eq!(info.vendor.name, "The Apache Software Foundation");

    assert!(client.all_databases().send(&ctx).await.unwrap().is_empty());

    let db = client.database("inventory");
    assert!(!db.exists(&ctx).await.unwrap());
    db.create().send(&ctx).await.unwrap();
    assert!(db.exists(&ctx).await.unwrap());

    db.create_document(Document::try_from(json!({"sku": "a-1"})).unwrap())
        .send(&ctx)
        .await
        .unwrap();
    let info = db.info().send(&ctx).await.unwrap();
    assert_eq!(info.name, "inventory");
    assert_eq!(info.document_count, 1);
    assert_eq!(info.cluster.n, 1);

    assert_eq!(
        client.all_databases().send(&ctx).await.unwrap(),
        vec!["inventory".to_string()]
    );

    db.delete().send(&ctx).await.unwrap();
    assert!(!db.exists(&ctx).await.unwrap());

    let err = db.delete().send(&ctx).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message(), Some("Database does not exist."));

    let err = db.info().send(&ctx).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_operations_in_missing_database() {
    let client = client_with(MemoryCouch::new());
    let ctx = Context::background();
    let db = client.database("absent");

    let err = db
        .create_document(Document::new())
        .send(&ctx)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = db.document("x").fetch_meta().send(&ctx).await.unwrap_err();
    assert!(err.is_not_found());
}
