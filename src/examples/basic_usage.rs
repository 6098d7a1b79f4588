//! Basic Usage Example
//!
//! Creates a database, writes a document with an attachment, reads both back
//! and cleans up. Connection settings come from `COUCHDB_BASE_URL`,
//! `COUCHDB_USERNAME` and `COUCHDB_PASSWORD`.
//!
//! Run with: cargo run --example basic_usage
//! Set `LOG_FORMAT=json` for structured log output.

use bytes::Bytes;
use couchdb_rs::{Client, ClientConfig, Context, Document};
use serde_json::json;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("basic_usage=info,couchdb_rs=debug,couchdb_core=debug"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true),
            )
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_telemetry()?;

    let config = ClientConfig::from_env();
    let client = Client::from_config(&config)?;
    let ctx = Context::background();

    let info = client.instance_info().send(&ctx).await?;
    tracing::info!(version = %info.version, vendor = %info.vendor.name, "connected");

    let db = client.database(format!("basic-usage-{}", uuid::Uuid::new_v4().simple()));
    db.create().send(&ctx).await?;
    tracing::info!(database = db.name(), "created database");

    let created = db
        .create_document(Document::try_from(json!({"title": "Quarterly report", "pages": 12}))?)
        .send(&ctx)
        .await?;
    tracing::info!(id = %created.id, rev = %created.revision, "created document");

    let doc = db.document(&created.id);
    let stored = doc
        .attachment("summary.txt")
        .store(&created.revision, "text/plain", Bytes::from_static(b"Revenue is up."))
        .send(&ctx)
        .await?;

    if let Some(fetched) = doc.fetch().attachments(true).send(&ctx).await?.modified() {
        tracing::info!(
            title = ?fetched.document.get("title"),
            attachments = ?fetched.attachments.keys().collect::<Vec<_>>(),
            "fetched document"
        );
    }

    // Asking again with the current revision costs no body.
    let unchanged = doc.fetch().revision(&stored.revision).send(&ctx).await?;
    tracing::info!(not_modified = unchanged.is_not_modified(), "conditional fetch");

    let databases = client.all_databases().send(&ctx).await?;
    tracing::info!(count = databases.len(), "databases on server");

    db.delete().send(&ctx).await?;
    tracing::info!(database = db.name(), "deleted database");

    Ok(())
}
