//! Transport doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use couchdb_rs::{Client, Error, Result, Transport, TransportRequest, TransportResponse};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};

pub const BASE_URL: &str = "http://couch.test:5984";

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn client_with(transport: Arc<dyn Transport>) -> Client {
    Client::builder(BASE_URL)
        .transport(transport)
        .build()
        .expect("client")
}

/// Canned response builder.
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    pub fn new(status: u16) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("status"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn json(status: u16, value: Value) -> Self {
        Self::new(status).body("application/json", serde_json::to_vec(&value).expect("json"))
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers
            .insert(name, HeaderValue::from_str(value).expect("header value"));
        self
    }

    pub fn body(mut self, content_type: &str, body: impl Into<Bytes>) -> Self {
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).expect("content type"),
        );
        self.body = body.into();
        self
    }

    fn into_response(self) -> TransportResponse {
        TransportResponse {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Replays queued replies in order and records every request it sees.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> TransportRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no reply scripted");
        Ok(reply.into_response())
    }
}

/// Never answers; used to observe cancellation.
pub struct StalledTransport;

#[async_trait]
impl Transport for StalledTransport {
    async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse> {
        std::future::pending().await
    }
}

/// Fails every call as if the connection dropped mid-body.
pub struct BrokenBodyTransport;

#[async_trait]
impl Transport for BrokenBodyTransport {
    async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse> {
        Err(Error::Read("connection reset by peer".to_string()))
    }
}

struct StoredDocument {
    generation: u64,
    revision: String,
    body: Map<String, Value>,
}

/// A small in-memory stand-in for a CouchDB node.
///
/// Generates 32-hex-digit ids and `N-<32 hex>` revisions and enforces
/// revision checks on writes.
#[derive(Default)]
pub struct MemoryCouch {
    databases: Mutex<BTreeMap<String, BTreeMap<String, StoredDocument>>>,
}

impl MemoryCouch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn handle(&self, request: &TransportRequest) -> Reply {
        let segments: Vec<String> = request
            .url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

        match (request.method.clone(), segments.as_slice()) {
            (Method::GET, []) => Reply::json(
                200,
                json!({
                    "couchdb": "Welcome",
                    "version": "3.3.3",
                    "git_sha": "40afbcfc7",
                    "uuid": "8f7a1f3a5b0c4b1c9a0d2e3f4a5b6c7d",
                    "features": ["access-ready", "partitioned", "reshard"],
                    "vendor": {"name": "The Apache Software Foundation"}
                }),
            ),
            (Method::GET, ["_all_dbs"]) => {
                let names: Vec<String> = self.databases.lock().unwrap().keys().cloned().collect();
                Reply::json(200, json!(names))
            }
            (method, [db]) => self.handle_database(method, db, request),
            (method, [db, id]) => self.handle_document(method, db, id, request),
            _ => not_found("missing"),
        }
    }

    fn handle_database(&self, method: Method, db: &str, request: &TransportRequest) -> Reply {
        let mut databases = self.databases.lock().unwrap();
        match method {
            Method::PUT => {
                if databases.contains_key(db) {
                    return Reply::json(
                        412,
                        json!({
                            "error": "file_exists",
                            "reason": "The database could not be created, the file already exists."
                        }),
                    );
                }
                databases.insert(db.to_string(), BTreeMap::new());
                Reply::json(201, json!({"ok": true}))
            }
            Method::DELETE => match databases.remove(db) {
                Some(_) => Reply::json(200, json!({"ok": true})),
                None => not_found("Database does not exist."),
            },
            Method::HEAD => match databases.contains_key(db) {
                true => Reply::new(200),
                false => Reply::new(404),
            },
            Method::GET => match databases.get(db) {
                Some(documents) => Reply::json(
                    200,
                    json!({
                        "db_name": db,
                        "purge_seq": "0-g1AAAA",
                        "update_seq": format!("{}-g1AAAA", documents.len()),
                        "doc_del_count": 0,
                        "doc_count": documents.len(),
                        "disk_format_version": 8,
                        "compact_running": false,
                        "cluster": {"n": 1, "q": 2, "r": 1, "w": 1},
                        "sizes": {"active": 0, "external": 0, "file": 0},
                        "instance_start_time": "0"
                    }),
                ),
                None => not_found("Database does not exist."),
            },
            Method::POST => {
                let Some(documents) = databases.get_mut(db) else {
                    return not_found("Database does not exist.");
                };
                let body = match parse_object(request) {
                    Ok(body) => body,
                    Err(reply) => return reply,
                };
                let id = body
                    .get("_id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(new_hex);
                if documents.contains_key(&id) {
                    return conflict();
                }
                let stored = store(documents, &id, 1, body);
                Reply::json(201, json!({"ok": true, "id": id, "rev": stored}))
            }
            _ => Reply::json(405, json!({"error": "method_not_allowed"})),
        }
    }

    fn handle_document(
        &self,
        method: Method,
        db: &str,
        id: &str,
        request: &TransportRequest,
    ) -> Reply {
        let mut databases = self.databases.lock().unwrap();
        let Some(documents) = databases.get_mut(db) else {
            return not_found("Database does not exist.");
        };

        match method {
            Method::GET | Method::HEAD => {
                let Some(stored) = documents.get(id) else {
                    return match method {
                        Method::HEAD => Reply::new(404),
                        _ => not_found("missing"),
                    };
                };
                let etag = format!("\"{}\"", stored.revision);
                if header(request, IF_NONE_MATCH.as_str()) == Some(stored.revision.as_str()) {
                    return Reply::new(304).header("etag", &etag);
                }

                let mut body = stored.body.clone();
                body.insert("_id".to_string(), json!(id));
                body.insert("_rev".to_string(), json!(stored.revision));
                let payload = serde_json::to_vec(&body).expect("json");

                match method {
                    Method::HEAD => Reply::new(200)
                        .header("etag", &etag)
                        .header("content-length", &payload.len().to_string()),
                    _ => Reply::new(200)
                        .body("application/json", payload)
                        .header("etag", &etag),
                }
            }
            Method::PUT => {
                let body = match parse_object(request) {
                    Ok(body) => body,
                    Err(reply) => return reply,
                };
                let given = header(request, IF_MATCH.as_str())
                    .map(str::to_string)
                    .or_else(|| body.get("_rev").and_then(Value::as_str).map(str::to_string));

                let generation = match (documents.get(id), given) {
                    (None, None) => 1,
                    (Some(current), Some(given)) if current.revision == given => {
                        current.generation + 1
                    }
                    _ => return conflict(),
                };
                let revision = store(documents, id, generation, body);
                Reply::json(201, json!({"ok": true, "id": id, "rev": revision}))
            }
            Method::DELETE => {
                let Some(current) = documents.get(id) else {
                    return not_found("missing");
                };
                if header(request, IF_MATCH.as_str()) != Some(current.revision.as_str()) {
                    return conflict();
                }
                let generation = current.generation + 1;
                documents.remove(id);
                Reply::json(
                    200,
                    json!({"ok": true, "id": id, "rev": format!("{generation}-{}", new_hex())}),
                )
            }
            _ => Reply::json(405, json!({"error": "method_not_allowed"})),
        }
    }
}

#[async_trait]
impl Transport for MemoryCouch {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        Ok(self.handle(&request).into_response())
    }
}

fn store(
    documents: &mut BTreeMap<String, StoredDocument>,
    id: &str,
    generation: u64,
    mut body: Map<String, Value>,
) -> String {
    body.remove("_id");
    body.remove("_rev");
    let revision = format!("{generation}-{}", new_hex());
    documents.insert(
        id.to_string(),
        StoredDocument {
            generation,
            revision: revision.clone(),
            body,
        },
    );
    revision
}

fn parse_object(request: &TransportRequest) -> std::result::Result<Map<String, Value>, Reply> {
    let bad_request = || {
        Reply::json(
            400,
            json!({"error": "bad_request", "reason": "invalid UTF-8 JSON"}),
        )
    };
    let payload = request.body.as_ref().ok_or_else(bad_request)?;
    match serde_json::from_slice(payload) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(bad_request()),
    }
}

fn header<'a>(request: &'a TransportRequest, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

fn not_found(reason: &str) -> Reply {
    Reply::json(404, json!({"error": "not_found", "reason": reason}))
}

fn conflict() -> Reply {
    Reply::json(
        409,
        json!({"error": "conflict", "reason": "Document update conflict."}),
    )
}

fn new_hex() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

