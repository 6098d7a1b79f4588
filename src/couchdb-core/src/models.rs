use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::body::Body;
use crate::error::{Error, Result};

/// Document is a JSON object stored in a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document's `_id`, if set.
    pub fn id(&self) -> Option<&str> {
        self.0.get("_id").and_then(Value::as_str)
    }

    /// The document's `_rev`, if set.
    pub fn revision(&self) -> Option<&str> {
        self.0.get("_rev").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::InvalidArgument(
                "Document must be a JSON object".to_string(),
            )),
        }
    }
}

/// Outcome of a conditional (`If-None-Match`) request.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditional<T> {
    Modified(T),
    /// The server answered 304; the caller's copy is current.
    NotModified,
}

impl<T> Conditional<T> {
    pub fn modified(self) -> Option<T> {
        match self {
            Conditional::Modified(value) => Some(value),
            Conditional::NotModified => None,
        }
    }

    pub fn is_not_modified(&self) -> bool {
        matches!(self, Conditional::NotModified)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Conditional<U> {
        match self {
            Conditional::Modified(value) => Conditional::Modified(f(value)),
            Conditional::NotModified => Conditional::NotModified,
        }
    }
}

/// Status holds all infos of a status response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

/// Response to document and attachment writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWriteResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub id: String,
    #[serde(rename = "rev", default)]
    pub revision: String,
}

/// Revision and size of a document as reported by a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub revision: String,
    pub content_length: u64,
}

/// A fetched document together with any attachments sent inline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedDocument {
    pub document: Document,
    /// Attachment bodies keyed by filename; empty unless requested.
    pub attachments: BTreeMap<String, Body>,
}

/// A fetched attachment, kept as the raw bytes the server sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    /// Content digest from the `ETag` header, e.g. `md5-...`.
    pub digest: Option<String>,
    pub data: Bytes,
}

/// InstanceInfo holds information about the couchdb instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(default)]
    pub couchdb: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub git_sha: String,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub vendor: Vendor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// DatabaseInfo holds infos about the database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    #[serde(rename = "db_name")]
    pub name: String,
    #[serde(rename = "purge_seq", default)]
    pub purge_sequence: Value,
    #[serde(rename = "update_seq", default)]
    pub update_sequence: Value,
    #[serde(rename = "doc_del_count", default)]
    pub document_deletion_count: u64,
    #[serde(rename = "doc_count", default)]
    pub document_count: u64,
    #[serde(default)]
    pub disk_format_version: u64,
    #[serde(default)]
    pub compact_running: bool,
    #[serde(default)]
    pub cluster: Cluster,
    #[serde(default)]
    pub sizes: Sizes,
}

/// Cluster holds infos about the cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub n: u32,
    #[serde(default)]
    pub q: u32,
    #[serde(default)]
    pub r: u32,
    #[serde(default)]
    pub w: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sizes {
    #[serde(default)]
    pub active: u64,
    #[serde(default)]
    pub external: u64,
    #[serde(default)]
    pub file: u64,
}

/// Strip the quotes CouchDB puts around revisions in `ETag` headers.
pub fn trim_etag(value: &str) -> &str {
    value.trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_accessors() {
        let doc = Document::try_from(json!({"_id": "abc", "_rev": "1-xyz", "test": "value"}))
            .unwrap();
        assert_eq!(doc.id(), Some("abc"));
        assert_eq!(doc.revision(), Some("1-xyz"));
        assert_eq!(doc.get("test"), Some(&json!("value")));

        assert!(Document::new().id().is_none());
        assert!(Document::try_from(json!(["not", "an", "object"])).is_err());
    }

    #[test]
    fn test_document_serializes_as_plain_object() {
        let mut doc = Document::new();
        doc.insert("test", "value");
        assert_eq!(serde_json::to_string(&doc).unwrap(), r#"{"test":"value"}"#);
    }

    #[test]
    fn test_database_info_from_couchdb_payload() {
        let info: DatabaseInfo = serde_json::from_value(json!({
            "db_name": "test",
            "purge_seq": "0-g1AAAA",
            "update_seq": "3-g1AAAA",
            "doc_del_count": 1,
            "doc_count": 2,
            "disk_format_version": 8,
            "compact_running": false,
            "cluster": {"n": 1, "q": 2, "r": 1, "w": 1},
            "sizes": {"active": 10, "external": 20, "file": 30},
            "instance_start_time": "0"
        }))
        .unwrap();

        assert_eq!(info.name, "test");
        assert_eq!(info.document_count, 2);
        assert_eq!(info.document_deletion_count, 1);
        assert_eq!(info.cluster.q, 2);
        assert_eq!(info.sizes.file, 30);
    }

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag("\"3-deadbeef\""), "3-deadbeef");
        assert_eq!(trim_etag("3-deadbeef"), "3-deadbeef");
    }

    #[test]
    fn test_conditional_helpers() {
        let fetched = Conditional::Modified(2).map(|v| v * 2);
        assert_eq!(fetched.clone().modified(), Some(4));
        assert!(!fetched.is_not_modified());
        assert!(Conditional::<u8>::NotModified.is_not_modified());
    }
}
