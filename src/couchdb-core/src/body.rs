//! Response body envelope and content-type driven decoding.
//!
//! CouchDB answers with one of a handful of media types. The decoder turns
//! the buffered payload into a [`Body`]; `multipart/related` payloads are
//! decoded part by part, each part against its own headers.

use std::collections::BTreeMap;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use mime::Mime;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// Some MIME types.
pub const MIME_TYPE_TEXT_PLAIN: &str = "text/plain";
pub const MIME_TYPE_JSON: &str = "application/json";
pub const MIME_TYPE_MULTIPART_RELATED: &str = "multipart/related";
pub const MIME_TYPE_OCTET_STREAM: &str = "application/octet-stream";

/// Name given to a multipart part that carries no filename.
pub const PRIMARY_PART_NAME: &str = "document";

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// `application/json`; always a top-level object.
    Json(Map<String, Value>),
    /// `application/octet-stream`
    Bytes(Bytes),
    /// `text/plain`
    Text(String),
    /// `multipart/related`, keyed by part filename (or [`PRIMARY_PART_NAME`]).
    Multipart(BTreeMap<String, Body>),
}

impl Body {
    pub fn as_json(&self) -> Option<&Map<String, Value>> {
        match self {
            Body::Json(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Map<String, Value>> {
        match self {
            Body::Json(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Body::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_multipart(&self) -> Option<&BTreeMap<String, Body>> {
        match self {
            Body::Multipart(parts) => Some(parts),
            _ => None,
        }
    }

    /// String field of a JSON body, if the body is JSON and the field is a string.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.as_json()?.get(key)?.as_str()
    }

    /// Deserialize a JSON body into a typed value.
    pub fn deserialize<T>(self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match self {
            Body::Json(map) => serde_json::from_value(Value::Object(map))
                .map_err(|e| Error::Decode(format!("json decode: {e}"))),
            other => Err(Error::Decode(format!(
                "expected a json body, got {}",
                other.variant_name()
            ))),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Body::Json(_) => "json",
            Body::Bytes(_) => "bytes",
            Body::Text(_) => "text",
            Body::Multipart(_) => "multipart",
        }
    }
}

impl From<Map<String, Value>> for Body {
    fn from(map: Map<String, Value>) -> Self {
        Body::Json(map)
    }
}

/// Decode `body` according to the `Content-Type` found in `headers`.
pub fn decode_body(headers: &HeaderMap, body: Bytes) -> BoxFuture<'_, Result<Body>> {
    async move {
        let content_type = match headers.get(CONTENT_TYPE) {
            Some(value) => value.to_str().map_err(|_| {
                Error::Decode(format!("parse media type [{}]", String::from_utf8_lossy(value.as_bytes())))
            })?,
            None => "",
        };
        let media_type: Mime = content_type
            .parse()
            .map_err(|e| Error::Decode(format!("parse media type [{content_type}]: {e}")))?;

        let essence = media_type.essence_str().to_ascii_lowercase();
        tracing::debug!(media_type = %essence, len = body.len(), "decoding body");

        match essence.as_str() {
            MIME_TYPE_JSON => decode_json(&body).map(Body::Json),
            MIME_TYPE_MULTIPART_RELATED => {
                let boundary = media_type
                    .get_param(mime::BOUNDARY)
                    .map(|b| b.as_str().to_string())
                    .ok_or_else(|| {
                        Error::Decode(format!("missing boundary in [{content_type}]"))
                    })?;
                decode_multipart(body, boundary).await.map(Body::Multipart)
            }
            MIME_TYPE_OCTET_STREAM => Ok(Body::Bytes(body)),
            MIME_TYPE_TEXT_PLAIN => String::from_utf8(body.to_vec())
                .map(Body::Text)
                .map_err(|e| Error::Decode(format!("text body: {e}"))),
            other => Err(Error::NotImplemented(format!(
                "could not handle response body type [{other}]"
            ))),
        }
    }
    .boxed()
}

fn decode_json(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::Decode(format!(
            "json decode: expected an object, got {}",
            json_type_name(&other)
        ))),
        Err(e) => Err(Error::Decode(format!("json decode: {e}"))),
    }
}

async fn decode_multipart(body: Bytes, boundary: String) -> Result<BTreeMap<String, Body>> {
    let mut parts = BTreeMap::new();
    if body.is_empty() {
        return Ok(parts);
    }

    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(body) });
    let mut reader = multer::Multipart::new(stream, boundary);

    while let Some(field) = reader
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "multipart"))?
    {
        let name = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(PRIMARY_PART_NAME)
            .to_string();
        let headers = field.headers().clone();
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, &format!("multipart [{name}]")))?;

        let value = decode_body(&headers, data)
            .await
            .map_err(|e| part_error(e, &name))?;
        // A later part with the same name replaces the earlier one.
        parts.insert(name, value);
    }

    Ok(parts)
}

fn multipart_error(err: multer::Error, context: &str) -> Error {
    match err {
        multer::Error::StreamReadFailed(cause) => Error::Read(format!("{context}: {cause}")),
        other => Error::Decode(format!("{context}: {other}")),
    }
}

/// Prefix a part's decode failure with the part name, keeping its kind.
fn part_error(err: Error, name: &str) -> Error {
    match err {
        Error::Decode(m) => Error::Decode(format!("multipart [{name}]: {m}")),
        Error::NotImplemented(m) => Error::NotImplemented(format!("multipart [{name}]: {m}")),
        Error::Read(m) => Error::Read(format!("multipart [{name}]: {m}")),
        other => other,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
