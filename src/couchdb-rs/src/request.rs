//! Request description and URL/authentication helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use couchdb_core::body::MIME_TYPE_JSON;
use couchdb_core::Credentials;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, IF_MATCH, IF_NONE_MATCH};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::{Error, Result};

/// How the client treats a response payload before handing it to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyMode {
    /// Decode into a [`couchdb_core::Body`] by content type.
    #[default]
    Envelope,
    /// Leave the payload untouched; error bodies are still read for a reason.
    Raw,
}

/// Everything needed to address and send one request.
///
/// Builder methods never fail; the first invalid input is kept and
/// surfaces from [`RequestSpec::error`] so the client can report it
/// against the request it belongs to.
#[derive(Debug)]
pub struct RequestSpec {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub body_mode: BodyMode,
    error: Option<Error>,
}

impl RequestSpec {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            body_mode: BodyMode::Envelope,
            error: None,
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: &str) -> Self {
        match HeaderValue::from_str(value) {
            Ok(value) => {
                self.headers.insert(name, value);
                self
            }
            Err(_) => self.fail(Error::InvalidArgument(format!(
                "invalid value for header [{name}]: [{}]",
                value.escape_debug()
            ))),
        }
    }

    /// Set `If-Match`, skipping empty revisions.
    pub fn if_match(self, revision: &str) -> Self {
        if revision.is_empty() {
            return self;
        }
        self.header(IF_MATCH, revision)
    }

    /// Set `If-None-Match`, skipping absent or empty revisions.
    pub fn if_none_match(self, revision: Option<&str>) -> Self {
        match revision {
            Some(revision) if !revision.is_empty() => self.header(IF_NONE_MATCH, revision),
            _ => self,
        }
    }

    pub fn json_body<T>(self, value: &T) -> Self
    where
        T: Serialize + ?Sized,
    {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body(MIME_TYPE_JSON, Bytes::from(bytes)),
            Err(e) => self.fail(Error::Encode(e)),
        }
    }

    pub fn body(mut self, content_type: &str, body: Bytes) -> Self {
        self = self.header(CONTENT_TYPE, content_type);
        self.body = Some(body);
        self
    }

    pub fn raw(mut self) -> Self {
        self.body_mode = BodyMode::Raw;
        self
    }

    /// The first invalid input given to the builder, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub(crate) fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// Path relative to the server, used when no full URL can be built.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    fn fail(mut self, error: Error) -> Self {
        self.error.get_or_insert(error);
        self
    }
}

/// Parse a base URL, rejecting ones that cannot carry path segments.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::InvalidConfig(format!("parse base url [{base_url}]: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidConfig(format!(
            "base url [{base_url}] cannot carry a path"
        )));
    }
    Ok(url)
}

/// Join `base` with escaped path segments and query pairs.
///
/// One trailing slash on the base is dropped before joining.
pub fn build_url(base: &Url, segments: &[String], query: &[(String, String)]) -> Result<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("base url [{base}] cannot carry a path")))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// `Authorization` header value for HTTP Basic authentication.
pub fn basic_auth(credentials: &Credentials) -> Result<HeaderValue> {
    let token = STANDARD.encode(format!("{}:{}", credentials.username, credentials.password));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))
        .map_err(|e| Error::InvalidConfig(format!("authorization header: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
