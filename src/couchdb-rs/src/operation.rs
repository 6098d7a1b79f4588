//! Operations are plain values describing one request and how to read its
//! response. They are executed by [`Client::execute`].

use bytes::Bytes;
use couchdb_core::Body;
use reqwest::header::{HeaderMap, ETAG};
use reqwest::StatusCode;

use crate::client::Client;
use crate::context::Context;
use crate::request::RequestSpec;
use crate::{Error, Result};

/// A response after status evaluation.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Decoded payload; `None` for empty payloads and raw-mode requests.
    pub body: Option<Body>,
    pub raw: Bytes,
}

impl Response {
    pub fn header_str(&self, name: reqwest::header::HeaderName) -> Result<Option<&str>> {
        match self.headers.get(&name) {
            Some(value) => value
                .to_str()
                .map(Some)
                .map_err(|_| Error::Decode(format!("header [{name}] is not valid text"))),
            None => Ok(None),
        }
    }

    /// The `ETag` header with its quotes removed.
    pub fn etag(&self) -> Result<Option<&str>> {
        Ok(self.header_str(ETAG)?.map(couchdb_core::trim_etag))
    }

    /// The decoded body, failing on empty payloads.
    pub fn require_body(self) -> Result<Body> {
        self.body
            .ok_or_else(|| Error::Decode("empty response body".to_string()))
    }
}

/// One CouchDB request/response exchange.
pub trait Operation: Send + Sync {
    type Output: Send;

    /// Describe the request. Invalid inputs are recorded on the spec.
    fn request(&self) -> RequestSpec;

    /// Status codes this operation is prepared to interpret.
    fn expected(&self) -> &'static [StatusCode];

    fn output(&self, response: Response) -> Result<Self::Output>;
}

/// An operation bound to the client that will execute it.
#[must_use = "a call does nothing until `send` is awaited"]
#[derive(Debug, Clone)]
pub struct Call<'c, O> {
    client: &'c Client,
    operation: O,
}

impl<'c, O> Call<'c, O>
where
    O: Operation,
{
    pub(crate) fn new(client: &'c Client, operation: O) -> Self {
        Self { client, operation }
    }

    pub fn operation(&self) -> &O {
        &self.operation
    }

    pub fn into_operation(self) -> O {
        self.operation
    }

    pub(crate) fn map(self, f: impl FnOnce(O) -> O) -> Self {
        Self {
            client: self.client,
            operation: f(self.operation),
        }
    }

    pub async fn send(self, ctx: &Context) -> Result<O::Output> {
        self.client.execute(&self.operation, ctx).await
    }
}
