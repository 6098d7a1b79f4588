use std::fmt;
use std::sync::Arc;

use couchdb_core::body::MIME_TYPE_JSON;
use couchdb_core::{
    check_allowed, evaluate_response, evaluate_status, ClientConfig, Credentials, InstanceInfo,
    Status,
};
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};

use crate::context::Context;
use crate::database::DatabaseRef;
use crate::operation::{Call, Operation, Response};
use crate::request::{basic_auth, build_url, parse_base_url, BodyMode, RequestSpec};
use crate::transport::{ReqwestTransport, Transport, TransportRequest};
use crate::{Error, Result};

/// CouchDB REST API Client
///
/// Holds only immutable configuration; clones share the transport.
#[derive(Clone)]
pub struct Client {
    base_url: Url,
    authorization: Option<HeaderValue>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.authorization.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    base_url: String,
    credentials: Option<Credentials>,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    /// Set Basic-Auth credentials. Ignored unless both parts are non-empty.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Credentials::new(username, password);
        self
    }

    /// Replace the default `reqwest` transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = parse_base_url(&self.base_url)?;
        let authorization = self.credentials.as_ref().map(basic_auth).transpose()?;
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()));

        Ok(Client {
            base_url,
            authorization,
            transport,
        })
    }
}

impl Client {
    /// Create a new unauthenticated client connected to the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::builder(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            credentials: None,
            transport: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::builder(config.base_url.clone())
            .credentials(config.username.clone(), config.password.clone())
            .build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Reference to a database; no request is made.
    pub fn database(&self, name: impl Into<String>) -> DatabaseRef<'_> {
        DatabaseRef::new(self, name.into())
    }

    /// Fetch some basic infos from the couchdb instance
    pub fn instance_info(&self) -> Call<'_, InstanceInfoRequest> {
        Call::new(self, InstanceInfoRequest)
    }

    /// Fetch a list of all databases
    pub fn all_databases(&self) -> Call<'_, AllDatabasesRequest> {
        Call::new(self, AllDatabasesRequest)
    }

    /// Execute an operation: send its request, decode and evaluate the
    /// response, then convert it into the operation's output.
    ///
    /// Failures are annotated with the request method and URL.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(method = tracing::field::Empty, url = tracing::field::Empty)
    )]
    pub async fn execute<O>(&self, operation: &O, ctx: &Context) -> Result<O::Output>
    where
        O: Operation,
    {
        let mut spec = operation.request();
        let method = spec.method.clone();
        let url = build_url(&self.base_url, &spec.segments, &spec.query);
        let target = match &url {
            Ok(url) => url.to_string(),
            Err(_) => spec.path(),
        };

        let span = tracing::Span::current();
        span.record("method", tracing::field::display(&method));
        span.record("url", tracing::field::display(&target));

        let result = match (spec.take_error(), url) {
            (Some(e), _) | (None, Err(e)) => Err(e),
            (None, Ok(url)) => self.send(operation, spec, url, ctx).await,
        };
        result.map_err(|e| e.annotate(&method, target))
    }

    async fn send<O>(
        &self,
        operation: &O,
        spec: RequestSpec,
        url: Url,
        ctx: &Context,
    ) -> Result<O::Output>
    where
        O: Operation,
    {
        let RequestSpec {
            method,
            mut headers,
            body,
            body_mode,
            ..
        } = spec;

        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(MIME_TYPE_JSON));
        }
        if let Some(authorization) = &self.authorization {
            headers.insert(AUTHORIZATION, authorization.clone());
        }

        tracing::debug!("sending request");
        let response = ctx
            .run(self.transport.execute(TransportRequest {
                method,
                url,
                headers,
                body,
            }))
            .await?;
        tracing::debug!(
            status = response.status.as_u16(),
            len = response.body.len(),
            "received response"
        );

        let expected = operation.expected();
        let body = match body_mode {
            BodyMode::Envelope => {
                let payload = response.body.clone();
                evaluate_response(response.status, &response.headers, payload, expected).await?
            }
            BodyMode::Raw => {
                evaluate_raw(response.status, &response.body, expected)?;
                None
            }
        };

        operation.output(Response {
            status: response.status,
            headers: response.headers,
            body,
            raw: response.body,
        })
    }
}

/// Evaluate a response whose payload is not decoded as an envelope. Error
/// payloads are still read as a CouchDB status object for their reason.
fn evaluate_raw(status: StatusCode, payload: &[u8], expected: &[StatusCode]) -> Result<()> {
    check_allowed(status, expected)?;
    if !status.is_client_error() {
        return evaluate_status(status, None, None, expected);
    }

    let detail: Status = serde_json::from_slice(payload).unwrap_or_default();
    let reason = if detail.reason.is_empty() {
        detail.error.as_str()
    } else {
        detail.reason.as_str()
    };
    evaluate_status(status, Some(reason), None, expected)
}

/// `GET /`
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceInfoRequest;

impl Operation for InstanceInfoRequest {
    type Output = InstanceInfo;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::GET, Vec::<String>::new())
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[StatusCode::OK, StatusCode::UNAUTHORIZED]
    }

    fn output(&self, response: Response) -> Result<InstanceInfo> {
        response.require_body()?.deserialize()
    }
}

/// `GET /_all_dbs`
#[derive(Debug, Clone, Copy, Default)]
pub struct AllDatabasesRequest;

impl Operation for AllDatabasesRequest {
    type Output = Vec<String>;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::GET, ["_all_dbs"]).raw()
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[StatusCode::OK, StatusCode::UNAUTHORIZED]
    }

    fn output(&self, response: Response) -> Result<Vec<String>> {
        serde_json::from_slice(&response.raw)
            .map_err(|e| Error::Decode(format!("json decode: {e}")))
    }
}
