use std::collections::BTreeMap;

use couchdb_core::body::{MIME_TYPE_JSON, MIME_TYPE_MULTIPART_RELATED, PRIMARY_PART_NAME};
use couchdb_core::{Body, Conditional, Document, DocumentMeta, DocumentWriteResponse, FetchedDocument};
use reqwest::header::{ACCEPT, CONTENT_LENGTH};
use reqwest::{Method, StatusCode};

use crate::attachment::AttachmentRef;
use crate::database::DatabaseRef;
use crate::operation::{Call, Operation, Response};
use crate::request::RequestSpec;
use crate::{Error, Result};

/// DocumentRef holds the reference to a document.
#[derive(Debug, Clone)]
pub struct DocumentRef<'c> {
    database: DatabaseRef<'c>,
    id: String,
}

impl<'c> DocumentRef<'c> {
    pub(crate) fn new(database: DatabaseRef<'c>, id: String) -> Self {
        Self { database, id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn database(&self) -> &DatabaseRef<'c> {
        &self.database
    }

    /// Fetch the latest revision of the document.
    pub fn fetch(&self) -> Call<'c, DocumentFetchRequest> {
        Call::new(
            self.database.client(),
            DocumentFetchRequest {
                database: self.database.name().to_string(),
                id: self.id.clone(),
                revision: None,
                attachments: false,
            },
        )
    }

    /// Fetch the revision and size of the document without its body.
    pub fn fetch_meta(&self) -> Call<'c, DocumentFetchMetaRequest> {
        Call::new(
            self.database.client(),
            DocumentFetchMetaRequest {
                database: self.database.name().to_string(),
                id: self.id.clone(),
                revision: None,
            },
        )
    }

    /// Create the document under this id.
    pub fn create(&self, document: Document) -> Call<'c, DocumentUpdateRequest> {
        self.put(String::new(), document)
    }

    /// Replace the document at `revision`. A stale revision fails with `AlreadyExists`.
    pub fn update(
        &self,
        revision: impl Into<String>,
        document: Document,
    ) -> Call<'c, DocumentUpdateRequest> {
        self.put(revision.into(), document)
    }

    pub fn delete(&self, revision: impl Into<String>) -> Call<'c, DocumentDeleteRequest> {
        Call::new(
            self.database.client(),
            DocumentDeleteRequest {
                database: self.database.name().to_string(),
                id: self.id.clone(),
                revision: revision.into(),
            },
        )
    }

    /// Reference to an attachment of this document; no request is made.
    pub fn attachment(&self, name: impl Into<String>) -> AttachmentRef<'c> {
        AttachmentRef::new(self.clone(), name.into())
    }

    fn put(&self, revision: String, document: Document) -> Call<'c, DocumentUpdateRequest> {
        Call::new(
            self.database.client(),
            DocumentUpdateRequest {
                database: self.database.name().to_string(),
                id: self.id.clone(),
                revision,
                document,
            },
        )
    }
}

impl Call<'_, DocumentFetchRequest> {
    /// Answer with `NotModified` if the document is still at `revision`.
    pub fn revision(self, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        self.map(|op| DocumentFetchRequest {
            revision: Some(revision),
            ..op
        })
    }

    /// Request attachment bodies inline as `multipart/related`.
    pub fn attachments(self, attachments: bool) -> Self {
        self.map(|op| DocumentFetchRequest { attachments, ..op })
    }
}

impl Call<'_, DocumentFetchMetaRequest> {
    pub fn revision(self, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        self.map(|op| DocumentFetchMetaRequest {
            revision: Some(revision),
            ..op
        })
    }
}

/// `GET /{db}/{id}`
#[derive(Debug, Clone)]
pub struct DocumentFetchRequest {
    pub database: String,
    pub id: String,
    pub revision: Option<String>,
    pub attachments: bool,
}

impl Operation for DocumentFetchRequest {
    type Output = Conditional<FetchedDocument>;

    fn request(&self) -> RequestSpec {
        let spec = RequestSpec::new(Method::GET, [self.database.as_str(), self.id.as_str()])
            .if_none_match(self.revision.as_deref());
        if !self.attachments {
            return spec;
        }
        spec.query("attachments", "true").header(
            ACCEPT,
            &format!("{MIME_TYPE_MULTIPART_RELATED}, {MIME_TYPE_JSON}"),
        )
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::OK,
            StatusCode::NOT_MODIFIED,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ]
    }

    fn output(&self, response: Response) -> Result<Conditional<FetchedDocument>> {
        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(Conditional::NotModified);
        }

        let fetched = match response.require_body()? {
            Body::Json(map) => FetchedDocument {
                document: Document::from(map),
                attachments: BTreeMap::new(),
            },
            Body::Multipart(mut parts) => {
                let document = match parts.remove(PRIMARY_PART_NAME) {
                    Some(Body::Json(map)) => Document::from(map),
                    Some(other) => {
                        return Err(Error::Decode(format!(
                            "document part is {}, expected json",
                            other.variant_name()
                        )))
                    }
                    None => return Err(Error::Decode("missing document part".to_string())),
                };
                FetchedDocument {
                    document,
                    attachments: parts,
                }
            }
            other => {
                return Err(Error::Decode(format!(
                    "unexpected {} body for document [{}]",
                    other.variant_name(),
                    self.id
                )))
            }
        };
        Ok(Conditional::Modified(fetched))
    }
}

/// `HEAD /{db}/{id}`
#[derive(Debug, Clone)]
pub struct DocumentFetchMetaRequest {
    pub database: String,
    pub id: String,
    pub revision: Option<String>,
}

impl Operation for DocumentFetchMetaRequest {
    type Output = Conditional<DocumentMeta>;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::HEAD, [self.database.as_str(), self.id.as_str()])
            .if_none_match(self.revision.as_deref())
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::OK,
            StatusCode::NOT_MODIFIED,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ]
    }

    fn output(&self, response: Response) -> Result<Conditional<DocumentMeta>> {
        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(Conditional::NotModified);
        }

        let revision = response
            .etag()?
            .ok_or_else(|| Error::Decode("missing ETag header".to_string()))?
            .to_string();
        let content_length = response.header_str(CONTENT_LENGTH)?.unwrap_or_default();
        let content_length = content_length
            .parse::<u64>()
            .map_err(|e| Error::Decode(format!("parse content length [{content_length}]: {e}")))?;

        Ok(Conditional::Modified(DocumentMeta {
            revision,
            content_length,
        }))
    }
}

/// `PUT /{db}/{id}`, with `If-Match` when a revision is given.
#[derive(Debug, Clone)]
pub struct DocumentUpdateRequest {
    pub database: String,
    pub id: String,
    pub revision: String,
    pub document: Document,
}

impl Operation for DocumentUpdateRequest {
    type Output = DocumentWriteResponse;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::PUT, [self.database.as_str(), self.id.as_str()])
            .if_match(&self.revision)
            .json_body(&self.document)
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::CREATED,
            StatusCode::ACCEPTED,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
        ]
    }

    fn output(&self, response: Response) -> Result<DocumentWriteResponse> {
        response.require_body()?.deserialize()
    }
}

/// `DELETE /{db}/{id}` with `If-Match`
#[derive(Debug, Clone)]
pub struct DocumentDeleteRequest {
    pub database: String,
    pub id: String,
    pub revision: String,
}

impl Operation for DocumentDeleteRequest {
    type Output = DocumentWriteResponse;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::DELETE, [self.database.as_str(), self.id.as_str()])
            .if_match(&self.revision)
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::OK,
            StatusCode::ACCEPTED,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
        ]
    }

    fn output(&self, response: Response) -> Result<DocumentWriteResponse> {
        response.require_body()?.deserialize()
    }
}
