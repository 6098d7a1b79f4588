use bytes::Bytes;
use couchdb_core::body::MIME_TYPE_OCTET_STREAM;
use couchdb_core::{Attachment, Conditional, DocumentWriteResponse};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode};

use crate::document::DocumentRef;
use crate::operation::{Call, Operation, Response};
use crate::request::RequestSpec;
use crate::Result;

/// AttachmentRef holds the reference to a named attachment of a document.
#[derive(Debug, Clone)]
pub struct AttachmentRef<'c> {
    document: DocumentRef<'c>,
    name: String,
}

impl<'c> AttachmentRef<'c> {
    pub(crate) fn new(document: DocumentRef<'c>, name: String) -> Self {
        Self { document, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &DocumentRef<'c> {
        &self.document
    }

    /// Upload `data` as the attachment, creating a new document revision.
    ///
    /// An empty `revision` is only accepted by the server when the
    /// document does not exist yet.
    pub fn store(
        &self,
        revision: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> Call<'c, AttachmentStoreRequest> {
        Call::new(
            self.document.database().client(),
            AttachmentStoreRequest {
                database: self.document.database().name().to_string(),
                document: self.document.id().to_string(),
                name: self.name.clone(),
                revision: revision.into(),
                content_type: content_type.into(),
                data,
            },
        )
    }

    pub fn fetch(&self) -> Call<'c, AttachmentFetchRequest> {
        Call::new(
            self.document.database().client(),
            AttachmentFetchRequest {
                database: self.document.database().name().to_string(),
                document: self.document.id().to_string(),
                name: self.name.clone(),
                digest: None,
            },
        )
    }

    pub fn delete(&self, revision: impl Into<String>) -> Call<'c, AttachmentDeleteRequest> {
        Call::new(
            self.document.database().client(),
            AttachmentDeleteRequest {
                database: self.document.database().name().to_string(),
                document: self.document.id().to_string(),
                name: self.name.clone(),
                revision: revision.into(),
            },
        )
    }
}

fn segments<'a>(database: &'a str, document: &'a str, name: &'a str) -> [&'a str; 3] {
    [database, document, name]
}

impl Call<'_, AttachmentFetchRequest> {
    /// Answer with `NotModified` if the attachment still has `digest`.
    pub fn digest(self, digest: impl Into<String>) -> Self {
        let digest = digest.into();
        self.map(|op| AttachmentFetchRequest {
            digest: Some(digest),
            ..op
        })
    }
}

/// `PUT /{db}/{doc}/{attachment}`
#[derive(Debug, Clone)]
pub struct AttachmentStoreRequest {
    pub database: String,
    pub document: String,
    pub name: String,
    pub revision: String,
    pub content_type: String,
    pub data: Bytes,
}

impl Operation for AttachmentStoreRequest {
    type Output = DocumentWriteResponse;

    fn request(&self) -> RequestSpec {
        let content_type = if self.content_type.is_empty() {
            MIME_TYPE_OCTET_STREAM
        } else {
            self.content_type.as_str()
        };
        RequestSpec::new(
            Method::PUT,
            segments(&self.database, &self.document, &self.name),
        )
        .if_match(&self.revision)
        .body(content_type, self.data.clone())
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

/// `GET /{db}/{doc}/{attachment}`
///
/// The payload is returned as-is whatever its content type.
#[derive(Debug, Clone)]
pub struct AttachmentFetchRequest {
    pub database: String,
    pub document: String,
    pub name: String,
    pub digest: Option<String>,
}

impl Operation for AttachmentFetchRequest {
    type Output = Conditional<Attachment>;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(
            Method::GET,
            segments(&self.database, &self.document, &self.name),
        )
        .header(ACCEPT, "*/*")
        .if_none_match(self.digest.as_deref())
        .raw()
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::OK,
            StatusCode::NOT_MODIFIED,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ]
    }

    fn output(&self, response: Response) -> Result<Conditional<Attachment>> {
        if response.status == StatusCode::NOT_MODIFIED {
            return Ok(Conditional::NotModified);
        }

        let content_type = response
            .header_str(CONTENT_TYPE)?
            .unwrap_or(MIME_TYPE_OCTET_STREAM)
            .to_string();
        let digest = response.etag()?.map(str::to_string);

        Ok(Conditional::Modified(Attachment {
            content_type,
            digest,
            data: response.raw,
        }))
    }
}

/// `DELETE /{db}/{doc}/{attachment}` with `If-Match`
#[derive(Debug, Clone)]
pub struct AttachmentDeleteRequest {
    pub database: String,
    pub document: String,
    pub name: String,
    pub revision: String,
}

impl Operation for AttachmentDeleteRequest {
    type Output = DocumentWriteResponse;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(
            Method::DELETE,
            segments(&self.database, &self.document, &self.name),
        )
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
