use couchdb_core::{DatabaseInfo, Document, DocumentWriteResponse, Status};
use reqwest::{Method, StatusCode};

use crate::client::Client;
use crate::context::Context;
use crate::document::DocumentRef;
use crate::operation::{Call, Operation, Response};
use crate::request::RequestSpec;
use crate::Result;

/// DatabaseRef holds the reference to a database.
#[derive(Debug, Clone)]
pub struct DatabaseRef<'c> {
    client: &'c Client,
    name: String,
}

impl<'c> DatabaseRef<'c> {
    pub(crate) fn new(client: &'c Client, name: String) -> Self {
        Self { client, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &'c Client {
        self.client
    }

    /// Create the database. Fails with `AlreadyExists` if it exists.
    pub fn create(&self) -> Call<'c, DatabaseCreateRequest> {
        Call::new(
            self.client,
            DatabaseCreateRequest {
                database: self.name.clone(),
            },
        )
    }

    /// Delete the database and all of its documents.
    pub fn delete(&self) -> Call<'c, DatabaseDeleteRequest> {
        Call::new(
            self.client,
            DatabaseDeleteRequest {
                database: self.name.clone(),
            },
        )
    }

    pub fn info(&self) -> Call<'c, DatabaseInfoRequest> {
        Call::new(
            self.client,
            DatabaseInfoRequest {
                database: self.name.clone(),
            },
        )
    }

    /// Check for the database with a HEAD request.
    pub async fn exists(&self, ctx: &Context) -> Result<bool> {
        let request = DatabaseHeadRequest {
            database: self.name.clone(),
        };
        match self.client.execute(&request, ctx).await {
            Ok(()) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a document with a server-assigned id.
    pub fn create_document(&self, document: Document) -> Call<'c, DocumentCreateRequest> {
        Call::new(
            self.client,
            DocumentCreateRequest {
                database: self.name.clone(),
                document,
            },
        )
    }

    /// Reference to a document in the database; no request is made.
    pub fn document(&self, id: impl Into<String>) -> DocumentRef<'c> {
        DocumentRef::new(self.clone(), id.into())
    }
}

/// `PUT /{db}`
#[derive(Debug, Clone)]
pub struct DatabaseCreateRequest {
    pub database: String,
}

impl Operation for DatabaseCreateRequest {
    type Output = Status;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::PUT, [self.database.as_str()])
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::CREATED,
            StatusCode::ACCEPTED,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::CONFLICT,
            StatusCode::PRECONDITION_FAILED,
        ]
    }

    fn output(&self, response: Response) -> Result<Status> {
        response.require_body()?.deserialize()
    }
}

/// `DELETE /{db}`
#[derive(Debug, Clone)]
pub struct DatabaseDeleteRequest {
    pub database: String,
}

impl Operation for DatabaseDeleteRequest {
    type Output = Status;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::DELETE, [self.database.as_str()])
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[
            StatusCode::OK,
            StatusCode::ACCEPTED,
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ]
    }

    fn output(&self, response: Response) -> Result<Status> {
        response.require_body()?.deserialize()
    }
}

/// `GET /{db}`
#[derive(Debug, Clone)]
pub struct DatabaseInfoRequest {
    pub database: String,
}

impl Operation for DatabaseInfoRequest {
    type Output = DatabaseInfo;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::GET, [self.database.as_str()])
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[StatusCode::OK, StatusCode::UNAUTHORIZED, StatusCode::NOT_FOUND]
    }

    fn output(&self, response: Response) -> Result<DatabaseInfo> {
        response.require_body()?.deserialize()
    }
}

/// `HEAD /{db}`
#[derive(Debug, Clone)]
pub struct DatabaseHeadRequest {
    pub database: String,
}

impl Operation for DatabaseHeadRequest {
    type Output = ();

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::HEAD, [self.database.as_str()])
    }

    fn expected(&self) -> &'static [StatusCode] {
        &[StatusCode::OK, StatusCode::UNAUTHORIZED, StatusCode::NOT_FOUND]
    }

    fn output(&self, _response: Response) -> Result<()> {
        Ok(())
    }
}

/// `POST /{db}`
#[derive(Debug, Clone)]
pub struct DocumentCreateRequest {
    pub database: String,
    pub document: Document,
}

impl Operation for DocumentCreateRequest {
    type Output = DocumentWriteResponse;

    fn request(&self) -> RequestSpec {
        RequestSpec::new(Method::POST, [self.database.as_str()]).json_body(&self.document)
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
