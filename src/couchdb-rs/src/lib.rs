//! CouchDB Client Library
//!
//! HTTP client for the CouchDB REST API.
//!
//! Every operation is a value implementing [`Operation`]; the fluent
//! helpers on [`Client`], [`DatabaseRef`], [`DocumentRef`] and
//! [`AttachmentRef`] build them and return a [`Call`] that is sent with a
//! [`Context`].

pub mod attachment;
pub mod client;
pub mod context;
pub mod database;
pub mod document;
pub mod operation;
pub mod request;
pub mod transport;

pub use attachment::{
    AttachmentDeleteRequest, AttachmentFetchRequest, AttachmentRef, AttachmentStoreRequest,
};
pub use client::{AllDatabasesRequest, Client, ClientBuilder, InstanceInfoRequest};
pub use context::Context;
pub use database::{
    DatabaseCreateRequest, DatabaseDeleteRequest, DatabaseHeadRequest, DatabaseInfoRequest,
    DatabaseRef, DocumentCreateRequest,
};
pub use document::{
    DocumentDeleteRequest, DocumentFetchMetaRequest, DocumentFetchRequest, DocumentRef,
    DocumentUpdateRequest,
};
pub use operation::{Call, Operation, Response};
pub use request::{BodyMode, RequestSpec};
pub use transport::{ReqwestTransport, Transport, TransportRequest, TransportResponse};

pub use couchdb_core;
pub use couchdb_core::{
    Attachment, Body, ClientConfig, Conditional, DatabaseInfo, Document, DocumentMeta,
    DocumentWriteResponse, Error, ErrorKind, FetchedDocument, InstanceInfo, Result, Status,
};
pub use tokio_util::sync::CancellationToken;
