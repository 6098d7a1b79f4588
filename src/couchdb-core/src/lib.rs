//! CouchDB Core Library
//!
//! Wire-level building blocks shared by the CouchDB client:
//! - Error taxonomy for status codes, decoding and transport failures
//! - Response body envelope and content-type driven decoding
//! - Status evaluation against per-operation allow-lists
//! - Wire models and client configuration

pub mod body;
pub mod config;
pub mod error;
pub mod models;
pub mod status;

// Re-export commonly used types
pub use body::{decode_body, Body};
pub use config::{ClientConfig, Credentials};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use models::*;
pub use status::{check_allowed, evaluate_response, evaluate_status};
