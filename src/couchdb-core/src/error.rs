//! Error taxonomy shared by the decoder, the status evaluator and the client.

use http::{Method, StatusCode};

/// Boxed error produced by a transport implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("already exists: {message}")]
    AlreadyExists { message: String },

    #[error("unexpected status {actual}, expected one of {expected:?}")]
    UnexpectedStatus { expected: Vec<u16>, actual: u16 },

    #[error("decode: {0}")]
    Decode(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("transport: {0}")]
    Transport(#[source] BoxError),

    #[error("json encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-supplied value that cannot go on the wire; no request was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("request cancelled")]
    Cancelled,

    /// Annotates a failure with the request it belongs to.
    #[error("request [{method}] [{url}]: {source}")]
    Request {
        method: Method,
        url: String,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`], independent of annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    Unauthorized,
    NotFound,
    AlreadyExists,
    UnexpectedStatus,
    Decode,
    NotImplemented,
    Transport,
    Encode,
    InvalidConfig,
    InvalidArgument,
    Cancelled,
}

impl Error {
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    /// Wrap this error with the method and URL of the failing request.
    pub fn annotate(self, method: &Method, url: impl Into<String>) -> Self {
        Error::Request {
            method: method.clone(),
            url: url.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Error::Unauthorized { .. } => ErrorKind::Unauthorized,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Error::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Error::Decode(_) => ErrorKind::Decode,
            Error::NotImplemented(_) => ErrorKind::NotImplemented,
            Error::Transport(_) | Error::Read(_) => ErrorKind::Transport,
            Error::Encode(_) => ErrorKind::Encode,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Request { source, .. } => source.kind(),
        }
    }

    /// The innermost error, with all request annotations removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Request { source, .. } => source.root(),
            other => other,
        }
    }

    /// Human-readable detail for status-derived errors.
    pub fn message(&self) -> Option<&str> {
        match self.root() {
            Error::InvalidRequest { message }
            | Error::Unauthorized { message }
            | Error::NotFound { message }
            | Error::AlreadyExists { message } => Some(message),
            _ => None,
        }
    }

    /// Status code that produced this error, when it came from the evaluator.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root() {
            Error::InvalidRequest { .. } => Some(StatusCode::BAD_REQUEST),
            Error::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Error::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            Error::UnexpectedStatus { actual, .. } => StatusCode::from_u16(*actual).ok(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_already_exists(&self) -> bool {
        self.kind() == ErrorKind::AlreadyExists
    }

    pub fn is_invalid_request(&self) -> bool {
        self.kind() == ErrorKind::InvalidRequest
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Unauthorized
    }
}
