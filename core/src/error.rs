//! Error types for request construction and execution.
//!
//! # Design
//! Construction-time failures (`NotRegistered`, `MalformedUrl`, `InvalidBody`,
//! ...) are returned from `new_request` and the `Request` setters. Execution
//! failures split three ways: the transport never produced a response
//! (`Transport`), a caller-supplied target could not be decoded (`Decode`), or
//! the server returned a status >= 400 and the caller gave no error target
//! (`HttpError`, carrying the raw status and body).
//!
//! A server error that *was* decoded into the caller's error target is not an
//! error at all: `execute` returns `Ok(false)`.

use crate::transport::TransportError;

/// Errors returned by `Requester` and `Request` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No discoverer was registered under this API name.
    #[error("api [{0}] not initialized")]
    NotRegistered(String),

    /// The joined base URL and path did not parse as an absolute URL.
    #[error("malformed url {url:?}: {source}")]
    MalformedUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// The joined URL parsed but does not use `http` or `https`.
    #[error("unsupported url scheme {scheme:?} in {url:?}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("invalid http method: {0}")]
    InvalidMethod(String),

    /// The body value serialized to JSON `null`.
    #[error("body must be non-nil")]
    InvalidBody,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed before any response was received.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The response body could not be decoded into the supplied target.
    #[error("decoding HTTP {status} response failed: {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    /// The server returned a status >= 400 and no error target was supplied.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },
}

impl ApiError {
    /// The HTTP-level outcome this error carries.
    ///
    /// Only a `Decode` failure on a response with status < 400 reports `true`:
    /// the request itself succeeded and just the decoding step failed. Every
    /// other error reports `false`.
    pub fn ok(&self) -> bool {
        matches!(self, ApiError::Decode { status, .. } if *status < 400)
    }

    /// The response status code, when the error was produced after a response
    /// was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Decode { status, .. } | ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
