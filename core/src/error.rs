//! Error types for the conditional request engine.
//!
//! # Design
//! `PreconditionFailed` and `MethodDiscovery` get dedicated variants because
//! callers branch on them: a 412 carries the subject of the precondition that
//! failed to match, and a 405 on an OPTIONS round-trip means the endpoint
//! does not support method discovery at all. Everything the transport
//! collaborator reports passes through unchanged inside `Transport`.

use http::StatusCode;

use crate::precondition::PreconditionSubject;

/// Boxed error type produced by `Transport` implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by request building, execution, and classification.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target URL could not be resolved to a valid absolute URL.
    #[error("cannot resolve request URL: {reason}")]
    UrlResolution { reason: String },

    /// A header name or value could not be encoded onto the request.
    #[error("invalid header {name}")]
    InvalidHeader { name: String },

    /// An `expect_*` helper found a status that does not match the
    /// caller's expectation.
    #[error("unexpected HTTP status {status}: {reason}")]
    UnexpectedStatus { status: StatusCode, reason: String },

    /// The server answered 412 to a request carrying a precondition.
    #[error("precondition on {subject} failed with HTTP {status}")]
    PreconditionFailed {
        status: StatusCode,
        subject: PreconditionSubject,
    },

    /// The remote endpoint answered 405 to an OPTIONS round-trip, so no
    /// method-discovery or preflight data was usable.
    #[error("remote endpoint does not allow the OPTIONS method")]
    MethodDiscovery,

    /// The response body was already read once.
    #[error("response body already consumed")]
    BodyConsumed,

    /// JSON (de)serialization of a request or response entity failed.
    #[error("JSON entity error")]
    Json(#[from] serde_json::Error),

    /// Form-urlencoded body encoding failed.
    #[error("form body encoding failed")]
    Form(#[from] serde_urlencoded::ser::Error),

    /// The transport collaborator failed; the underlying error is passed
    /// through unchanged.
    #[error("transport error")]
    Transport(#[source] BoxError),
}
