//! The transport boundary.
//!
//! # Design
//! The engine builds `RequestDescriptor` values and interprets `RawResponse`
//! values; the actual network round-trip belongs to a `Transport`
//! collaborator supplied by the caller. Timeouts, TLS, proxies, redirect
//! following, and connection pooling are all the transport's concern, which
//! keeps the core deterministic and easy to test against canned responses.

use std::future::Future;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::error::{BoxError, Error, Result};
use crate::request::RequestDescriptor;

/// An HTTP transport collaborator: one call, one round-trip.
///
/// Implementations must not retry or reinterpret status codes; non-2xx
/// responses are data, not errors. Transport failures (connect, I/O) are
/// reported through the boxed error and propagate to the caller unchanged.
pub trait Transport {
    fn send(
        &self,
        request: &RequestDescriptor,
    ) -> impl Future<Output = std::result::Result<RawResponse, BoxError>> + Send;
}

/// A response as delivered by the transport, before classification.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    /// Server-supplied reason phrase, when the transport preserves one.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    pub body: ResponseBody,
}

/// Single-consumption handle over the response payload.
///
/// The underlying stream is exhausted by the first read; a second read
/// fails with `Error::BodyConsumed` rather than silently returning empty.
#[derive(Debug)]
pub struct ResponseBody {
    bytes: Option<Bytes>,
}

impl ResponseBody {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: Some(bytes.into()),
        }
    }

    pub fn empty() -> Self {
        Self {
            bytes: Some(Bytes::new()),
        }
    }

    /// Consume and return the payload.
    pub fn take(&mut self) -> Result<Bytes> {
        self.bytes.take().ok_or(Error::BodyConsumed)
    }

    pub fn is_consumed(&self) -> bool {
        self.bytes.is_none()
    }
}
