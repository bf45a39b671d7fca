//! Response outcomes and status classification.
//!
//! # Design
//! Classification is a pure function of the status code plus one bit of
//! request context: whether the request carried a precondition. 304 always
//! means "not modified", but 412 only means "precondition failed" when the
//! caller actually attached one; a bare 412 is an ordinary client error. The
//! `expect_*` helpers turn an unwanted classification into a typed error so
//! call sites can `?` instead of matching on status ranges.

use bytes::Bytes;
use http::header::AsHeaderName;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use url::Url;

use crate::error::{Error, Result};
use crate::precondition::Precondition;
use crate::transport::{RawResponse, ResponseBody};

/// What a status code means in the context of the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// 1xx interim response.
    Informational,
    /// 2xx success.
    Success,
    /// 3xx redirection other than 304.
    Redirect,
    /// 304: the cached representation is still current.
    NotModified,
    /// 412 answering a conditional request: the precondition did not hold.
    PreconditionFailed,
    /// Any other 4xx.
    ClientError,
    /// 5xx, and anything outside the 1xx-5xx ranges.
    ServerError,
}

impl Classification {
    /// Classify `status` given whether the request carried a precondition.
    pub fn of(status: StatusCode, has_precondition: bool) -> Self {
        if status.is_informational() {
            Classification::Informational
        } else if status.is_success() {
            Classification::Success
        } else if status == StatusCode::NOT_MODIFIED {
            Classification::NotModified
        } else if status.is_redirection() {
            Classification::Redirect
        } else if status == StatusCode::PRECONDITION_FAILED && has_precondition {
            Classification::PreconditionFailed
        } else if status.is_client_error() {
            Classification::ClientError
        } else {
            Classification::ServerError
        }
    }
}

/// The result of one executed request: status, headers, body handle, and the
/// classification derived from the originating request's precondition.
#[derive(Debug)]
pub struct ResponseOutcome {
    method: Method,
    url: Url,
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: ResponseBody,
    classification: Classification,
    precondition: Option<Precondition>,
}

impl ResponseOutcome {
    pub(crate) fn new(
        method: Method,
        url: Url,
        precondition: Option<Precondition>,
        raw: RawResponse,
    ) -> Self {
        let classification = Classification::of(raw.status, precondition.is_some());
        Self {
            method,
            url,
            status: raw.status,
            reason: raw.reason,
            headers: raw.headers,
            body: raw.body,
            classification,
            precondition,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Server-supplied reason phrase, falling back to the canonical one.
    pub fn reason(&self) -> &str {
        self.reason
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or("")
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_success(&self) -> bool {
        self.classification == Classification::Success
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn header_value(&self, name: impl AsHeaderName) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    pub fn header_values(&self, name: impl AsHeaderName) -> Vec<&HeaderValue> {
        self.headers.get_all(name).iter().collect()
    }

    pub fn precondition(&self) -> Option<&Precondition> {
        self.precondition.as_ref()
    }

    /// Fail unless the response classified as `Success`.
    ///
    /// A failed precondition surfaces as `Error::PreconditionFailed`
    /// carrying the tag or timestamp that did not hold; every other
    /// non-success status becomes `Error::UnexpectedStatus`.
    pub fn expect_success(&self) -> Result<()> {
        match self.classification {
            Classification::Success => Ok(()),
            Classification::PreconditionFailed => {
                // classification guarantees a precondition was present
                let subject = self
                    .precondition
                    .as_ref()
                    .map(Precondition::subject)
                    .ok_or(Error::UnexpectedStatus {
                        status: self.status,
                        reason: self.reason().to_string(),
                    })?;
                Err(Error::PreconditionFailed {
                    status: self.status,
                    subject,
                })
            }
            _ => Err(Error::UnexpectedStatus {
                status: self.status,
                reason: self.reason().to_string(),
            }),
        }
    }

    /// Fail unless the status is exactly `expected`.
    pub fn expect_status(&self, expected: StatusCode) -> Result<()> {
        self.expect_status_in(&[expected])
    }

    /// Fail unless the status is one of `expected`.
    pub fn expect_status_in(&self, expected: &[StatusCode]) -> Result<()> {
        if expected.contains(&self.status) {
            Ok(())
        } else {
            Err(Error::UnexpectedStatus {
                status: self.status,
                reason: self.reason().to_string(),
            })
        }
    }

    /// Methods the endpoint advertises through `Allow`.
    ///
    /// Tokens are split on commas across every `Allow` header present,
    /// trimmed, and deduplicated case-insensitively keeping the first
    /// spelling. A 405 status means the endpoint rejected the discovery
    /// discovery request itself and fails with `Error::MethodDiscovery`.
    pub fn allowed_methods(&self) -> Result<Vec<String>> {
        if self.status == StatusCode::METHOD_NOT_ALLOWED {
            return Err(Error::MethodDiscovery);
        }
        let mut methods: Vec<String> = Vec::new();
        for value in self.headers.get_all(header::ALLOW) {
            let Ok(value) = value.to_str() else { continue };
            for token in value.split(',') {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                if !methods.iter().any(|seen| seen.eq_ignore_ascii_case(token)) {
                    methods.push(token.to_string());
                }
            }
        }
        Ok(methods)
    }

    /// Consume and return the response payload.
    pub fn bytes(&mut self) -> Result<Bytes> {
        self.body.take()
    }

    /// Consume the payload and decode it as UTF-8, lossily.
    pub fn text(&mut self) -> Result<String> {
        let bytes = self.body.take()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Consume the payload and deserialize it as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.body.take()?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
