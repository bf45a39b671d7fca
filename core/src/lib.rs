//! Conditional HTTP request engine: builds requests with RFC 7232
//! preconditions, executes them through a pluggable transport, and
//! classifies the responses.
//!
//! # Overview
//! The crate answers three questions for REST clients that cache:
//! - how do I express "only if changed" / "only if unchanged" on a request?
//! - what did the status code mean, *given* that I asked conditionally?
//! - would a cross-origin version of this request survive preflight?
//!
//! # Design
//! - `RequestBuilder` produces immutable `RequestDescriptor` values; URL
//!   resolution, query rendering, and precondition headers happen at
//!   `build()` time.
//! - `Client` drives the round-trip through a caller-supplied `Transport`
//!   and emits lifecycle events (`RequestSent`, `ResponseReceived`,
//!   `NotModified`, `ErrorStatus`) to registered observers.
//! - `ResponseOutcome` classifies the status against the originating
//!   precondition: 304 is `NotModified`, and 412 is `PreconditionFailed`
//!   when the request was conditional.
//! - `cors::evaluate` checks an OPTIONS response's `Access-Control-Allow-*`
//!   headers against an intended cross-origin request.
//! - No HTTP stack is baked in; transports implement one async `send`
//!   method, and tests run against canned responses.

pub mod client;
pub mod cors;
pub mod error;
pub mod events;
pub mod precondition;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{Authorization, Client, ClientOptions};
pub use cors::PreflightResult;
pub use error::{BoxError, Error, Result};
pub use events::{ErrorStatus, NotModified, RequestSent, ResponseReceived};
pub use precondition::{Precondition, PreconditionSubject};
pub use request::{RequestBody, RequestBuilder, RequestDescriptor};
pub use response::{Classification, ResponseOutcome};
pub use transport::{RawResponse, ResponseBody, Transport};
