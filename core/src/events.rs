//! Lifecycle event observation.
//!
//! # Design
//! Observers are plain callbacks registered on the client and invoked
//! synchronously at fixed points of the pipeline. Dispatch snapshots the
//! registration list before calling out, so an observer that registers
//! further observers never deadlocks and never sees itself mid-dispatch.
//! Payloads are owned snapshots of request/response data; observers cannot
//! reach into the live response or consume its body.

use std::sync::{Arc, Mutex, PoisonError};

use http::{Method, StatusCode};
use url::Url;

/// Emitted immediately before the transport is handed a request.
#[derive(Debug, Clone)]
pub struct RequestSent {
    pub method: Method,
    pub url: Url,
    pub content_type: Option<String>,
}

/// Emitted for every response the transport delivers, whatever its status.
#[derive(Debug, Clone)]
pub struct ResponseReceived {
    pub url: Url,
    pub status: StatusCode,
    pub content_type: Option<String>,
}

/// Emitted after `ResponseReceived` when a conditional request came back 304.
#[derive(Debug, Clone)]
pub struct NotModified {
    pub method: Method,
    pub url: Url,
}

/// Emitted after `ResponseReceived` for non-success statuses other than a
/// conditional 304.
#[derive(Debug, Clone)]
pub struct ErrorStatus {
    pub method: Method,
    pub url: Url,
    pub status: StatusCode,
    pub reason: String,
    pub content_type: Option<String>,
}

type Callbacks<E> = Mutex<Vec<Arc<dyn Fn(&E) + Send + Sync>>>;

/// Registered observers for the four lifecycle events.
#[derive(Default)]
pub(crate) struct Observers {
    request_sent: Callbacks<RequestSent>,
    response_received: Callbacks<ResponseReceived>,
    not_modified: Callbacks<NotModified>,
    error_status: Callbacks<ErrorStatus>,
}

impl Observers {
    pub(crate) fn on_request_sent(&self, observer: impl Fn(&RequestSent) + Send + Sync + 'static) {
        register(&self.request_sent, observer);
    }

    pub(crate) fn on_response_received(
        &self,
        observer: impl Fn(&ResponseReceived) + Send + Sync + 'static,
    ) {
        register(&self.response_received, observer);
    }

    pub(crate) fn on_not_modified(&self, observer: impl Fn(&NotModified) + Send + Sync + 'static) {
        register(&self.not_modified, observer);
    }

    pub(crate) fn on_error_status(&self, observer: impl Fn(&ErrorStatus) + Send + Sync + 'static) {
        register(&self.error_status, observer);
    }

    pub(crate) fn emit_request_sent(&self, event: &RequestSent) {
        emit(&self.request_sent, event);
    }

    pub(crate) fn emit_response_received(&self, event: &ResponseReceived) {
        emit(&self.response_received, event);
    }

    pub(crate) fn emit_not_modified(&self, event: &NotModified) {
        emit(&self.not_modified, event);
    }

    pub(crate) fn emit_error_status(&self, event: &ErrorStatus) {
        emit(&self.error_status, event);
    }
}

fn register<E>(callbacks: &Callbacks<E>, observer: impl Fn(&E) + Send + Sync + 'static) {
    callbacks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::new(observer));
}

fn emit<E>(callbacks: &Callbacks<E>, event: &E) {
    // snapshot so observers may register observers during dispatch
    let snapshot: Vec<_> = callbacks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for callback in snapshot {
        callback(event);
    }
}
