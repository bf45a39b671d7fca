//! The execution pipeline and its convenience surface.
//!
//! # Design
//! `Client` owns a `Transport` collaborator, an optional base URL, default
//! headers derived from `ClientOptions`, and the registered lifecycle
//! observers. `execute` is the single choke point every request flows
//! through: it announces the request, hands it to the transport, announces
//! the response, and wraps the result into a classified outcome. The
//! convenience methods (`get`, `put_json`, `fetch_json`, ...) are thin
//! builders over that one path. CORS preflight is the deliberate exception:
//! it talks to the transport directly and emits no events, because a
//! preflight exchange is not an application request.

use std::fmt;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, Utc};
use http::header::{
    self, HeaderMap, HeaderValue, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    ORIGIN,
};
use http::Method;
use url::Url;

use crate::cors::{self, PreflightResult};
use crate::error::{Error, Result};
use crate::events::{ErrorStatus, NotModified, Observers, RequestSent, ResponseReceived};
use crate::request::{RequestBody, RequestBuilder, RequestDescriptor};
use crate::response::{Classification, ResponseOutcome};
use crate::transport::Transport;

/// Credential scheme applied to every request via the `Authorization`
/// default header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
    Custom {
        scheme: String,
        value: String,
    },
}

impl Authorization {
    fn header_value(&self) -> Option<String> {
        match self {
            Authorization::None => None,
            Authorization::Basic { username, password } => {
                let credentials = BASE64_STANDARD.encode(format!("{username}:{password}"));
                Some(format!("Basic {credentials}"))
            }
            Authorization::Bearer(token) => Some(format!("Bearer {token}")),
            Authorization::Custom { scheme, value } => Some(format!("{scheme} {value}")),
        }
    }
}

/// Client-wide defaults applied to every request before per-request headers.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub user_agent: Option<String>,
    /// Defaults to `application/json` when unset.
    pub accept: Option<String>,
    pub authorization: Authorization,
}

impl ClientOptions {
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(user_agent) = &self.user_agent {
            insert_default(&mut headers, header::USER_AGENT, user_agent);
        }
        let accept = self.accept.as_deref().unwrap_or("application/json");
        insert_default(&mut headers, header::ACCEPT, accept);
        if let Some(authorization) = self.authorization.header_value() {
            insert_default(&mut headers, header::AUTHORIZATION, &authorization);
        }
        headers
    }
}

fn insert_default(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            tracing::debug!(header = %name, "skipping default header with invalid value");
        }
    }
}

/// A conditional-request client over a caller-supplied transport.
pub struct Client<T: Transport> {
    transport: T,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    observers: Observers,
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Client<T> {
    /// Build a client with default options. `base_url`, when given, must be
    /// an absolute URL.
    pub fn new(transport: T, base_url: Option<&str>) -> Result<Self> {
        Self::with_options(transport, base_url, ClientOptions::default())
    }

    pub fn with_options(
        transport: T,
        base_url: Option<&str>,
        options: ClientOptions,
    ) -> Result<Self> {
        let base_url = base_url
            .map(|raw| {
                Url::parse(raw).map_err(|source| Error::UrlResolution {
                    reason: format!("base URL {raw} is not absolute: {source}"),
                })
            })
            .transpose()?;
        Ok(Self {
            transport,
            base_url,
            default_headers: options.default_headers(),
            observers: Observers::default(),
        })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Start building a request, seeded with the client's default headers.
    pub fn request(&self, method: Method, url: Option<&str>) -> RequestBuilder {
        RequestBuilder::new(method, self.base_url.clone(), url)
            .headers(self.default_headers.clone())
    }

    pub fn on_request_sent(&self, observer: impl Fn(&RequestSent) + Send + Sync + 'static) {
        self.observers.on_request_sent(observer);
    }

    pub fn on_response_received(
        &self,
        observer: impl Fn(&ResponseReceived) + Send + Sync + 'static,
    ) {
        self.observers.on_response_received(observer);
    }

    pub fn on_not_modified(&self, observer: impl Fn(&NotModified) + Send + Sync + 'static) {
        self.observers.on_not_modified(observer);
    }

    pub fn on_error_status(&self, observer: impl Fn(&ErrorStatus) + Send + Sync + 'static) {
        self.observers.on_error_status(observer);
    }

    /// Execute a request through the transport, emitting lifecycle events.
    ///
    /// `RequestSent` fires before the transport call. On delivery,
    /// `ResponseReceived` fires for every response; then exactly one of
    /// `NotModified` (304) or `ErrorStatus` (any other status outside 2xx)
    /// may follow. Transport failures emit no response events.
    pub async fn execute(&self, request: RequestDescriptor) -> Result<ResponseOutcome> {
        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        self.observers.emit_request_sent(&RequestSent {
            method: request.method.clone(),
            url: request.url.clone(),
            content_type: request.content_type().map(str::to_string),
        });

        let raw = self
            .transport
            .send(&request)
            .await
            .map_err(Error::Transport)?;

        let RequestDescriptor {
            method,
            url,
            precondition,
            ..
        } = request;
        let outcome = ResponseOutcome::new(method, url, precondition, raw);

        tracing::debug!(status = %outcome.status(), url = %outcome.url(), "response received");
        self.observers.emit_response_received(&ResponseReceived {
            url: outcome.url().clone(),
            status: outcome.status(),
            content_type: outcome.content_type().map(str::to_string),
        });
        match outcome.classification() {
            Classification::NotModified => {
                self.observers.emit_not_modified(&NotModified {
                    method: outcome.method().clone(),
                    url: outcome.url().clone(),
                });
            }
            Classification::Success => {}
            _ => {
                self.observers.emit_error_status(&ErrorStatus {
                    method: outcome.method().clone(),
                    url: outcome.url().clone(),
                    status: outcome.status(),
                    reason: outcome.reason().to_string(),
                    content_type: outcome.content_type().map(str::to_string),
                });
            }
        }

        Ok(outcome)
    }

    pub async fn get(&self, url: Option<&str>) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::GET, url).build()?).await
    }

    pub async fn get_with_query<K: Into<String>, V: Into<String>>(
        &self,
        url: Option<&str>,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::GET, url).query(query).build()?)
            .await
    }

    /// Conditional GET: 304 when the resource is unchanged since `instant`.
    pub async fn get_if_modified_since(
        &self,
        url: Option<&str>,
        instant: DateTime<Utc>,
    ) -> Result<ResponseOutcome> {
        self.execute(
            self.request(Method::GET, url)
                .if_modified_since(instant)
                .build()?,
        )
        .await
    }

    /// Conditional GET: 304 when the resource still matches `tag`.
    pub async fn get_if_none_match(
        &self,
        url: Option<&str>,
        tag: impl Into<String>,
        weak: bool,
    ) -> Result<ResponseOutcome> {
        self.execute(
            self.request(Method::GET, url)
                .if_none_match(tag, weak)
                .build()?,
        )
        .await
    }

    pub async fn delete(&self, url: Option<&str>) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::DELETE, url).build()?)
            .await
    }

    pub async fn options(&self, url: Option<&str>) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::OPTIONS, url).build()?)
            .await
    }

    pub async fn post_json<E: serde::Serialize>(
        &self,
        url: Option<&str>,
        entity: &E,
    ) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::POST, url).json_body(entity)?.build()?)
            .await
    }

    pub async fn put_json<E: serde::Serialize>(
        &self,
        url: Option<&str>,
        entity: &E,
    ) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::PUT, url).json_body(entity)?.build()?)
            .await
    }

    pub async fn patch_json<E: serde::Serialize>(
        &self,
        url: Option<&str>,
        entity: &E,
    ) -> Result<ResponseOutcome> {
        self.execute(self.request(Method::PATCH, url).json_body(entity)?.build()?)
            .await
    }

    pub async fn post_form<K: AsRef<str>, V: AsRef<str>>(
        &self,
        url: Option<&str>,
        values: &[(K, V)],
    ) -> Result<ResponseOutcome> {
        self.execute(
            self.request(Method::POST, url)
                .body(RequestBody::form(values)?)
                .build()?,
        )
        .await
    }

    /// GET `url`, require success, and deserialize the JSON body.
    pub async fn fetch_json<E: serde::de::DeserializeOwned>(
        &self,
        url: Option<&str>,
    ) -> Result<E> {
        let mut outcome = self.get(url).await?;
        outcome.expect_success()?;
        outcome.json()
    }

    /// Discover the methods an endpoint advertises through `Allow`.
    pub async fn allowed_methods(&self, url: Option<&str>) -> Result<Vec<String>> {
        let outcome = self.options(url).await?;
        outcome.allowed_methods()
    }

    /// Send a CORS preflight request and evaluate the verdict.
    ///
    /// The exchange goes straight to the transport and emits no lifecycle
    /// events.
    pub async fn cors_preflight(
        &self,
        url: Option<&str>,
        origin: &str,
        request_method: &str,
        request_headers: &[&str],
    ) -> Result<PreflightResult> {
        let request_method = request_method.to_ascii_uppercase();
        let mut builder = self
            .request(Method::OPTIONS, url)
            .header(ORIGIN, origin)
            .header(ACCESS_CONTROL_REQUEST_METHOD, request_method.as_str());
        if !request_headers.is_empty() {
            builder = builder.header(ACCESS_CONTROL_REQUEST_HEADERS, request_headers.join(","));
        }
        let request = builder.build()?;

        tracing::debug!(url = %request.url, origin, "sending CORS preflight request");
        let raw = self
            .transport
            .send(&request)
            .await
            .map_err(Error::Transport)?;
        cors::evaluate(&raw, origin, &request_method, request_headers)
    }
}
