//! Request descriptors and the builder that assembles them.
//!
//! # Design
//! A `RequestDescriptor` is plain data: method, absolute URL, header
//! multimap, optional body, optional precondition. The builder resolves
//! relative URLs against a configured base, renders query strings and
//! precondition headers, and hands the immutable descriptor to the caller;
//! nothing mutates it after `build()`. Query values are deliberately not
//! percent-encoded by the builder (historic behavior callers depend on);
//! `url::Url` still escapes characters that would make the URL unparseable.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use url::Url;

use crate::error::{Error, Result};
use crate::precondition::Precondition;

/// An HTTP request described as plain data.
///
/// Built by `RequestBuilder`; owned by the caller until handed to
/// `Client::execute`, and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    pub precondition: Option<Precondition>,
}

impl RequestDescriptor {
    pub fn content_type(&self) -> Option<&str> {
        self.body.as_ref().map(|body| body.content_type.as_str())
    }
}

/// A request payload: opaque bytes plus their content type.
///
/// The serialization decision is made here, at the builder boundary; the
/// pipeline and transport only ever see bytes.
#[derive(Debug, Clone)]
pub struct RequestBody {
    pub bytes: Bytes,
    pub content_type: String,
}

impl RequestBody {
    /// JSON-encode an entity.
    pub fn json<T: serde::Serialize>(entity: &T) -> Result<Self> {
        Ok(Self {
            bytes: Bytes::from(serde_json::to_vec(entity)?),
            content_type: "application/json".to_string(),
        })
    }

    /// Form-urlencode a set of key/value pairs.
    pub fn form<K: AsRef<str>, V: AsRef<str>>(values: &[(K, V)]) -> Result<Self> {
        let pairs: Vec<(&str, &str)> = values
            .iter()
            .map(|(key, value)| (key.as_ref(), value.as_ref()))
            .collect();
        Ok(Self {
            bytes: Bytes::from(serde_urlencoded::to_string(pairs)?.into_bytes()),
            content_type: "application/x-www-form-urlencoded".to_string(),
        })
    }

    pub fn text(text: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: Bytes::from(text.into().into_bytes()),
            content_type: content_type.into(),
        }
    }

    pub fn bytes(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }
}

/// Assembles a `RequestDescriptor` from a method, a target URL, and the
/// optional pieces: headers, query parameters, body, precondition.
///
/// Pure given its inputs besides the captured base URL. Setting a second
/// precondition replaces the first; setting query parameters replaces any
/// query string already present on the URL.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    base: Option<Url>,
    url: Option<String>,
    headers: HeaderMap,
    invalid_header: Option<String>,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    precondition: Option<Precondition>,
}

impl RequestBuilder {
    /// Start a request for `url`, resolved against `base` when relative.
    /// `None` targets the base URL itself.
    pub fn new(method: Method, base: Option<Url>, url: Option<&str>) -> Self {
        Self {
            method,
            base,
            url: url.map(str::to_string),
            headers: HeaderMap::new(),
            invalid_header: None,
            query: Vec::new(),
            body: None,
            precondition: None,
        }
    }

    /// Append a header; duplicate names accumulate in order. An invalid name
    /// or value makes `build()` fail with `Error::InvalidHeader` rather than
    /// shipping the request without it.
    #[must_use]
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: AsRef<str> + TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let raw = name.as_ref().to_string();
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                // first offending name wins
                self.invalid_header.get_or_insert(raw);
            }
        }
        self
    }

    /// Append every entry of `headers`.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    /// Set the query string from key/value pairs, replacing any query
    /// already present. An empty set is a no-op.
    #[must_use]
    pub fn query<K: Into<String>, V: Into<String>>(
        mut self,
        params: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.query = params
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    #[must_use]
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// JSON-encode `entity` as the request body.
    pub fn json_body<T: serde::Serialize>(self, entity: &T) -> Result<Self> {
        Ok(self.body(RequestBody::json(entity)?))
    }

    /// Attach a precondition, replacing any previous one.
    #[must_use]
    pub fn precondition(mut self, precondition: Precondition) -> Self {
        self.precondition = Some(precondition);
        self
    }

    #[must_use]
    pub fn if_match(self, tag: impl Into<String>, weak: bool) -> Self {
        self.precondition(Precondition::IfMatch {
            tag: tag.into(),
            weak,
        })
    }

    #[must_use]
    pub fn if_none_match(self, tag: impl Into<String>, weak: bool) -> Self {
        self.precondition(Precondition::IfNoneMatch {
            tag: tag.into(),
            weak,
        })
    }

    #[must_use]
    pub fn if_modified_since(self, instant: DateTime<Utc>) -> Self {
        self.precondition(Precondition::IfModifiedSince(instant))
    }

    #[must_use]
    pub fn if_unmodified_since(self, instant: DateTime<Utc>) -> Self {
        self.precondition(Precondition::IfUnmodifiedSince(instant))
    }

    /// Resolve the URL, render the query string and precondition header, and
    /// produce the immutable descriptor. Fails if any header set earlier had
    /// an invalid name or value.
    pub fn build(self) -> Result<RequestDescriptor> {
        if let Some(name) = self.invalid_header {
            return Err(Error::InvalidHeader { name });
        }
        let mut url = resolve_url(self.base.as_ref(), self.url.as_deref())?;

        if !self.query.is_empty() {
            let rendered = self
                .query
                .iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&rendered));
        }

        let mut headers = self.headers;
        if let Some(precondition) = &self.precondition {
            let (name, value) = precondition.header();
            let value = HeaderValue::from_str(&value).map_err(|_| Error::InvalidHeader {
                name: name.as_str().to_string(),
            })?;
            headers.append(name, value);
        }

        Ok(RequestDescriptor {
            method: self.method,
            url,
            headers,
            body: self.body,
            precondition: self.precondition,
        })
    }
}

/// Resolve a request target against an optional base URL.
///
/// Absolute targets pass through unchanged. Relative targets join the base
/// with exactly one separating slash, however many slashes either side
/// carries. A missing target resolves to the base itself.
pub(crate) fn resolve_url(base: Option<&Url>, url: Option<&str>) -> Result<Url> {
    match url {
        Some(target) if !target.is_empty() => {
            if let Ok(absolute) = Url::parse(target) {
                return Ok(absolute);
            }
            let base = base.ok_or_else(|| Error::UrlResolution {
                reason: format!("{target} is not absolute and no base URL is configured"),
            })?;
            let joined = format!(
                "{}/{}",
                base.as_str().trim_end_matches('/'),
                target.trim_start_matches('/')
            );
            Url::parse(&joined).map_err(|source| Error::UrlResolution {
                reason: format!("joined URL {joined} is not valid: {source}"),
            })
        }
        _ => base.cloned().ok_or_else(|| Error::UrlResolution {
            reason: "no target URL given and no base URL is configured".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;

    fn base() -> Option<Url> {
        Some(Url::parse("https://api.example.com/").unwrap())
    }

    #[test]
    fn joins_with_exactly_one_slash() {
        for base_raw in ["https://api.example.com", "https://api.example.com/"] {
            for relative in ["widgets/1", "/widgets/1", "//widgets/1"] {
                let base = Url::parse(base_raw).unwrap();
                let url = resolve_url(Some(&base), Some(relative)).unwrap();
                assert_eq!(url.as_str(), "https://api.example.com/widgets/1");
            }
        }
    }

    #[test]
    fn absolute_url_passes_through() {
        let url = resolve_url(base().as_ref(), Some("https://other.example.net/x")).unwrap();
        assert_eq!(url.as_str(), "https://other.example.net/x");
    }

    #[test]
    fn missing_target_resolves_to_base() {
        let url = resolve_url(base().as_ref(), None).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
        let url = resolve_url(base().as_ref(), Some("")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/");
    }

    #[test]
    fn relative_without_base_fails() {
        let err = resolve_url(None, Some("widgets/1")).unwrap_err();
        assert!(matches!(err, Error::UrlResolution { .. }));
        let err = resolve_url(None, None).unwrap_err();
        assert!(matches!(err, Error::UrlResolution { .. }));
    }

    #[test]
    fn if_none_match_scenario() {
        let request = RequestBuilder::new(Method::GET, base(), Some("/widgets/1"))
            .if_none_match("abc123", true)
            .build()
            .unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url.as_str(), "https://api.example.com/widgets/1");
        assert_eq!(
            request.headers.get(header::IF_NONE_MATCH).unwrap(),
            "W/\"abc123\""
        );
    }

    #[test]
    fn last_precondition_wins() {
        let request = RequestBuilder::new(Method::PUT, base(), Some("/widgets/1"))
            .if_none_match("old", true)
            .if_match("new", false)
            .build()
            .unwrap();
        assert_eq!(request.headers.get(header::IF_NONE_MATCH), None);
        assert_eq!(request.headers.get(header::IF_MATCH).unwrap(), "\"new\"");
        assert_eq!(
            request.precondition,
            Some(Precondition::IfMatch {
                tag: "new".to_string(),
                weak: false,
            })
        );
    }

    #[test]
    fn query_renders_without_encoding_separators() {
        let request = RequestBuilder::new(Method::GET, base(), Some("/search"))
            .query([("q", "rust"), ("page", "2")])
            .build()
            .unwrap();
        assert_eq!(
            request.url.as_str(),
            "https://api.example.com/search?q=rust&page=2"
        );
    }

    #[test]
    fn empty_query_is_a_no_op() {
        let request = RequestBuilder::new(Method::GET, base(), Some("/search?q=keep"))
            .query(Vec::<(String, String)>::new())
            .build()
            .unwrap();
        assert_eq!(request.url.query(), Some("q=keep"));
    }

    #[test]
    fn query_replaces_existing_query_entirely() {
        let request = RequestBuilder::new(Method::GET, base(), Some("/search?q=old&lang=en"))
            .query([("q", "new")])
            .build()
            .unwrap();
        assert_eq!(request.url.query(), Some("q=new"));
    }

    #[test]
    fn precondition_after_body_leaves_body_untouched() {
        let body = RequestBody::json(&serde_json::json!({"name": "gear"})).unwrap();
        let encoded = body.bytes.clone();
        let request = RequestBuilder::new(Method::PUT, base(), Some("/widgets/1"))
            .body(body)
            .if_match("v3", true)
            .build()
            .unwrap();
        assert_eq!(request.body.as_ref().unwrap().bytes, encoded);
        assert_eq!(request.content_type(), Some("application/json"));
        assert_eq!(request.headers.get(header::IF_MATCH).unwrap(), "W/\"v3\"");
    }

    #[test]
    fn duplicate_headers_accumulate_in_order() {
        let request = RequestBuilder::new(Method::GET, base(), None)
            .header("x-trace", "first")
            .header("x-trace", "second")
            .build()
            .unwrap();
        let values: Vec<_> = request
            .headers
            .get_all("x-trace")
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn invalid_header_value_fails_at_build() {
        let err = RequestBuilder::new(Method::GET, base(), Some("/widgets"))
            .header("authorization", "Bearer tok\nen")
            .build()
            .unwrap_err();
        match err {
            Error::InvalidHeader { name } => assert_eq!(name, "authorization"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_header_name_fails_at_build() {
        let err = RequestBuilder::new(Method::GET, base(), Some("/widgets"))
            .header("bad name", "value")
            .build()
            .unwrap_err();
        match err {
            Error::InvalidHeader { name } => assert_eq!(name, "bad name"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn first_invalid_header_is_the_one_reported() {
        let err = RequestBuilder::new(Method::GET, base(), Some("/widgets"))
            .header("x-ok", "fine")
            .header("x-broken", "bad\nvalue")
            .header("also bad", "later")
            .build()
            .unwrap_err();
        match err {
            Error::InvalidHeader { name } => assert_eq!(name, "x-broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn form_body_is_urlencoded() {
        let body = RequestBody::form(&[("name", "a gear"), ("kind", "spur")]).unwrap();
        assert_eq!(body.content_type, "application/x-www-form-urlencoded");
        assert_eq!(body.bytes, Bytes::from_static(b"name=a+gear&kind=spur"));
    }
}
