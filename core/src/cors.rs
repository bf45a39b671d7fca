//! CORS preflight evaluation.
//!
//! # Design
//! The evaluator inspects an OPTIONS response's `Access-Control-Allow-*`
//! headers and answers three independent questions: would this method, this
//! origin, and these headers be allowed? Each check treats an *absent*
//! header as permissive, matching how a same-origin server that never heard
//! of CORS behaves. Method tokens compare case-sensitively (HTTP methods
//! are case-sensitive tokens); header names compare case-insensitively.

use http::header::{
    HeaderMap, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderName, StatusCode};

use crate::error::{Error, Result};
use crate::transport::RawResponse;

/// The three sub-verdicts of a preflight evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightResult {
    pub method_allowed: bool,
    pub origin_allowed: bool,
    pub headers_allowed: bool,
}

impl PreflightResult {
    /// True when every sub-check passed.
    pub fn is_allowed(&self) -> bool {
        self.method_allowed && self.origin_allowed && self.headers_allowed
    }
}

/// Evaluate a preflight `response` against the cross-origin request the
/// caller intends to make.
///
/// A 405 means the endpoint rejected the OPTIONS request itself; that is
/// `Error::MethodDiscovery`, not a preflight verdict.
pub fn evaluate(
    response: &RawResponse,
    origin: &str,
    request_method: &str,
    request_headers: &[&str],
) -> Result<PreflightResult> {
    if response.status == StatusCode::METHOD_NOT_ALLOWED {
        return Err(Error::MethodDiscovery);
    }
    Ok(PreflightResult {
        method_allowed: method_allowed(&response.headers, request_method),
        origin_allowed: origin_allowed(&response.headers, origin),
        headers_allowed: headers_allowed(&response.headers, request_headers),
    })
}

/// Comma-separated tokens across every instance of `name`, trimmed.
fn tokens(headers: &HeaderMap, name: &HeaderName) -> Option<Vec<String>> {
    let mut found = false;
    let mut tokens = Vec::new();
    for value in headers.get_all(name) {
        found = true;
        let Ok(value) = value.to_str() else { continue };
        tokens.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        );
    }
    found.then_some(tokens)
}

fn method_allowed(headers: &HeaderMap, request_method: &str) -> bool {
    match tokens(headers, &ACCESS_CONTROL_ALLOW_METHODS) {
        None => true,
        Some(allowed) => allowed.iter().any(|token| token == request_method),
    }
}

fn origin_allowed(headers: &HeaderMap, origin: &str) -> bool {
    let mut found = false;
    for value in headers.get_all(ACCESS_CONTROL_ALLOW_ORIGIN) {
        found = true;
        let Ok(value) = value.to_str() else { continue };
        let value = value.trim();
        if value == "*" || value == origin {
            return true;
        }
    }
    !found
}

fn headers_allowed(headers: &HeaderMap, request_headers: &[&str]) -> bool {
    match tokens(headers, &ACCESS_CONTROL_ALLOW_HEADERS) {
        None => true,
        Some(allowed) => request_headers.iter().all(|requested| {
            allowed
                .iter()
                .any(|token| token.eq_ignore_ascii_case(requested))
        }),
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::transport::ResponseBody;

    fn response(entries: &[(&HeaderName, &str)]) -> RawResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in entries {
            headers.append((*name).clone(), HeaderValue::from_str(value).unwrap());
        }
        RawResponse {
            status: StatusCode::NO_CONTENT,
            reason: None,
            headers,
            body: ResponseBody::empty(),
        }
    }

    #[test]
    fn absent_headers_are_permissive() {
        let response = response(&[]);
        let verdict = evaluate(
            &response,
            "https://app.example.com",
            "DELETE",
            &["x-custom"],
        )
        .unwrap();
        assert!(verdict.is_allowed());
    }

    #[test]
    fn method_check_is_case_sensitive() {
        let response = response(&[(&ACCESS_CONTROL_ALLOW_METHODS, "GET, POST")]);
        assert!(method_allowed(&response.headers, "POST"));
        assert!(!method_allowed(&response.headers, "post"));
        assert!(!method_allowed(&response.headers, "DELETE"));
    }

    #[test]
    fn origin_check_is_exact_or_wildcard() {
        let exact = response(&[(&ACCESS_CONTROL_ALLOW_ORIGIN, "https://app.example.com")]);
        assert!(origin_allowed(&exact.headers, "https://app.example.com"));
        assert!(!origin_allowed(&exact.headers, "https://App.example.com"));
        assert!(!origin_allowed(&exact.headers, "https://evil.example.com"));

        let wildcard = response(&[(&ACCESS_CONTROL_ALLOW_ORIGIN, "*")]);
        assert!(origin_allowed(&wildcard.headers, "https://anything.example"));
    }

    #[test]
    fn header_check_is_case_insensitive_and_requires_all() {
        let response = response(&[(
            &ACCESS_CONTROL_ALLOW_HEADERS,
            "Content-Type, X-Request-Id",
        )]);
        assert!(headers_allowed(&response.headers, &["content-type"]));
        assert!(headers_allowed(
            &response.headers,
            &["CONTENT-TYPE", "x-request-id"]
        ));
        assert!(!headers_allowed(
            &response.headers,
            &["content-type", "x-other"]
        ));
        assert!(headers_allowed(&response.headers, &[]));
    }

    #[test]
    fn tokens_accumulate_across_repeated_headers() {
        let response = response(&[
            (&ACCESS_CONTROL_ALLOW_METHODS, "GET"),
            (&ACCESS_CONTROL_ALLOW_METHODS, "PUT , DELETE"),
        ]);
        assert!(method_allowed(&response.headers, "DELETE"));
        assert!(!method_allowed(&response.headers, "PATCH"));
    }

    #[test]
    fn sub_verdicts_are_independent() {
        let response = response(&[
            (&ACCESS_CONTROL_ALLOW_METHODS, "GET"),
            (&ACCESS_CONTROL_ALLOW_ORIGIN, "https://app.example.com"),
            (&ACCESS_CONTROL_ALLOW_HEADERS, "content-type"),
        ]);
        let verdict = evaluate(
            &response,
            "https://other.example.com",
            "GET",
            &["content-type"],
        )
        .unwrap();
        assert!(verdict.method_allowed);
        assert!(!verdict.origin_allowed);
        assert!(verdict.headers_allowed);
        assert!(!verdict.is_allowed());
    }

    #[test]
    fn verdict_is_independent_of_request_header_order() {
        let response = response(&[
            (&ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"),
            (&ACCESS_CONTROL_ALLOW_ORIGIN, "https://app.example.com"),
            (&ACCESS_CONTROL_ALLOW_HEADERS, "content-type, x-request-id"),
        ]);

        let orderings: [&[&str]; 3] = [
            &["content-type", "x-request-id"],
            &["x-request-id", "content-type"],
            &["x-request-id", "content-type", "x-request-id"],
        ];
        let verdicts: Vec<PreflightResult> = orderings
            .iter()
            .map(|headers| {
                evaluate(&response, "https://app.example.com", "POST", headers).unwrap()
            })
            .collect();
        assert!(verdicts.iter().all(|verdict| *verdict == verdicts[0]));
        assert!(verdicts[0].is_allowed());

        // an unlisted header fails in every ordering too
        let failing: [&[&str]; 3] = [
            &["x-other", "content-type", "x-request-id"],
            &["content-type", "x-other", "x-request-id"],
            &["content-type", "x-request-id", "x-other"],
        ];
        for headers in failing {
            let verdict =
                evaluate(&response, "https://app.example.com", "POST", headers).unwrap();
            assert!(!verdict.headers_allowed);
            assert!(verdict.method_allowed);
            assert!(verdict.origin_allowed);
        }
    }

    #[test]
    fn evaluation_is_idempotent() {
        let response = response(&[(&ACCESS_CONTROL_ALLOW_METHODS, "GET")]);
        let first = evaluate(&response, "https://app.example.com", "GET", &[]).unwrap();
        let second = evaluate(&response, "https://app.example.com", "GET", &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rejected_options_is_a_discovery_error() {
        let mut response = response(&[]);
        response.status = StatusCode::METHOD_NOT_ALLOWED;
        assert!(matches!(
            evaluate(&response, "https://app.example.com", "GET", &[]),
            Err(Error::MethodDiscovery)
        ));
    }
}
