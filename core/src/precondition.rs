//! Conditional request header intents.
//!
//! # Design
//! A `Precondition` is a value object describing what conditional header a
//! request should carry; rendering to an actual header happens once, when
//! the request is built. Entity tags default to weak comparison, matching
//! common cache-revalidation practice. `subject()` extracts the tag or
//! timestamp so a 412 can report *what* failed to match.

use std::fmt;

use chrono::{DateTime, Utc};
use http::header::{self, HeaderName};

/// A conditional header intent for a single request.
///
/// At most one precondition attaches to a request; setting another on the
/// builder replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// `If-Match`: proceed only when the resource's current entity tag
    /// matches.
    IfMatch { tag: String, weak: bool },
    /// `If-None-Match`: proceed only when the entity tag does *not* match.
    IfNoneMatch { tag: String, weak: bool },
    /// `If-Modified-Since`: proceed only when the resource changed after the
    /// given instant.
    IfModifiedSince(DateTime<Utc>),
    /// `If-Unmodified-Since`: proceed only when the resource has not changed
    /// since the given instant.
    IfUnmodifiedSince(DateTime<Utc>),
}

impl Precondition {
    /// Header name and rendered value for this precondition.
    pub fn header(&self) -> (HeaderName, String) {
        match self {
            Precondition::IfMatch { tag, weak } => (header::IF_MATCH, entity_tag(tag, *weak)),
            Precondition::IfNoneMatch { tag, weak } => {
                (header::IF_NONE_MATCH, entity_tag(tag, *weak))
            }
            Precondition::IfModifiedSince(instant) => {
                (header::IF_MODIFIED_SINCE, http_date(instant))
            }
            Precondition::IfUnmodifiedSince(instant) => {
                (header::IF_UNMODIFIED_SINCE, http_date(instant))
            }
        }
    }

    /// The tag or timestamp this precondition constrained, for failure
    /// reporting.
    pub fn subject(&self) -> PreconditionSubject {
        match self {
            Precondition::IfMatch { tag, .. } | Precondition::IfNoneMatch { tag, .. } => {
                PreconditionSubject::Tag(tag.clone())
            }
            Precondition::IfModifiedSince(instant) | Precondition::IfUnmodifiedSince(instant) => {
                PreconditionSubject::Timestamp(*instant)
            }
        }
    }
}

/// What a failed precondition was constraining: an entity tag or an instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionSubject {
    Tag(String),
    Timestamp(DateTime<Utc>),
}

impl fmt::Display for PreconditionSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionSubject::Tag(tag) => write!(f, "entity tag \"{tag}\""),
            PreconditionSubject::Timestamp(instant) => {
                write!(f, "timestamp {}", http_date(instant))
            }
        }
    }
}

/// RFC 7232 entity-tag rendering: `W/"tag"` for weak, `"tag"` for strong.
fn entity_tag(tag: &str, weak: bool) -> String {
    if weak {
        format!("W/\"{tag}\"")
    } else {
        format!("\"{tag}\"")
    }
}

/// RFC 7231 IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub(crate) fn http_date(instant: &DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
