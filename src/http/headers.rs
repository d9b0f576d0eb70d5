// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Header names and multi-valued header fields

use serde::Serialize;

pub const ACCEPT: &str = "Accept";
pub const CONTENT_ENCODING: &str = "Content-Encoding";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const COOKIE: &str = "Cookie";
pub const SET_COOKIE: &str = "Set-Cookie";
pub const USER_AGENT: &str = "User-Agent";
pub const X_REQUESTED_WITH: &str = "X-Requested-With";

/// A header that occurred once, or several times with different values
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderField {
    One(String),
    Many(Vec<String>),
}

impl HeaderField {
    /// First value of the field
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderField::One(v) => Some(v),
            HeaderField::Many(vs) => vs.first().map(String::as_str),
        }
    }

    /// All values of the field, in arrival order
    pub fn values(&self) -> Vec<&str> {
        match self {
            HeaderField::One(v) => vec![v.as_str()],
            HeaderField::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Add another occurrence. A value identical to a single existing one
    /// is folded; otherwise the field is promoted to `Many`.
    pub fn push(&mut self, value: String) {
        match self {
            HeaderField::One(existing) if *existing == value => {}
            HeaderField::One(existing) => {
                let first = std::mem::take(existing);
                *self = HeaderField::Many(vec![first, value]);
            }
            HeaderField::Many(values) => values.push(value),
        }
    }
}

impl From<&str> for HeaderField {
    fn from(s: &str) -> Self {
        HeaderField::One(s.to_string())
    }
}

impl From<String> for HeaderField {
    fn from(s: String) -> Self {
        HeaderField::One(s)
    }
}

impl From<Vec<String>> for HeaderField {
    fn from(values: Vec<String>) -> Self {
        HeaderField::Many(values)
    }
}

/// Title-case every hyphen-delimited segment: `content-type` becomes
/// `Content-Type`. Idempotent.
pub fn normalize_header_name(name: &str) -> String {
    name.trim()
        .split('-')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Check whether a `Content-Type` value names the given media type,
/// ignoring case and parameters
pub fn is_media_type(content_type: &str, media_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|t| t.trim().eq_ignore_ascii_case(media_type))
        .unwrap_or(false)
}
