// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP response types and decoding of raw transport output

use std::collections::BTreeMap;
use std::io::Read;

use bytes::Bytes;
use flate2::read::MultiGzDecoder;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::cookie::parse_set_cookie_pair;
use super::headers::{self, normalize_header_name, HeaderField};
use crate::error::{Error, Result};

/// Normalized HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    /// Response status code
    pub status: u16,
    /// First `Content-Type` value, if any
    pub content_type: Option<String>,
    /// Headers keyed by normalized name, sorted
    pub headers: BTreeMap<String, HeaderField>,
    /// Cookies set by this response
    pub cookies: BTreeMap<String, String>,
    /// Header block as received
    pub raw_headers: String,
    /// Body, decompressed
    pub body: Bytes,
    /// Parsed body when it looks like and parses as JSON
    pub json: Option<Value>,
    /// Structured extraction result, when queries were configured
    pub extracted: Option<Value>,
}

impl Response {
    /// Check if status is success (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if status is redirect (3xx)
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// Get body as text
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec()).map_err(|e| Error::decode(e.to_string()))
    }

    /// Get body as text, lossy conversion
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body into a typed value
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }

    /// First value of a header, looked up case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&normalize_header_name(name))
            .and_then(HeaderField::first)
    }

    /// All values of a header
    pub fn header_all(&self, name: &str) -> Vec<&str> {
        self.headers
            .get(&normalize_header_name(name))
            .map(HeaderField::values)
            .unwrap_or_default()
    }

    /// Get body length
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Summary object for printing
    pub fn to_json(&self) -> Value {
        json!({
            "status": self.status,
            "type": self.content_type,
            "headers": self.headers,
            "cookies": self.cookies,
            "headers_raw": self.raw_headers,
            "content": self.text_lossy(),
            "data": self.json,
            "extracted": self.extracted,
        })
    }
}

/// Turn raw transport output into a [`Response`]. Extraction is left to
/// the caller.
pub fn decode_response(status: u16, raw_headers: &str, raw_body: Bytes) -> Result<Response> {
    tracing::trace!(status, headers = %raw_headers, "Decoding response");

    let headers = parse_header_block(raw_headers);
    let cookies = extract_cookies(&headers);
    let content_type = headers
        .get(headers::CONTENT_TYPE)
        .and_then(HeaderField::first)
        .map(str::to_string);

    let gzipped = headers
        .get(headers::CONTENT_ENCODING)
        .and_then(HeaderField::first)
        .map(|enc| enc.trim().eq_ignore_ascii_case("gzip"))
        .unwrap_or(false);
    let body = if gzipped && !raw_body.is_empty() {
        gunzip(&raw_body)?
    } else {
        raw_body
    };

    let json = sniff_json(&body);

    Ok(Response {
        status,
        content_type,
        headers,
        cookies,
        raw_headers: raw_headers.to_string(),
        body,
        json,
        extracted: None,
    })
}

/// Parse `Name: value` lines. Lines without a colon (the status line,
/// blank lines) are skipped. Repeats with a different value accumulate.
pub fn parse_header_block(block: &str) -> BTreeMap<String, HeaderField> {
    let mut headers: BTreeMap<String, HeaderField> = BTreeMap::new();
    for line in block.split('\n') {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = normalize_header_name(name);
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        match headers.get_mut(&name) {
            Some(field) => field.push(value),
            None => {
                headers.insert(name, HeaderField::One(value));
            }
        }
    }
    headers
}

/// Name/value pairs of every `Set-Cookie` header; later ones win
pub fn extract_cookies(headers: &BTreeMap<String, HeaderField>) -> BTreeMap<String, String> {
    headers
        .get(headers::SET_COOKIE)
        .map(HeaderField::values)
        .unwrap_or_default()
        .into_iter()
        .filter_map(parse_set_cookie_pair)
        .collect()
}

/// Decompress every gzip member; concatenated members are one stream
fn gunzip(data: &[u8]) -> Result<Bytes> {
    let mut out = Vec::new();
    MultiGzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| Error::decode(format!("gzip: {}", e)))?;
    Ok(Bytes::from(out))
}

/// Parse the body as JSON when its first non-whitespace byte opens an
/// object or array. Parse failures yield `None`.
fn sniff_json(body: &[u8]) -> Option<Value> {
    let first = body.iter().find(|b| !b.is_ascii_whitespace())?;
    if *first != b'{' && *first != b'[' {
        return None;
    }
    serde_json::from_slice(body).ok()
}
