// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request body encoding
//!
//! Precedence: a raw body wins over form data. For form data, uploaded
//! files force multipart; otherwise an explicit `Content-Type` picks JSON
//! or multipart, and everything else is urlencoded.

use bytes::Bytes;

use super::headers::{self, is_media_type, HeaderField};
use super::multipart::build_multipart;
use super::request::{BodyMode, RequestSpec, ResolvedFile};
use super::url::encode_query;
use crate::error::Result;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";
const APPLICATION_JSON: &str = "application/json";

/// Wire-ready body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub bytes: Bytes,
    pub content_type: String,
    pub content_length: usize,
}

impl EncodedBody {
    fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: bytes.len(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Encode the body described by `spec`, or `None` when there is nothing to
/// send. File payloads are read here.
pub fn encode_body(spec: &RequestSpec) -> Result<Option<EncodedBody>> {
    let explicit_type = spec
        .header_value(headers::CONTENT_TYPE)
        .and_then(HeaderField::first)
        .map(str::to_string);

    let encoded = match spec.body_mode() {
        BodyMode::None => return Ok(None),
        BodyMode::Raw => {
            let raw = spec.raw_body.clone().unwrap_or_default();
            EncodedBody::new(raw, explicit_type.unwrap_or_else(|| "text/plain".to_string()))
        }
        BodyMode::Form => {
            let wants = |media: &str| {
                explicit_type
                    .as_deref()
                    .map(|t| is_media_type(t, media))
                    .unwrap_or(false)
            };

            if !spec.files.is_empty() || wants(MULTIPART_FORM_DATA) {
                let files = spec
                    .files
                    .iter()
                    .map(|f| f.resolve())
                    .collect::<Result<Vec<ResolvedFile>>>()?;
                let multipart = build_multipart(&spec.form, &files);
                EncodedBody::new(multipart.body.clone(), multipart.content_type())
            } else if wants(APPLICATION_JSON) {
                let json = serde_json::to_vec(&spec.form.to_json())?;
                EncodedBody::new(json, explicit_type.unwrap_or_default())
            } else {
                EncodedBody::new(
                    encode_query(&spec.form),
                    explicit_type.unwrap_or_else(|| FORM_URLENCODED.to_string()),
                )
            }
        }
    };

    tracing::debug!(
        content_type = %encoded.content_type,
        content_length = encoded.content_length,
        "Encoded request body"
    );
    Ok(Some(encoded))
}

/// Outgoing header list with the body's `Content-Type` and exact
/// `Content-Length` injected, overriding caller-supplied values
pub fn apply_body_headers(
    headers: &[(String, HeaderField)],
    body: Option<&EncodedBody>,
) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| {
            body.is_none() || (name != headers::CONTENT_TYPE && name != headers::CONTENT_LENGTH)
        })
        .flat_map(|(name, value)| {
            value
                .values()
                .into_iter()
                .map(move |v| (name.clone(), v.to_string()))
        })
        .collect();

    if let Some(body) = body {
        out.push((headers::CONTENT_TYPE.to_string(), body.content_type.clone()));
        out.push((
            headers::CONTENT_LENGTH.to_string(),
            body.content_length.to_string(),
        ));
    }
    out
}
