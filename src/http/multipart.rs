// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! multipart/form-data body construction

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::{BufMut, Bytes, BytesMut};
use chrono::Utc;

use super::form::FormFields;
use super::request::ResolvedFile;

const CRLF: &[u8] = b"\r\n";

/// Attempts at finding a boundary that occurs in no payload
const MAX_BOUNDARY_ATTEMPTS: usize = 8;

/// An encoded multipart body together with the boundary that frames it
#[derive(Debug, Clone)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Bytes,
}

impl MultipartBody {
    /// `Content-Type` header value announcing the boundary
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }
}

/// Generate a boundary token, unique per call within the process
pub fn generate_boundary() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "----VerkkoBoundary{:016x}{:08x}",
        nanos.rotate_left(17) ^ 0x9e37_79b9_7f4a_7c15,
        seq
    )
}

/// Build the multipart body. Field parts come first in insertion order,
/// then file parts; the body ends with the closing boundary line.
pub(crate) fn build_multipart(fields: &FormFields, files: &[ResolvedFile]) -> MultipartBody {
    build_with_boundaries(fields, files, generate_boundary)
}

fn build_with_boundaries(
    fields: &FormFields,
    files: &[ResolvedFile],
    mut next_boundary: impl FnMut() -> String,
) -> MultipartBody {
    let flat = fields.flatten(true);

    let mut boundary = next_boundary();
    for _ in 1..MAX_BOUNDARY_ATTEMPTS {
        if !collides(&boundary, &flat, files) {
            break;
        }
        tracing::warn!(%boundary, "Multipart boundary found in payload, regenerating");
        boundary = next_boundary();
    }

    let mut buf = BytesMut::new();
    for (name, value) in &flat {
        put_delimiter(&mut buf, &boundary);
        buf.put_slice(
            format!("Content-Disposition: form-data; name=\"{}\"", escape_quoted(name)).as_bytes(),
        );
        buf.put_slice(CRLF);
        buf.put_slice(CRLF);
        buf.put_slice(value.as_bytes());
        buf.put_slice(CRLF);
    }

    for file in files {
        put_delimiter(&mut buf, &boundary);
        buf.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"",
                escape_quoted(&file.field_name),
                escape_quoted(&file.file_name)
            )
            .as_bytes(),
        );
        buf.put_slice(CRLF);
        buf.put_slice(format!("Content-Type: {}", file.mime_type).as_bytes());
        buf.put_slice(CRLF);
        buf.put_slice(CRLF);
        buf.put_slice(&file.payload);
        buf.put_slice(CRLF);
    }

    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"--");
    buf.put_slice(CRLF);

    MultipartBody {
        boundary,
        body: buf.freeze(),
    }
}

fn put_delimiter(buf: &mut BytesMut, boundary: &str) {
    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(CRLF);
}

fn escape_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn collides(boundary: &str, fields: &[(String, String)], files: &[ResolvedFile]) -> bool {
    let needle = boundary.as_bytes();
    fields
        .iter()
        .any(|(k, v)| contains(k.as_bytes(), needle) || contains(v.as_bytes(), needle))
        || files.iter().any(|f| contains(&f.payload, needle))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FormValue;

    /// A parsed part: (headers, body)
    type Part = (Vec<(String, String)>, Vec<u8>);

    /// Minimal RFC 7578 reader used to check what a server would see
    fn parse_multipart(body: &[u8], boundary: &str) -> Vec<Part> {
        let delimiter = format!("--{}", boundary).into_bytes();
        let mut parts = Vec::new();
        let mut rest = body;

        assert!(rest.starts_with(&delimiter), "body must open with the boundary");
        rest = &rest[delimiter.len()..];
        loop {
            if rest.starts_with(b"--") {
                assert_eq!(&rest[2..], b"\r\n");
                break;
            }
            rest = rest.strip_prefix(b"\r\n").expect("CRLF after delimiter");

            let header_end = find(rest, b"\r\n\r\n").expect("header terminator");
            let headers = std::str::from_utf8(&rest[..header_end])
                .unwrap()
                .split("\r\n")
                .map(|line| {
                    let (k, v) = line.split_once(':').unwrap();
                    (k.trim().to_string(), v.trim().to_string())
                })
                .collect();
            rest = &rest[header_end + 4..];

            let mut closing = b"\r\n".to_vec();
            closing.extend_from_slice(&delimiter);
            let body_end = find(rest, &closing).expect("closing delimiter");
            parts.push((headers, rest[..body_end].to_vec()));
            rest = &rest[body_end + closing.len()..];
        }
        parts
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    fn field_name(part: &Part) -> String {
        let disposition = &part.0.iter().find(|(k, _)| k == "Content-Disposition").unwrap().1;
        let start = disposition.find("name=\"").unwrap() + 6;
        let end = disposition[start..].find('"').unwrap() + start;
        disposition[start..end].to_string()
    }

    #[test]
    fn test_boundaries_are_unique() {
        let a = generate_boundary();
        let b = generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("----VerkkoBoundary"));
    }

    #[test]
    fn test_fields_roundtrip_through_parser() {
        let mut fields = FormFields::new();
        fields.set("title", "Hello world");
        fields.set("tags", FormValue::list(["a", "b"]));
        fields.set("meta", FormValue::map([("lang", "fi")]));
        fields.set("none", FormValue::List(vec![]));

        let encoded = build_multipart(&fields, &[]);
        let parts = parse_multipart(&encoded.body, &encoded.boundary);

        let recovered: Vec<(String, String)> = parts
            .iter()
            .map(|p| (field_name(p), String::from_utf8(p.1.clone()).unwrap()))
            .collect();
        assert_eq!(
            recovered,
            vec![
                ("title".to_string(), "Hello world".to_string()),
                ("tags[]".to_string(), "a".to_string()),
                ("tags[]".to_string(), "b".to_string()),
                ("meta[lang]".to_string(), "fi".to_string()),
                ("none[]".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_file_parts_follow_fields() {
        let mut fields = FormFields::new();
        fields.set("caption", "cat");
        let file = ResolvedFile {
            field_name: "photo".into(),
            file_name: "cat.jpg".into(),
            mime_type: "image/jpeg".into(),
            payload: Bytes::from_static(b"\xff\xd8\xff binary\r\n--not-a-boundary"),
        };

        let encoded = build_multipart(&fields, &[file]);
        let parts = parse_multipart(&encoded.body, &encoded.boundary);

        assert_eq!(parts.len(), 2);
        assert_eq!(field_name(&parts[0]), "caption");
        assert_eq!(
            parts[1].0,
            vec![
                (
                    "Content-Disposition".to_string(),
                    "form-data; name=\"photo\"; filename=\"cat.jpg\"".to_string()
                ),
                ("Content-Type".to_string(), "image/jpeg".to_string()),
            ]
        );
        assert_eq!(parts[1].1, b"\xff\xd8\xff binary\r\n--not-a-boundary");
    }

    #[test]
    fn test_body_layout() {
        let fields: FormFields = [("a", "1")].into_iter().collect();
        let encoded = build_multipart(&fields, &[]);
        let expected = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--{b}--\r\n",
            b = encoded.boundary
        );
        assert_eq!(&encoded.body[..], expected.as_bytes());
        assert_eq!(
            encoded.content_type(),
            format!("multipart/form-data; boundary={}", encoded.boundary)
        );
    }

    #[test]
    fn test_collision_detection() {
        let fields: FormFields = [("a", "xx--BOUNDARYyy")].into_iter().collect();
        let flat = fields.flatten(true);
        assert!(collides("--BOUNDARY", &flat, &[]));
        assert!(!collides("OTHER", &flat, &[]));
    }

    #[test]
    fn test_colliding_boundary_is_regenerated() {
        let first = generate_boundary();
        let fields: FormFields = [("note", format!("see {} here", first))].into_iter().collect();
        let file = ResolvedFile {
            field_name: "doc".into(),
            file_name: "doc.txt".into(),
            mime_type: "text/plain".into(),
            payload: Bytes::from(format!("--{}--", first)),
        };

        let mut candidates = vec![first.clone(), first.clone(), generate_boundary()].into_iter();
        let encoded = build_with_boundaries(&fields, &[file], || {
            candidates.next().unwrap_or_else(generate_boundary)
        });

        assert_ne!(encoded.boundary, first);
        assert!(candidates.next().is_none());
        let parts = parse_multipart(&encoded.body, &encoded.boundary);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].1, format!("see {} here", first).into_bytes());
        assert_eq!(parts[1].1, format!("--{}--", first).into_bytes());
    }

    #[test]
    fn test_boundary_attempts_are_bounded() {
        let fields: FormFields = [("a", "XX")].into_iter().collect();
        let mut calls = 0;
        let encoded = build_with_boundaries(&fields, &[], || {
            calls += 1;
            "XX".to_string()
        });
        assert_eq!(calls, MAX_BOUNDARY_ATTEMPTS);
        assert_eq!(encoded.boundary, "XX");
    }
}
