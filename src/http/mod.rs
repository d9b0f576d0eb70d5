// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTTP layer
//!
//! Request description, body encoding, the transport seam and response
//! decoding. A request is described with [`RequestSpec`], validated and
//! encoded by [`RequestSpec::prepare`] and sent through a [`Transport`].

mod body;
mod client;
mod cookie;
mod form;
pub mod headers;
mod multipart;
mod request;
mod response;
mod url;

pub use body::{apply_body_headers, encode_body, EncodedBody};
pub use client::{Exchange, PreparedRequest, RawResponse, ReqwestTransport, Transport};
pub use cookie::{parse_set_cookie_pair, Cookie, CookieJar};
pub use form::{FormFields, FormValue};
pub use headers::HeaderField;
pub use multipart::{generate_boundary, MultipartBody};
pub use request::{BodyMode, FilePart, FileSource, ProxyConfig, RequestSpec};
pub use response::{decode_response, extract_cookies, parse_header_block, Response};
pub use url::{compose_url, encode_query};

/// Default user agent string
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
