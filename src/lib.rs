// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! # Verkko - HTTP Request Builder
//!
//! A fluent HTTP request builder that returns normalized, structured
//! responses. Bodies are encoded from form fields, JSON or file uploads;
//! responses come back with normalized headers, cookies, decompressed
//! content, sniffed JSON and optional XPath extraction from HTML.
//!
//! ## Features
//!
//! - Query merging: extra parameters override those already in the URL
//! - Body encoding: urlencoded, JSON, multipart with file parts, raw bytes
//! - Bracketed array fields: `tags[]=a`, `user[name]=b`
//! - Response decoding: multi-valued headers, cookies, gzip, JSON sniffing
//! - Extraction: XPath lists, keyed queries and row groups over HTML
//! - Cookie jar files shared across runs
//! - Declarative options loaded from JSON
//!
//! ## Example
//!
//! ```rust,no_run
//! use verkko::RequestSpec;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let response = RequestSpec::new("https://example.com/login")
//!         .form("user", "ann")
//!         .form("tags", vec!["a", "b"])
//!         .cookie("lang", "fi")
//!         .xpath("//h1/trim()")
//!         .execute()
//!         .await?;
//!
//!     println!("{} {:?}", response.status, response.cookies);
//!     println!("{:?}", response.extracted);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod extract;
pub mod http;

// Re-exports for convenience

// Errors
pub use error::{Error, Result};

// Request building and sending
pub use http::{
    BodyMode, FilePart, FileSource, FormFields, FormValue, HeaderField, ProxyConfig, RequestSpec,
};

// Transport
pub use http::{Exchange, PreparedRequest, RawResponse, ReqwestTransport, Transport};

// Responses
pub use http::{Cookie, CookieJar, Response};

// Extraction
pub use extract::{ExtractionEngine, QueryEntry, QueryGroup, QuerySpec};

// DOM
pub use dom::{parse_html, Document, XPath, XPathMatch};

// Configuration
pub use config::RequestOptions;
