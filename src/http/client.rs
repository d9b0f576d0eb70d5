// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Transport abstraction and the request pipeline
//!
//! `RequestSpec::execute` composes the URL, encodes the body, hands the
//! exchange to a [`Transport`], decodes the raw result and runs extraction.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use url::Url;

use super::body::{apply_body_headers, encode_body};
use super::cookie::CookieJar;
use super::headers;
use super::request::{ProxyConfig, RequestSpec};
use super::response::{decode_response, Response};
use super::url::compose_url;
use crate::error::{Error, Result};
use crate::extract::ExtractionEngine;

/// Maximum redirects followed when following is enabled
const MAX_REDIRECTS: usize = 10;

/// Everything the transport needs to perform one round trip
#[derive(Debug, Clone)]
pub struct Exchange {
    pub method: Method,
    pub url: String,
    /// Outgoing headers, `Content-Type`/`Content-Length` included
    pub headers: Vec<(String, String)>,
    /// `Cookie` header line built from the request cookies
    pub cookie_line: Option<String>,
    pub body: Option<Bytes>,
    pub proxy: Option<ProxyConfig>,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub user_agent: String,
    pub cookie_jar: Option<PathBuf>,
}

/// Undecoded transport output
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// Status line plus `Name: value` lines
    pub header_block: String,
    /// Body bytes exactly as received
    pub body: Bytes,
}

/// Performs the network exchange
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, exchange: Exchange) -> Result<RawResponse>;
}

/// A request after URL composition and body encoding, before any I/O
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub exchange: Exchange,
}

impl RequestSpec {
    /// Compose the URL and encode the body without sending anything
    pub fn prepare(&self) -> Result<PreparedRequest> {
        let url = compose_url(&self.url, &self.query)?;
        if let Some(spec) = &self.query_spec {
            spec.validate()?;
        }

        let body = encode_body(self)?;
        let method = self.method.clone().unwrap_or(if body.is_some() {
            Method::POST
        } else {
            Method::GET
        });
        let headers = apply_body_headers(&self.headers, body.as_ref());

        tracing::debug!(%method, %url, "Prepared request");

        Ok(PreparedRequest {
            exchange: Exchange {
                method,
                url,
                headers,
                cookie_line: self.cookie_line(),
                body: body.map(|b| b.bytes),
                proxy: self.proxy.clone(),
                timeout: self.timeout,
                follow_redirects: self.follow_redirects,
                user_agent: self.user_agent.clone(),
                cookie_jar: self.cookie_jar.clone(),
            },
        })
    }

    /// Send the request and decode the response. Consumes the spec.
    pub async fn execute(self) -> Result<Response> {
        let prepared = self.prepare()?;
        let started = Instant::now();
        let method = prepared.exchange.method.clone();
        let url = prepared.exchange.url.clone();

        let raw = self.transport.send(prepared.exchange).await?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if self.debug {
            tracing::info!(%method, %url, status = raw.status, elapsed_ms, "Request completed");
        } else {
            tracing::debug!(%method, %url, status = raw.status, elapsed_ms, "Request completed");
        }

        let mut response = decode_response(raw.status, &raw.header_block, raw.body)?;
        if let Some(spec) = &self.query_spec {
            response.extracted = Some(ExtractionEngine::new().extract(&response.body, spec)?);
        }
        if self.debug {
            tracing::info!(
                status = response.status,
                content_type = ?response.content_type,
                body_len = response.body_len(),
                json = response.json.is_some(),
                "Response decoded"
            );
        }
        Ok(response)
    }
}

/// reqwest-backed transport. Builds one client per exchange because proxy,
/// redirect policy and timeout are client-level settings in reqwest.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

impl ReqwestTransport {
    pub fn new() -> Self {
        Self
    }

    fn build_client(&self, exchange: &Exchange) -> Result<Client> {
        let policy = if exchange.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(&exchange.user_agent)
            .timeout(exchange.timeout)
            .redirect(policy)
            .cookie_store(false) // cookies travel in the Cookie header
            .no_gzip() // ResponseDecoder decompresses
            .no_brotli();

        if let Some(ref proxy) = exchange.proxy {
            let mut p = reqwest::Proxy::all(&proxy.url)?;
            if let Some((ref user, ref pass)) = proxy.credentials {
                p = p.basic_auth(user, pass);
            }
            builder = builder.proxy(p);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, exchange: Exchange) -> Result<RawResponse> {
        let client = self.build_client(&exchange)?;
        let url = Url::parse(&exchange.url)
            .map_err(|e| Error::malformed_url(&exchange.url, e.to_string()))?;

        let jar = exchange.cookie_jar.as_deref().and_then(|path| match CookieJar::load(path) {
            Ok(jar) => Some(jar),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable cookie jar");
                None
            }
        });

        let mut builder = client.request(exchange.method.clone(), url.clone());
        for (name, value) in &exchange.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie_line) = merged_cookie_line(jar.as_ref(), &url, exchange.cookie_line) {
            builder = builder.header(headers::COOKIE, cookie_line);
        }
        if let Some(body) = exchange.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        let mut header_block = format!(
            "{:?} {} {}\r\n",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        );
        for (name, value) in response.headers() {
            let _ = write!(
                header_block,
                "{}: {}\r\n",
                name.as_str(),
                String::from_utf8_lossy(value.as_bytes())
            );
        }
        header_block.push_str("\r\n");

        if let (Some(jar), Some(path)) = (jar, exchange.cookie_jar.as_deref()) {
            for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
                if let Ok(value) = value.to_str() {
                    jar.add_from_header(value, &final_url);
                }
            }
            if let Err(e) = jar.save(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to write cookie jar");
            }
        }

        let body = response.bytes().await?;
        Ok(RawResponse {
            status: status.as_u16(),
            header_block,
            body,
        })
    }
}

/// Jar cookies for `url` followed by the explicit request cookies, which
/// win on name collisions
fn merged_cookie_line(jar: Option<&CookieJar>, url: &Url, explicit: Option<String>) -> Option<String> {
    let Some(jar) = jar else {
        return explicit;
    };
    let explicit_names: Vec<&str> = explicit
        .as_deref()
        .map(|line| {
            line.split("; ")
                .filter_map(|pair| pair.split_once('=').map(|(k, _)| k))
                .collect()
        })
        .unwrap_or_default();

    let mut pairs: Vec<String> = jar
        .get_cookies(url)
        .into_iter()
        .filter(|c| !explicit_names.contains(&c.name.as_str()))
        .map(|c| format!("{}={}", c.name, c.value))
        .collect();
    pairs.extend(explicit);

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}
