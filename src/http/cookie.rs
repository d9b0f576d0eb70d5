// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Cookie parsing and a file-backed cookie jar

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Name and value of a `Set-Cookie` header: the text before the first `;`,
/// split on the first `=`
pub fn parse_set_cookie_pair(header: &str) -> Option<(String, String)> {
    let first = header.split(';').next()?;
    let (name, value) = first.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}

/// A single stored cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain the cookie belongs to
    pub domain: String,
    /// Path the cookie is valid for
    pub path: String,
    /// Expiration time (None = session cookie)
    pub expires: Option<DateTime<Utc>>,
    /// HTTPS only
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Create a new cookie
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: String::new(),
            path: "/".to_string(),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Set the domain
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Check if the cookie is expired
    pub fn is_expired(&self) -> bool {
        self.expires.map_or(false, |exp| exp < Utc::now())
    }

    /// Check if the cookie should be sent to the given URL
    pub fn matches(&self, url: &Url) -> bool {
        let host = url.host_str().unwrap_or("");
        if !self.domain_matches(host) {
            return false;
        }
        if !url.path().starts_with(&self.path) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        !self.is_expired()
    }

    fn domain_matches(&self, host: &str) -> bool {
        if self.domain.is_empty() {
            return true;
        }
        let domain = self.domain.trim_start_matches('.');
        host == domain || host.ends_with(&format!(".{}", domain))
    }

    /// Parse a full Set-Cookie header value, attributes included
    pub fn parse(header: &str, url: &Url) -> Option<Self> {
        let (name, value) = parse_set_cookie_pair(header)?;
        let mut cookie = Cookie::new(name, value);
        cookie.domain = url.host_str().unwrap_or("").to_string();

        for part in header.split(';').skip(1) {
            let part = part.trim();
            if let Some((attr, val)) = part.split_once('=') {
                let val = val.trim();
                match attr.trim().to_lowercase().as_str() {
                    "domain" => cookie.domain = val.trim_start_matches('.').to_string(),
                    "path" => cookie.path = val.to_string(),
                    "expires" => {
                        if let Ok(dt) = DateTime::parse_from_rfc2822(val) {
                            cookie.expires = Some(dt.with_timezone(&Utc));
                        }
                    }
                    "max-age" => {
                        if let Ok(secs) = val.parse::<i64>() {
                            cookie.expires = Some(Utc::now() + chrono::Duration::seconds(secs));
                        }
                    }
                    _ => {}
                }
            } else {
                match part.to_lowercase().as_str() {
                    "secure" => cookie.secure = true,
                    "httponly" => cookie.http_only = true,
                    _ => {}
                }
            }
        }

        Some(cookie)
    }
}

/// Thread-safe cookie storage, keyed by domain
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    cookies: Arc<DashMap<String, Vec<Cookie>>>,
}

impl CookieJar {
    /// Create a new empty cookie jar
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cookie, replacing one with the same name and path
    pub fn add(&self, cookie: Cookie) {
        let mut entry = self.cookies.entry(cookie.domain.clone()).or_default();
        entry.retain(|c| c.name != cookie.name || c.path != cookie.path);
        entry.push(cookie);
    }

    /// Record a Set-Cookie header received from `url`
    pub fn add_from_header(&self, header: &str, url: &Url) {
        if let Some(cookie) = Cookie::parse(header, url) {
            self.add(cookie);
        }
    }

    /// Unexpired cookies that apply to `url`
    pub fn get_cookies(&self, url: &Url) -> Vec<Cookie> {
        self.cookies
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|c| c.matches(url))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Get total cookie count
    pub fn len(&self) -> usize {
        self.cookies.iter().map(|e| e.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export unexpired cookies as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        let all: Vec<Cookie> = self
            .cookies
            .iter()
            .flat_map(|e| e.value().clone())
            .filter(|c| !c.is_expired())
            .collect();
        serde_json::to_string_pretty(&all)
    }

    /// Import cookies from JSON
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let cookies: Vec<Cookie> = serde_json::from_str(json)?;
        let jar = CookieJar::new();
        for cookie in cookies {
            jar.add(cookie);
        }
        Ok(jar)
    }

    /// Load a jar file; a missing file gives an empty jar
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(Self::from_json(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the jar to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_cookie_pair() {
        assert_eq!(
            parse_set_cookie_pair("a=1; Path=/"),
            Some(("a".to_string(), "1".to_string()))
        );
        assert_eq!(
            parse_set_cookie_pair("token=abc=def; HttpOnly"),
            Some(("token".to_string(), "abc=def".to_string()))
        );
        assert_eq!(
            parse_set_cookie_pair("empty=; Path=/"),
            Some(("empty".to_string(), String::new()))
        );
        assert_eq!(parse_set_cookie_pair("novalue; Path=/"), None);
    }

    #[test]
    fn test_cookie_parsing() {
        let url = Url::parse("https://example.com/path").unwrap();
        let header = "session=abc123; Domain=example.com; Path=/; Secure; HttpOnly";
        let cookie = Cookie::parse(header, &url).unwrap();

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain, "example.com");
        assert!(cookie.secure);
        assert!(cookie.http_only);
    }

    #[test]
    fn test_cookie_jar_matching() {
        let jar = CookieJar::new();
        let url = Url::parse("https://app.example.com/account").unwrap();

        jar.add(Cookie::new("a", "1").domain("example.com"));
        jar.add(Cookie::new("b", "2").domain("other.com"));
        jar.add(Cookie::new("a", "3").domain("example.com"));

        let cookies = jar.get_cookies(&url);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].value, "3");
    }

    #[test]
    fn test_expired_cookie_not_sent() {
        let jar = CookieJar::new();
        let url = Url::parse("http://example.com/").unwrap();
        jar.add_from_header("gone=1; Max-Age=-10", &url);
        assert_eq!(jar.len(), 1);
        assert!(jar.get_cookies(&url).is_empty());
    }

    #[test]
    fn test_jar_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jar.json");

        assert!(CookieJar::load(&path).unwrap().is_empty());

        let jar = CookieJar::new();
        jar.add(Cookie::new("sid", "xyz").domain("example.com"));
        jar.save(&path).unwrap();

        let loaded = CookieJar::load(&path).unwrap();
        let url = Url::parse("http://example.com/").unwrap();
        assert_eq!(loaded.get_cookies(&url)[0].value, "xyz");
    }
}
