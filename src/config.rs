// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Declarative request options
//!
//! A JSON document with one key per option, mapped onto the
//! [`RequestSpec`] builder. Unknown keys are ignored.
//!
//! ```json
//! {
//!   "url": "https://example.com/search",
//!   "get": { "q": "rust" },
//!   "headers": { "accept-language": "fi" },
//!   "xpath": { "title": "//h1/trim()" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::extract::QuerySpec;
use crate::http::{FilePart, FormFields, FormValue, HeaderField, ProxyConfig, RequestSpec};

/// Proxy given as a bare URL or with credentials
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProxyOption {
    Url(String),
    Detailed {
        url: String,
        username: Option<String>,
        password: Option<String>,
    },
}

impl From<ProxyOption> for ProxyConfig {
    fn from(option: ProxyOption) -> Self {
        match option {
            ProxyOption::Url(url) => ProxyConfig::new(url),
            ProxyOption::Detailed {
                url,
                username,
                password,
            } => {
                let proxy = ProxyConfig::new(url);
                match username {
                    Some(user) => proxy.with_credentials(user, password.unwrap_or_default()),
                    None => proxy,
                }
            }
        }
    }
}

/// One upload
#[derive(Debug, Clone, Deserialize)]
pub struct FileOption {
    pub field: String,
    pub path: PathBuf,
    /// File name sent in the part; defaults to the path's base name
    pub name: Option<String>,
    /// MIME type; sniffed from the content when absent
    pub mime: Option<String>,
}

/// Every recognised option
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub url: Option<String>,
    /// Timeout in seconds
    pub timeout: Option<u64>,
    /// Query parameters: an object, or a query string
    pub get: Option<Value>,
    /// Form fields: an object, or a urlencoded string
    pub post: Option<Value>,
    /// Raw request body
    pub raw: Option<String>,
    /// Send form fields as JSON
    pub json: bool,
    pub headers: Map<String, Value>,
    pub cookies: Map<String, Value>,
    pub proxy: Option<ProxyOption>,
    pub file: Vec<FileOption>,
    /// Extraction queries: an expression, or an object of expressions and groups
    pub xpath: Option<Value>,
    pub follow: Option<bool>,
    pub user_agent: Option<String>,
    pub debug: bool,
    pub method: Option<String>,
    pub cookie_jar: Option<PathBuf>,
}

impl RequestOptions {
    /// Parse options from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read options from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loaded request options");
        Self::from_json_str(&text)
    }

    /// Build a request from these options; `url` is required
    pub fn into_request(self) -> Result<RequestSpec> {
        let url = self
            .url
            .clone()
            .ok_or_else(|| Error::config("missing 'url' option"))?;
        self.apply(RequestSpec::new(url))
    }

    /// Apply every set option to `spec`
    pub fn apply(self, mut spec: RequestSpec) -> Result<RequestSpec> {
        if let Some(url) = self.url {
            spec = spec.url(url);
        }
        if let Some(secs) = self.timeout {
            if secs == 0 {
                return Err(Error::config("'timeout' must be at least one second"));
            }
            spec = spec.timeout(Duration::from_secs(secs));
        }
        if let Some(get) = self.get {
            spec = spec.query_params(fields_from_json("get", &get)?);
        }
        if let Some(post) = self.post {
            spec = spec.form_fields(fields_from_json("post", &post)?);
        }
        if let Some(raw) = self.raw {
            spec = spec.raw_body(raw);
        }
        if self.json {
            spec = spec.json();
        }
        for (name, value) in &self.headers {
            spec = spec.header(name, header_from_json(name, value)?);
        }
        for (name, value) in &self.cookies {
            let value = scalar_text(value).ok_or_else(|| {
                Error::config(format!("cookie '{}' must be a string or number", name))
            })?;
            spec = spec.cookie(name.clone(), value);
        }
        if let Some(proxy) = self.proxy {
            spec = spec.proxy(proxy.into());
        }
        for file in self.file {
            let mut part = FilePart::from_path(file.field, file.path);
            if let Some(name) = file.name {
                part = part.file_name(name);
            }
            if let Some(mime) = file.mime {
                part = part.mime_type(mime);
            }
            spec = spec.file_part(part);
        }
        if let Some(xpath) = self.xpath {
            spec = spec.extract(QuerySpec::from_json(&xpath)?);
        }
        if let Some(follow) = self.follow {
            spec = spec.follow(follow);
        }
        if let Some(user_agent) = self.user_agent {
            spec = spec.user_agent(user_agent);
        }
        if self.debug {
            spec = spec.debug(true);
        }
        if let Some(method) = self.method {
            let parsed = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|_| Error::config(format!("invalid method '{}'", method)))?;
            spec = spec.method(parsed);
        }
        if let Some(jar) = self.cookie_jar {
            spec = spec.cookie_jar(jar);
        }
        Ok(spec)
    }
}

fn fields_from_json(option: &str, value: &Value) -> Result<FormFields> {
    match value {
        Value::Object(object) => Ok(object
            .iter()
            .map(|(k, v)| (k.clone(), FormValue::from_json(v)))
            .collect()),
        Value::String(query) => Ok(FormFields::parse_query(query)),
        other => Err(Error::config(format!(
            "'{}' must be an object or a query string, got {}",
            option, other
        ))),
    }
}

fn header_from_json(name: &str, value: &Value) -> Result<HeaderField> {
    if let Value::Array(items) = value {
        let values = items
            .iter()
            .map(scalar_text)
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::config(format!("header '{}' has a non-scalar value", name)))?;
        return Ok(HeaderField::from(values));
    }
    scalar_text(value)
        .map(HeaderField::from)
        .ok_or_else(|| Error::config(format!("header '{}' must be a string or number", name)))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::BodyMode;

    #[test]
    fn test_full_options() {
        let options = RequestOptions::from_json_str(
            r#"{
                "url": "https://example.com/search?page=1",
                "timeout": 5,
                "get": { "q": "rust", "tags": ["a", "b"] },
                "post": { "user": "ann", "remember": true },
                "headers": { "accept-language": "fi", "x-multi": ["1", "2"] },
                "cookies": { "sid": "abc", "n": 7 },
                "proxy": { "url": "http://127.0.0.1:8080", "username": "u", "password": "p" },
                "follow": true,
                "user_agent": "verkko-test",
                "method": "put",
                "xpath": "//h1",
                "some_unknown_key": 1
            }"#,
        )
        .unwrap();
        let spec = options.into_request().unwrap();
        assert_eq!(spec.body_mode(), BodyMode::Form);
        assert_eq!(spec.cookie_line().as_deref(), Some("sid=abc; n=7"));
        assert_eq!(
            spec.header_value("Accept-Language").and_then(|h| h.first()),
            Some("fi")
        );

        let ex = spec.prepare().unwrap().exchange;
        assert_eq!(ex.method, Method::PUT);
        assert_eq!(
            ex.url,
            "https://example.com/search?page=1&q=rust&tags%5B%5D=a&tags%5B%5D=b"
        );
        assert_eq!(ex.timeout, Duration::from_secs(5));
        assert!(ex.follow_redirects);
        assert_eq!(ex.user_agent, "verkko-test");
        assert_eq!(
            ex.proxy,
            Some(ProxyConfig::new("http://127.0.0.1:8080").with_credentials("u", "p"))
        );
        assert_eq!(ex.body.as_deref(), Some(&b"user=ann&remember=1"[..]));
        let multi: Vec<_> = ex
            .headers
            .iter()
            .filter(|(k, _)| k == "X-Multi")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(multi, vec!["1", "2"]);
    }

    #[test]
    fn test_string_forms_and_json_flag() {
        let spec = RequestOptions::from_json_str(
            r#"{ "url": "http://example.com/", "post": "a=1&b[]=2", "json": true }"#,
        )
        .unwrap()
        .into_request()
        .unwrap();
        let ex = spec.prepare().unwrap().exchange;
        assert_eq!(ex.method, Method::POST);
        assert_eq!(ex.body.as_deref(), Some(&br#"{"a":"1","b":["2"]}"#[..]));
    }

    #[test]
    fn test_file_option() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let json = serde_json::json!({
            "url": "http://example.com/upload",
            "file": [{ "field": "doc", "path": path, "name": "renamed.txt", "mime": "text/plain" }]
        });
        let spec = RequestOptions::from_json_str(&json.to_string())
            .unwrap()
            .into_request()
            .unwrap();
        let ex = spec.prepare().unwrap().exchange;
        let body = String::from_utf8(ex.body.unwrap().to_vec()).unwrap();
        assert!(body.contains("name=\"doc\"; filename=\"renamed.txt\""));
        assert!(body.contains("Content-Type: text/plain\r\n\r\nhello"));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{ "url": "http://example.com/", "debug": true }"#).unwrap();
        let options = RequestOptions::from_path(&path).unwrap();
        assert_eq!(options.url.as_deref(), Some("http://example.com/"));
        assert!(options.debug);

        let missing = RequestOptions::from_path(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(missing, Error::Io(_)));
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            RequestOptions::from_json_str("{ not json").unwrap_err(),
            Error::Serialization(_)
        ));
        assert!(matches!(
            RequestOptions::default().into_request().unwrap_err(),
            Error::Config(_)
        ));

        for bad in [
            r#"{ "url": "http://x/", "timeout": 0 }"#,
            r#"{ "url": "http://x/", "get": 5 }"#,
            r#"{ "url": "http://x/", "headers": { "a": { "b": 1 } } }"#,
            r#"{ "url": "http://x/", "cookies": { "a": [1] } }"#,
            r#"{ "url": "http://x/", "method": "NOT A METHOD" }"#,
        ] {
            let err = RequestOptions::from_json_str(bad)
                .unwrap()
                .into_request()
                .unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} should fail", bad);
        }

        let err = RequestOptions::from_json_str(r#"{ "url": "http://x/", "xpath": 3 }"#)
            .unwrap()
            .into_request()
            .unwrap_err();
        assert!(matches!(err, Error::QuerySyntax(_)));
    }
}
