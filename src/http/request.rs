// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Request specification and builder

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;

use super::client::{ReqwestTransport, Transport};
use super::form::{FormFields, FormValue};
use super::headers::{self, normalize_header_name, HeaderField};
use super::DEFAULT_USER_AGENT;
use crate::error::Result;
use crate::extract::QuerySpec;

/// How the request body will be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// No body; the request is sent as GET
    None,
    /// Caller-supplied raw bytes
    Raw,
    /// Form fields and/or files
    Form,
}

/// Proxy settings handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://127.0.0.1:8080`
    pub url: String,
    /// Basic auth credentials
    pub credentials: Option<(String, String)>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

/// Where the bytes of an uploaded file come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Path(PathBuf),
    InMemory(Bytes),
}

/// A file to upload as a multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field_name: String,
    pub source: FileSource,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

/// A file part with every lazily-resolved attribute filled in
#[derive(Debug, Clone)]
pub(crate) struct ResolvedFile {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub payload: Bytes,
}

impl FilePart {
    /// Upload a file read from disk at encode time
    pub fn from_path(field_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            field_name: field_name.into(),
            source: FileSource::Path(path.into()),
            file_name: None,
            mime_type: None,
        }
    }

    /// Upload an in-memory payload
    pub fn from_bytes(field_name: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            field_name: field_name.into(),
            source: FileSource::InMemory(payload.into()),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Read the payload and fill in file name and MIME type.
    ///
    /// Path-sourced files default to their base name and a type sniffed
    /// from the content (then the extension). In-memory payloads default to
    /// the field name and `application/octet-stream`.
    pub(crate) fn resolve(&self) -> Result<ResolvedFile> {
        let (payload, default_name, sniffed) = match &self.source {
            FileSource::Path(path) => {
                let payload = Bytes::from(std::fs::read(path)?);
                let sniffed = sniff_mime(path, &payload);
                (payload, base_name(path), sniffed)
            }
            FileSource::InMemory(bytes) => (bytes.clone(), self.field_name.clone(), None),
        };

        Ok(ResolvedFile {
            field_name: self.field_name.clone(),
            file_name: self.file_name.clone().unwrap_or(default_name),
            mime_type: self
                .mime_type
                .clone()
                .or(sniffed)
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            payload,
        })
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn sniff_mime(path: &Path, payload: &[u8]) -> Option<String> {
    infer::get(payload)
        .map(|kind| kind.mime_type().to_string())
        .or_else(|| mime_guess::from_path(path).first_raw().map(String::from))
}

/// Mutable description of an HTTP request.
///
/// Built with chained calls and consumed by [`RequestSpec::execute`].
///
/// ```rust,no_run
/// use verkko::RequestSpec;
///
/// # async fn run() -> verkko::Result<()> {
/// let response = RequestSpec::new("https://example.com/search")
///     .query("q", "rust")
///     .header("accept-language", "fi")
///     .xpath("//h1/trim()")
///     .execute()
///     .await?;
/// println!("{} {:?}", response.status, response.extracted);
/// # Ok(())
/// # }
/// ```
pub struct RequestSpec {
    pub(crate) url: String,
    pub(crate) query: FormFields,
    pub(crate) headers: Vec<(String, HeaderField)>,
    pub(crate) cookies: Vec<(String, String)>,
    pub(crate) raw_body: Option<Bytes>,
    pub(crate) form: FormFields,
    pub(crate) files: Vec<FilePart>,
    pub(crate) proxy: Option<ProxyConfig>,
    pub(crate) timeout: Duration,
    pub(crate) follow_redirects: bool,
    pub(crate) user_agent: String,
    pub(crate) method: Option<Method>,
    pub(crate) debug: bool,
    pub(crate) cookie_jar: Option<PathBuf>,
    pub(crate) query_spec: Option<QuerySpec>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl RequestSpec {
    /// Start a request for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: FormFields::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
            raw_body: None,
            form: FormFields::new(),
            files: Vec::new(),
            proxy: None,
            timeout: Duration::from_secs(30),
            follow_redirects: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            method: None,
            debug: false,
            cookie_jar: None,
            query_spec: None,
            transport: Arc::new(ReqwestTransport::new()),
        }
    }

    /// Replace the URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add a query parameter; it overrides one of the same name in the URL
    pub fn query(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.query.set(name, value);
        self
    }

    /// Merge several query parameters
    pub fn query_params(mut self, params: FormFields) -> Self {
        self.query.merge(params);
        self
    }

    /// Add a form field
    pub fn form(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.form.set(name, value);
        self
    }

    /// Merge several form fields on top of the existing ones
    pub fn form_fields(mut self, fields: FormFields) -> Self {
        self.form.merge(fields);
        self
    }

    /// Send these bytes verbatim as the body
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.raw_body = Some(body.into());
        self
    }

    /// Send the form fields as a JSON object
    pub fn json(self) -> Self {
        self.header(headers::CONTENT_TYPE, "application/json")
    }

    /// Set a header, replacing any previous value for the same name
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<HeaderField>) -> Self {
        let name = normalize_header_name(name.as_ref());
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Set several headers
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<HeaderField>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    /// Set a request cookie
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.cookies.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.cookies.push((name, value)),
        }
        self
    }

    /// Set several request cookies
    pub fn cookies<I, K, V>(mut self, cookies: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in cookies {
            self = self.cookie(name, value);
        }
        self
    }

    /// Route the request through a proxy
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Upload a file read from `path` under `field`
    pub fn file(mut self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.files.push(FilePart::from_path(field, path));
        self
    }

    /// Upload an in-memory payload under `field`
    pub fn file_bytes(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        self.files
            .push(FilePart::from_bytes(field, payload).file_name(file_name));
        self
    }

    /// Add a fully described file part
    pub fn file_part(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Upload a file the way an XHR upload widget does
    pub fn post_file(self, path: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        self.header(headers::X_REQUESTED_WITH, "XMLHttpRequest")
            .file(field, path)
    }

    /// Request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Follow redirects
    pub fn follow(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Log request and response summaries at info level
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Override the method implied by body presence
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Persist cookies in a JSON jar file between runs
    pub fn cookie_jar(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_jar = Some(path.into());
        self
    }

    /// Extract values from the HTML response with a single XPath query
    pub fn xpath(mut self, query: impl Into<String>) -> Self {
        self.query_spec = Some(QuerySpec::Single(query.into()));
        self
    }

    /// Extract structured values from the HTML response
    pub fn extract(mut self, spec: QuerySpec) -> Self {
        self.query_spec = Some(spec);
        self
    }

    /// Use a different transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Which cue drives body construction
    pub fn body_mode(&self) -> BodyMode {
        if self.raw_body.is_some() {
            BodyMode::Raw
        } else if !self.form.is_empty() || !self.files.is_empty() {
            BodyMode::Form
        } else {
            BodyMode::None
        }
    }

    /// Look up a header set on this request
    pub fn header_value(&self, name: &str) -> Option<&HeaderField> {
        let name = normalize_header_name(name);
        self.headers.iter().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// `Cookie` header line for the request cookies
    pub fn cookie_line(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

impl fmt::Debug for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSpec")
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("body_mode", &self.body_mode())
            .field("files", &self.files)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("query_spec", &self.query_spec)
            .finish_non_exhaustive()
    }
}
