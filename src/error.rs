// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for verkko
//!
//! JSON bodies that fail to parse and queries that match nothing are not
//! errors; they surface as `None` / empty results on the response.

use thiserror::Error;

/// Result type alias for verkko operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    /// Base URL could not be split into scheme/host/path components
    #[error("Malformed URL '{url}': {reason}")]
    MalformedUrl { url: String, reason: String },

    /// Network, timeout or TLS failure reported by the transport
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Network failure reported by a custom [`Transport`](crate::http::Transport)
    #[error("Transport error: {message}")]
    TransportFailure { message: String, timeout: bool },

    /// Response body could not be decompressed
    #[error("Decode error: {0}")]
    Decode(String),

    /// Extraction query specification has an unsupported shape
    #[error("Invalid query specification: {0}")]
    QuerySyntax(String),

    /// XPath expression could not be parsed
    #[error("Invalid XPath '{expr}': {reason}")]
    XPath { expr: String, reason: String },

    /// I/O error (upload payloads, cookie jars, option files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a malformed URL error
    pub fn malformed_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport failure for transports not backed by reqwest
    pub fn transport<S: Into<String>>(msg: S) -> Self {
        Error::TransportFailure {
            message: msg.into(),
            timeout: false,
        }
    }

    /// Create a transport failure caused by the request timeout
    pub fn transport_timeout<S: Into<String>>(msg: S) -> Self {
        Error::TransportFailure {
            message: msg.into(),
            timeout: true,
        }
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a query specification error
    pub fn query_syntax<S: Into<String>>(msg: S) -> Self {
        Error::QuerySyntax(msg.into())
    }

    /// Create an XPath parse error
    pub fn xpath(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::XPath {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Check if the transport gave up because of the configured timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout(),
            Error::TransportFailure { timeout, .. } => *timeout,
            _ => false,
        }
    }

    /// Check if this error came from the network layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::TransportFailure { .. })
    }

    /// Check if the error was raised before any network I/O happened
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Error::MalformedUrl { .. } | Error::QuerySyntax(_) | Error::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_url_error() {
        let err = Error::malformed_url("not a url", "relative URL without a base");
        assert!(err.is_pre_flight());
        assert!(!err.is_transport());
        assert_eq!(
            err.to_string(),
            "Malformed URL 'not a url': relative URL without a base"
        );
    }

    #[test]
    fn test_decode_error() {
        let err = Error::decode("invalid gzip header");
        assert!(!err.is_timeout());
        assert!(!err.is_pre_flight());
        assert!(err.to_string().contains("invalid gzip header"));
    }

    #[test]
    fn test_custom_transport_failures() {
        let refused = Error::transport("connection refused");
        assert!(refused.is_transport());
        assert!(!refused.is_timeout());
        assert!(!refused.is_pre_flight());
        assert_eq!(refused.to_string(), "Transport error: connection refused");

        let slow = Error::transport_timeout("no reply within 30s");
        assert!(slow.is_transport());
        assert!(slow.is_timeout());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.txt");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
