// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Structured extraction from HTML bodies
//!
//! A [`QuerySpec`] is evaluated against the parsed body and produces a JSON
//! value of the same shape: a list for a single expression, an object of
//! lists for keyed expressions, and lists of row objects for groups.
//!
//! Markup problems and expressions that match nothing never fail; only a
//! malformed spec does.

mod query;

use serde_json::{Map, Value};

use crate::dom::{parse_html_bytes, Document, XPathMatch};
use crate::error::Result;

pub use query::{rewrite_aliases, OutputMode, QueryEntry, QueryGroup, QuerySpec};

/// Evaluates query specs against HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractionEngine;

impl ExtractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parse `body` and evaluate `spec` against it
    pub fn extract(&self, body: &[u8], spec: &QuerySpec) -> Result<Value> {
        spec.validate()?;
        if spec.is_empty() || body.iter().all(u8::is_ascii_whitespace) {
            return Ok(spec.empty_shape());
        }

        let doc = parse_html_bytes(body);
        Ok(self.extract_document(&doc, spec))
    }

    /// Evaluate an already validated spec against a parsed document
    pub fn extract_document(&self, doc: &Document, spec: &QuerySpec) -> Value {
        match spec {
            QuerySpec::Single(expr) => Value::Array(self.values(doc, expr)),
            QuerySpec::Keyed(entries) => {
                let mut out = Map::new();
                for (key, entry) in entries {
                    out.insert(key.clone(), self.entry(doc, "", entry));
                }
                Value::Object(out)
            }
        }
    }

    fn entry(&self, doc: &Document, prefix: &str, entry: &QueryEntry) -> Value {
        match entry {
            QueryEntry::Path(expr) => {
                Value::Array(self.values(doc, &format!("{}{}", prefix, expr)))
            }
            QueryEntry::Group(group) => Value::Array(self.rows(doc, prefix, group)),
        }
    }

    /// Evaluate a group into one row per root match
    fn rows(&self, doc: &Document, prefix: &str, group: &QueryGroup) -> Vec<Value> {
        let root = format!("{}{}", prefix, group.root);
        let (root_xpath, _) = rewrite_aliases(&root);
        let count = self.matches(doc, &root_xpath).map_or(0, |m| m.len());
        tracing::debug!(root = %root, rows = count, "Evaluating query group");

        let columns: Vec<(&str, Vec<Value>)> = group
            .fields
            .iter()
            .map(|(key, entry)| {
                let column = match self.entry(doc, &root, entry) {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                (key.as_str(), column)
            })
            .collect();

        (0..count)
            .map(|i| {
                let cell = |column: &[Value]| column.get(i).cloned().unwrap_or(Value::Null);
                if let [(_, column)] = columns.as_slice() {
                    return cell(column);
                }
                let mut row = Map::new();
                for (key, column) in &columns {
                    row.insert(key.to_string(), cell(column));
                }
                Value::Object(row)
            })
            .collect()
    }

    fn matches(&self, doc: &Document, expr: &str) -> Option<Vec<XPathMatch>> {
        match doc.xpath(expr) {
            Ok(matches) => Some(matches),
            Err(e) => {
                tracing::warn!(expr = %expr, error = %e, "Skipping query that failed to parse");
                None
            }
        }
    }

    /// Values of one expression, aliases resolved
    fn values(&self, doc: &Document, expr: &str) -> Vec<Value> {
        let (xpath, mode) = rewrite_aliases(expr);
        let Some(matches) = self.matches(doc, &xpath) else {
            return Vec::new();
        };
        matches
            .iter()
            .map(|m| {
                Value::String(match mode {
                    OutputMode::Text => m.text(),
                    OutputMode::Html => m.html(),
                    OutputMode::Trim => m.text().trim().to_string(),
                })
            })
            .collect()
    }
}
