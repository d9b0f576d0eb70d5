// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Declarative extraction queries

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// What to extract from an HTML body
#[derive(Debug, Clone, PartialEq)]
pub enum QuerySpec {
    /// One expression; the result is a list of values
    Single(String),
    /// Named entries; the result is an object with the same keys
    Keyed(Vec<(String, QueryEntry)>),
}

/// One named entry of a keyed spec
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEntry {
    /// Plain expression yielding a list of values
    Path(String),
    /// Root expression plus sub-queries, transposed into rows
    Group(QueryGroup),
}

/// Row extraction: `root` selects N nodes and every field is evaluated as
/// `root + field`, giving N row objects
#[derive(Debug, Clone, PartialEq)]
pub struct QueryGroup {
    pub root: String,
    pub fields: Vec<(String, QueryEntry)>,
}

impl QueryGroup {
    pub fn new(root: impl Into<String>, fields: Vec<(String, QueryEntry)>) -> Self {
        Self {
            root: root.into(),
            fields,
        }
    }

    /// Add a field
    pub fn field(mut self, key: impl Into<String>, entry: impl Into<QueryEntry>) -> Self {
        self.fields.push((key.into(), entry.into()));
        self
    }

    fn validate(&self, key: &str) -> Result<()> {
        if self.root.trim().is_empty() {
            return Err(Error::query_syntax(format!(
                "group '{}' has an empty root expression",
                key
            )));
        }
        if self.fields.is_empty() {
            return Err(Error::query_syntax(format!("group '{}' has no fields", key)));
        }
        validate_entries(&self.fields)
    }
}

impl From<&str> for QueryEntry {
    fn from(expr: &str) -> Self {
        QueryEntry::Path(expr.to_string())
    }
}

impl From<String> for QueryEntry {
    fn from(expr: String) -> Self {
        QueryEntry::Path(expr)
    }
}

impl From<QueryGroup> for QueryEntry {
    fn from(group: QueryGroup) -> Self {
        QueryEntry::Group(group)
    }
}

impl From<&str> for QuerySpec {
    fn from(expr: &str) -> Self {
        QuerySpec::Single(expr.to_string())
    }
}

fn validate_entries(entries: &[(String, QueryEntry)]) -> Result<()> {
    let mut seen = HashSet::new();
    for (key, entry) in entries {
        if key.is_empty() {
            return Err(Error::query_syntax("query key must not be empty"));
        }
        if !seen.insert(key.as_str()) {
            return Err(Error::query_syntax(format!("duplicate query key '{}'", key)));
        }
        if let QueryEntry::Group(group) = entry {
            group.validate(key)?;
        }
    }
    Ok(())
}

fn entries_from_json(object: &Map<String, Value>) -> Result<Vec<(String, QueryEntry)>> {
    object
        .iter()
        .map(|(key, value)| Ok((key.clone(), entry_from_json(key, value)?)))
        .collect()
}

fn entry_from_json(key: &str, value: &Value) -> Result<QueryEntry> {
    match value {
        Value::String(expr) => Ok(QueryEntry::Path(expr.clone())),
        Value::Object(object) => {
            let root = object.get("root").and_then(Value::as_str).ok_or_else(|| {
                Error::query_syntax(format!("group '{}' needs a string 'root'", key))
            })?;
            let fields = object
                .get("fields")
                .and_then(Value::as_object)
                .ok_or_else(|| {
                    Error::query_syntax(format!("group '{}' needs an object 'fields'", key))
                })?;
            Ok(QueryEntry::Group(QueryGroup::new(
                root,
                entries_from_json(fields)?,
            )))
        }
        other => Err(Error::query_syntax(format!(
            "unsupported query value for '{}': {}",
            key, other
        ))),
    }
}

impl QuerySpec {
    /// Build a keyed spec
    pub fn keyed<K: Into<String>, E: Into<QueryEntry>>(
        entries: impl IntoIterator<Item = (K, E)>,
    ) -> Self {
        QuerySpec::Keyed(
            entries
                .into_iter()
                .map(|(k, e)| (k.into(), e.into()))
                .collect(),
        )
    }

    /// Parse the JSON form: a string, or an object whose values are strings
    /// or `{"root": .., "fields": {..}}` groups
    pub fn from_json(value: &Value) -> Result<Self> {
        let spec = match value {
            Value::String(expr) => QuerySpec::Single(expr.clone()),
            Value::Object(object) => QuerySpec::Keyed(entries_from_json(object)?),
            other => {
                return Err(Error::query_syntax(format!(
                    "query spec must be a string or an object, got {}",
                    other
                )))
            }
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Check the shape before any HTML is touched
    pub fn validate(&self) -> Result<()> {
        match self {
            QuerySpec::Single(_) => Ok(()),
            QuerySpec::Keyed(entries) => validate_entries(entries),
        }
    }

    /// True when there is nothing to evaluate
    pub fn is_empty(&self) -> bool {
        match self {
            QuerySpec::Single(expr) => expr.trim().is_empty(),
            QuerySpec::Keyed(entries) => entries.is_empty(),
        }
    }

    /// Result with the spec's keys and no values
    pub fn empty_shape(&self) -> Value {
        match self {
            QuerySpec::Single(_) => Value::Array(Vec::new()),
            QuerySpec::Keyed(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, _)| (k.clone(), Value::Array(Vec::new())))
                    .collect(),
            ),
        }
    }
}

/// How a matched node is turned into a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Text value
    Text,
    /// Serialized markup, from a trailing `/html()`
    Html,
    /// Text value without surrounding whitespace, from a trailing `/trim()`
    Trim,
}

lazy_static! {
    static ref TOKEN_MATCH: Option<Regex> =
        Regex::new(r#"@([A-Za-z_][\w:.-]*)\s*~=\s*(?:"([^"]*)"|'([^']*)')"#).ok();
}

/// Resolve the library aliases into plain XPath plus an output mode
pub fn rewrite_aliases(expr: &str) -> (String, OutputMode) {
    let trimmed = expr.trim();
    let (body, mode) = if let Some(rest) = trimmed.strip_suffix("/html()") {
        (rest, OutputMode::Html)
    } else if let Some(rest) = trimmed.strip_suffix("/trim()") {
        (rest, OutputMode::Trim)
    } else {
        (trimmed, OutputMode::Text)
    };

    let Some(token_match) = TOKEN_MATCH.as_ref() else {
        return (body.to_string(), mode);
    };
    let rewritten = token_match.replace_all(body, |caps: &regex::Captures<'_>| {
        let attr = &caps[1];
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        format!(
            "contains(concat(' ', @{}, ' '), {})",
            attr,
            quote(&format!(" {} ", value))
        )
    });

    (rewritten.into_owned(), mode)
}

fn quote(s: &str) -> String {
    if s.contains('\'') {
        format!("\"{}\"", s)
    } else {
        format!("'{}'", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rewrite_suffixes() {
        assert_eq!(
            rewrite_aliases("//div/html()"),
            ("//div".to_string(), OutputMode::Html)
        );
        assert_eq!(
            rewrite_aliases(" //h1/trim() "),
            ("//h1".to_string(), OutputMode::Trim)
        );
        assert_eq!(
            rewrite_aliases("//h1"),
            ("//h1".to_string(), OutputMode::Text)
        );
    }

    #[test]
    fn test_rewrite_token_match() {
        let (expr, mode) = rewrite_aliases(r#"//li[@class~="x"]"#);
        assert_eq!(expr, "//li[contains(concat(' ', @class, ' '), ' x ')]");
        assert_eq!(mode, OutputMode::Text);

        let (expr, _) = rewrite_aliases("//a[@rel ~= 'next']/html()");
        assert_eq!(expr, "//a[contains(concat(' ', @rel, ' '), ' next ')]");

        let (expr, _) = rewrite_aliases(r#"//p[@title~="it's"]"#);
        assert_eq!(expr, r#"//p[contains(concat(' ', @title, ' '), " it's ")]"#);
    }

    #[test]
    fn test_from_json() {
        let spec = QuerySpec::from_json(&json!({
            "title": "//h1",
            "rows": { "root": "//tr", "fields": { "name": "/td[1]", "age": "/td[2]" } }
        }))
        .unwrap();

        let QuerySpec::Keyed(entries) = spec else {
            panic!("expected keyed spec");
        };
        assert_eq!(entries[0], ("title".to_string(), QueryEntry::Path("//h1".into())));
        match &entries[1].1 {
            QueryEntry::Group(group) => {
                assert_eq!(group.root, "//tr");
                assert_eq!(group.fields.len(), 2);
                assert_eq!(group.fields[0].0, "name");
            }
            other => panic!("expected group, got {:?}", other),
        }

        assert_eq!(
            QuerySpec::from_json(&json!("//a")).unwrap(),
            QuerySpec::Single("//a".to_string())
        );
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        for bad in [
            json!(42),
            json!({ "a": 1 }),
            json!({ "a": { "fields": { "x": "/b" } } }),
            json!({ "a": { "root": "//tr" } }),
            json!({ "a": { "root": "//tr", "fields": {} } }),
        ] {
            let err = QuerySpec::from_json(&bad).unwrap_err();
            assert!(matches!(err, Error::QuerySyntax(_)), "{} should fail", bad);
        }
    }

    #[test]
    fn test_validate() {
        assert!(QuerySpec::keyed([("a", "//a"), ("b", "//b")]).validate().is_ok());
        assert!(QuerySpec::keyed([("", "//a")]).validate().is_err());
        assert!(QuerySpec::keyed([("a", "//a"), ("a", "//b")]).validate().is_err());

        let nested_empty = QueryGroup::new("//tr", vec![])
            .field("inner", QueryGroup::new("/td", vec![]));
        assert!(QuerySpec::keyed([("rows", nested_empty)]).validate().is_err());
    }

    #[test]
    fn test_empty_shape() {
        assert_eq!(QuerySpec::Single(String::new()).empty_shape(), json!([]));
        let spec = QuerySpec::keyed([
            ("a", QueryEntry::from("//a")),
            ("rows", QueryGroup::new("//tr", vec![]).field("c", "/td").into()),
        ]);
        assert_eq!(spec.empty_shape(), json!({ "a": [], "rows": [] }));
        assert!(QuerySpec::Keyed(vec![]).is_empty());
        assert!(!spec.is_empty());
    }
}
