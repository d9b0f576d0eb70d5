// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Form values with PHP-style bracket field names
//!
//! A field is either a scalar, an ordered list (`name[]`) or a keyed map
//! (`name[key]`). Lists and maps nest arbitrarily.

use serde_json::{Map, Value};

/// A form or query field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// Plain scalar value
    Text(String),
    /// Ordered list, flattened as `name[]`
    List(Vec<FormValue>),
    /// Keyed map, flattened as `name[key]`
    Map(Vec<(String, FormValue)>),
}

impl FormValue {
    /// Build a list of scalar values
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FormValue::List(items.into_iter().map(|s| FormValue::Text(s.into())).collect())
    }

    /// Build a keyed map of scalar values
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        FormValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), FormValue::Text(v.into())))
                .collect(),
        )
    }

    /// Get the scalar value, if this is one
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value. Numbers and booleans are stringified,
    /// `null` becomes an empty string.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FormValue::Text(String::new()),
            Value::Bool(b) => FormValue::Text(if *b { "1" } else { "0" }.to_string()),
            Value::Number(n) => FormValue::Text(n.to_string()),
            Value::String(s) => FormValue::Text(s.clone()),
            Value::Array(items) => FormValue::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => FormValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert into JSON, preserving key order
    pub fn to_json(&self) -> Value {
        match self {
            FormValue::Text(s) => Value::String(s.clone()),
            FormValue::List(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            FormValue::Map(entries) => {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

impl From<&str> for FormValue {
    fn from(s: &str) -> Self {
        FormValue::Text(s.to_string())
    }
}

impl From<String> for FormValue {
    fn from(s: String) -> Self {
        FormValue::Text(s)
    }
}

impl From<Vec<String>> for FormValue {
    fn from(items: Vec<String>) -> Self {
        FormValue::List(items.into_iter().map(FormValue::Text).collect())
    }
}

impl From<Vec<&str>> for FormValue {
    fn from(items: Vec<&str>) -> Self {
        FormValue::list(items)
    }
}

/// Insertion-ordered field collection. Setting an existing name replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, FormValue)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing one with the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FormValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Merge another collection on top of this one
    pub fn merge(&mut self, other: FormFields) {
        for (name, value) in other.entries {
            self.set(name, value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into `(bracketed name, value)` pairs.
    ///
    /// With `keep_empty` an empty list or map still yields one `name[]`
    /// pair with an empty value (multipart); otherwise it is dropped
    /// (urlencoded).
    pub fn flatten(&self, keep_empty: bool) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (name, value) in &self.entries {
            flatten_into(name, value, keep_empty, &mut out);
        }
        out
    }

    /// JSON object with the fields in insertion order
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (k, v) in &self.entries {
            map.insert(k.clone(), v.to_json());
        }
        Value::Object(map)
    }

    /// Parse an urlencoded query string, rebuilding bracketed names
    /// (`a[]=1&a[]=2`, `m[k]=v`) into nested values. Later scalars win.
    pub fn parse_query(query: &str) -> Self {
        let mut fields = FormFields::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let Some((base, path)) = split_brackets(&key) else {
                fields.set(key.into_owned(), FormValue::Text(value.into_owned()));
                continue;
            };
            let slot = match fields.entries.iter().position(|(k, _)| *k == base) {
                Some(i) => &mut fields.entries[i].1,
                None => {
                    fields.entries.push((base, FormValue::List(Vec::new())));
                    let last = fields.entries.len() - 1;
                    &mut fields.entries[last].1
                }
            };
            insert_path(slot, &path, value.into_owned());
        }
        fields
    }
}

impl<K: Into<String>, V: Into<FormValue>> FromIterator<(K, V)> for FormFields {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut fields = FormFields::new();
        for (k, v) in iter {
            fields.set(k, v);
        }
        fields
    }
}

fn flatten_into(name: &str, value: &FormValue, keep_empty: bool, out: &mut Vec<(String, String)>) {
    match value {
        FormValue::Text(s) => out.push((name.to_string(), s.clone())),
        FormValue::List(items) => {
            if items.is_empty() && keep_empty {
                out.push((format!("{}[]", name), String::new()));
            }
            for item in items {
                flatten_into(&format!("{}[]", name), item, keep_empty, out);
            }
        }
        FormValue::Map(entries) => {
            if entries.is_empty() && keep_empty {
                out.push((format!("{}[]", name), String::new()));
            }
            for (key, item) in entries {
                flatten_into(&format!("{}[{}]", name, key), item, keep_empty, out);
            }
        }
    }
}

/// Split `a[b][]` into `("a", ["b", ""])`. Returns `None` for plain names
/// or names whose brackets are unbalanced.
fn split_brackets(key: &str) -> Option<(String, Vec<String>)> {
    let open = key.find('[')?;
    if open == 0 {
        return None;
    }
    let base = key[..open].to_string();
    let mut path = Vec::new();
    let mut rest = &key[open..];
    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']')?;
        path.push(stripped[..close].to_string());
        rest = &stripped[close + 1..];
    }
    if !rest.is_empty() {
        return None;
    }
    Some((base, path))
}

fn insert_path(slot: &mut FormValue, path: &[String], value: String) {
    let Some((segment, rest)) = path.split_first() else {
        *slot = FormValue::Text(value);
        return;
    };

    if segment.is_empty() {
        if !matches!(slot, FormValue::List(_)) {
            *slot = FormValue::List(Vec::new());
        }
        if let FormValue::List(items) = slot {
            let mut child = FormValue::List(Vec::new());
            insert_path(&mut child, rest, value);
            items.push(child);
        }
        return;
    }

    // keyed segment
    if !matches!(slot, FormValue::Map(_)) {
        *slot = FormValue::Map(Vec::new());
    }
    if let FormValue::Map(entries) = slot {
        let index = match entries.iter().position(|(k, _)| k == segment) {
            Some(i) => i,
            None => {
                entries.push((segment.clone(), FormValue::List(Vec::new())));
                entries.len() - 1
            }
        };
        insert_path(&mut entries[index].1, rest, value);
    }
}
