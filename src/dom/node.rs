// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM Node types

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Shared node storage of a document
pub(crate) type NodeStore = Arc<RwLock<HashMap<NodeId, NodeData>>>;

/// Unique node identifier. Ids are handed out in creation order, which the
/// parser makes equal to document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Create a new unique node ID
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
    DocumentType,
}

/// Internal node data
#[derive(Debug)]
pub struct NodeData {
    pub node_type: NodeType,
    /// Tag name (for elements), lowercase
    pub tag_name: Option<String>,
    /// Text content (for text/comment nodes)
    pub text_content: Option<String>,
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl NodeData {
    fn with_type(node_type: NodeType) -> Self {
        Self {
            node_type,
            tag_name: None,
            text_content: None,
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    /// Create a new element node data
    pub fn element(tag_name: impl Into<String>) -> Self {
        let mut data = Self::with_type(NodeType::Element);
        data.tag_name = Some(tag_name.into().to_lowercase());
        data
    }

    /// Create a new text node data
    pub fn text(content: impl Into<String>) -> Self {
        let mut data = Self::with_type(NodeType::Text);
        data.text_content = Some(content.into());
        data
    }

    /// Create a new comment node data
    pub fn comment(content: impl Into<String>) -> Self {
        let mut data = Self::with_type(NodeType::Comment);
        data.text_content = Some(content.into());
        data
    }

    pub fn doctype() -> Self {
        Self::with_type(NodeType::DocumentType)
    }

    /// Create a new document node data
    pub fn document() -> Self {
        Self::with_type(NodeType::Document)
    }
}

/// Concatenated text of all descendant text nodes, or the node's own text
/// for text and comment nodes
pub(crate) fn string_value(nodes: &HashMap<NodeId, NodeData>, id: NodeId) -> String {
    let mut out = String::new();
    match nodes.get(&id) {
        Some(node) if matches!(node.node_type, NodeType::Text | NodeType::Comment) => {
            out.push_str(node.text_content.as_deref().unwrap_or(""));
        }
        Some(_) => collect_text(nodes, id, &mut out),
        None => {}
    }
    out
}

fn collect_text(nodes: &HashMap<NodeId, NodeData>, id: NodeId, out: &mut String) {
    let mut stack = vec![id];
    while let Some(id) = stack.pop() {
        let Some(node) = nodes.get(&id) else {
            continue;
        };
        match node.node_type {
            NodeType::Text => out.push_str(node.text_content.as_deref().unwrap_or("")),
            NodeType::Element | NodeType::Document => {
                stack.extend(node.children.iter().rev().copied());
            }
            _ => {}
        }
    }
}

/// Pending serializer work: a subtree to open, or an end tag to write
enum Emit<'a> {
    Node(NodeId),
    Close(&'a str),
}

/// Serialize a node to HTML
pub(crate) fn serialize(nodes: &HashMap<NodeId, NodeData>, id: NodeId, out: &mut String) {
    let mut stack = vec![Emit::Node(id)];
    while let Some(item) = stack.pop() {
        match item {
            Emit::Close(tag) => {
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            Emit::Node(id) => {
                if let Some(node) = nodes.get(&id) {
                    serialize_open(nodes, node, out, &mut stack);
                }
            }
        }
    }
}

/// Write the node's own markup and queue its children and end tag
fn serialize_open<'a>(
    nodes: &'a HashMap<NodeId, NodeData>,
    node: &'a NodeData,
    out: &mut String,
    stack: &mut Vec<Emit<'a>>,
) {
    match node.node_type {
        NodeType::Text => {
            let text = node.text_content.as_deref().unwrap_or("");
            let raw = node
                .parent
                .and_then(|p| nodes.get(&p))
                .and_then(|p| p.tag_name.as_deref())
                .map(|t| RAW_TEXT_ELEMENTS.contains(&t))
                .unwrap_or(false);
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeType::Comment => {
            out.push_str("<!--");
            out.push_str(node.text_content.as_deref().unwrap_or(""));
            out.push_str("-->");
        }
        NodeType::Element => {
            let tag = node.tag_name.as_deref().unwrap_or("div");
            out.push('<');
            out.push_str(tag);
            for (k, v) in &node.attributes {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag) {
                return;
            }
            stack.push(Emit::Close(tag));
            stack.extend(node.children.iter().rev().map(|&c| Emit::Node(c)));
        }
        NodeType::Document => {
            stack.extend(node.children.iter().rev().map(|&c| Emit::Node(c)));
        }
        NodeType::DocumentType => out.push_str("<!DOCTYPE html>"),
    }
}

const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: [&str; 2] = ["script", "style"];

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

/// A reference to a node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    nodes: NodeStore,
}

impl Node {
    /// Create a new node reference
    pub(crate) fn new(id: NodeId, nodes: NodeStore) -> Self {
        Self { id, nodes }
    }

    /// Get the node type
    pub fn node_type(&self) -> NodeType {
        self.nodes
            .read()
            .get(&self.id)
            .map(|n| n.node_type)
            .unwrap_or(NodeType::Element)
    }

    /// Tag name in lowercase
    pub fn local_name(&self) -> Option<String> {
        self.nodes
            .read()
            .get(&self.id)
            .and_then(|n| n.tag_name.clone())
    }

    /// Text value: descendant text for elements, own text for text and
    /// comment nodes
    pub fn text_content(&self) -> String {
        string_value(&self.nodes.read(), self.id)
    }

    /// Get child nodes
    pub fn children(&self) -> Vec<Node> {
        self.nodes
            .read()
            .get(&self.id)
            .map(|n| {
                n.children
                    .iter()
                    .map(|&id| Node::new(id, self.nodes.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Markup of the node itself and its subtree
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        serialize(&self.nodes.read(), self.id, &mut out);
        out
    }

    /// Markup of the node's children
    pub fn inner_html(&self) -> String {
        let nodes = self.nodes.read();
        let mut out = String::new();
        if let Some(node) = nodes.get(&self.id) {
            for &child in &node.children {
                serialize(&nodes, child, &mut out);
            }
        }
        out
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_order() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn test_node_data() {
        let element = NodeData::element("DIV");
        assert_eq!(element.tag_name, Some("div".to_string()));
        assert_eq!(element.node_type, NodeType::Element);

        let text = NodeData::text("Hello");
        assert_eq!(text.text_content, Some("Hello".to_string()));
        assert_eq!(text.node_type, NodeType::Text);
    }

    fn store(entries: Vec<(NodeId, NodeData)>) -> HashMap<NodeId, NodeData> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_deep_chain_serializes_without_recursion() {
        let depth = 100_000;
        let ids: Vec<NodeId> = (0..=depth).map(|_| NodeId::new()).collect();
        let mut entries = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            let mut data = if i == depth {
                NodeData::text("x")
            } else {
                NodeData::element("b")
            };
            data.parent = i.checked_sub(1).map(|p| ids[p]);
            if let Some(&child) = ids.get(i + 1) {
                data.children.push(child);
            }
            entries.push((id, data));
        }
        let nodes = store(entries);

        assert_eq!(string_value(&nodes, ids[0]), "x");
        let mut html = String::new();
        serialize(&nodes, ids[0], &mut html);
        assert_eq!(html.len(), depth * "<b></b>".len() + 1);
        assert!(html.starts_with("<b><b>"));
        assert!(html.ends_with("x</b></b>"));
    }

    #[test]
    fn test_serialize_void_and_raw_text() {
        let (div, br, script, code) = (NodeId::new(), NodeId::new(), NodeId::new(), NodeId::new());
        let mut div_data = NodeData::element("div");
        div_data.attributes.push(("title".into(), "a\"b".into()));
        div_data.children = vec![br, script];
        let mut br_data = NodeData::element("br");
        br_data.parent = Some(div);
        let mut script_data = NodeData::element("script");
        script_data.parent = Some(div);
        script_data.children = vec![code];
        let mut code_data = NodeData::text("a<b");
        code_data.parent = Some(script);
        let nodes = store(vec![
            (div, div_data),
            (br, br_data),
            (script, script_data),
            (code, code_data),
        ]);

        let mut html = String::new();
        serialize(&nodes, div, &mut html);
        assert_eq!(
            html,
            "<div title=\"a&quot;b\"><br><script>a<b</script></div>"
        );
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
    }
}
