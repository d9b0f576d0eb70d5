// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Document representation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::node::{Node, NodeData, NodeId, NodeStore};
use super::xpath::{XPath, XPathMatch};
use crate::error::Result;

/// Parsed HTML document
#[derive(Debug, Clone)]
pub struct Document {
    /// Root node ID
    root_id: NodeId,
    /// Node storage
    pub(crate) nodes: NodeStore,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        let root_id = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(root_id, NodeData::document());

        Self {
            root_id,
            nodes: Arc::new(RwLock::new(nodes)),
        }
    }

    /// Get the root node
    pub fn root(&self) -> Node {
        Node::new(self.root_id, self.nodes.clone())
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Insert a node as the last child of `parent`
    pub(crate) fn append(&self, parent: NodeId, mut data: NodeData) -> NodeId {
        let id = NodeId::new();
        data.parent = Some(parent);
        let mut nodes = self.nodes.write();
        nodes.insert(id, data);
        if let Some(p) = nodes.get_mut(&parent) {
            p.children.push(id);
        }
        id
    }

    /// Evaluate an XPath expression against the whole document
    pub fn xpath(&self, expr: &str) -> Result<Vec<XPathMatch>> {
        Ok(XPath::parse(expr)?.evaluate(self))
    }

    /// Get the document's HTML
    pub fn outer_html(&self) -> String {
        self.root().outer_html()
    }

    /// Get all text content
    pub fn text_content(&self) -> String {
        self.root().text_content()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
