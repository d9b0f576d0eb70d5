// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HTML parser using html5ever
//!
//! html5ever recovers from any markup error, so parsing never fails; the
//! result is always a best-effort tree.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use super::document::Document;
use super::node::{NodeData, NodeId};

/// Parse HTML string into a Document
pub fn parse_html(html: &str) -> Document {
    parse_html_bytes(html.as_bytes())
}

/// Parse raw bytes, decoding them as UTF-8 with replacement characters
pub fn parse_html_bytes(mut html: &[u8]) -> Document {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: false,
            ..Default::default()
        },
        ..Default::default()
    };

    let doc = Document::new();
    let dom = match parse_document(RcDom::default(), opts)
        .from_utf8()
        .read_from(&mut html)
    {
        Ok(dom) => dom,
        Err(e) => {
            tracing::warn!(error = %e, "HTML input could not be read, using empty document");
            return doc;
        }
    };

    if !dom.errors.is_empty() {
        tracing::trace!(count = dom.errors.len(), "Ignored HTML parse errors");
    }

    // Worklist instead of recursion: nesting depth is unbounded. Children
    // are pushed in reverse so ids come out in document order.
    let root = doc.root_id();
    let mut stack: Vec<(Handle, NodeId)> = dom
        .document
        .children
        .borrow()
        .iter()
        .rev()
        .map(|child| (child.clone(), root))
        .collect();
    while let Some((handle, parent)) = stack.pop() {
        let Some(data) = convert_node(&handle) else {
            continue;
        };
        let id = doc.append(parent, data);
        stack.extend(
            handle
                .children
                .borrow()
                .iter()
                .rev()
                .map(|child| (child.clone(), id)),
        );
    }
    doc
}

/// Copy the data of one html5ever node; `None` for nodes that are dropped
fn convert_node(handle: &Handle) -> Option<NodeData> {
    let data = match handle.data {
        RcNodeData::Document | RcNodeData::ProcessingInstruction { .. } => return None,
        RcNodeData::Doctype { .. } => NodeData::doctype(),
        RcNodeData::Text { ref contents } => NodeData::text(contents.borrow().to_string()),
        RcNodeData::Comment { ref contents } => NodeData::comment(contents.to_string()),
        RcNodeData::Element {
            ref name,
            ref attrs,
            ..
        } => {
            let mut data = NodeData::element(name.local.to_string());
            for attr in attrs.borrow().iter() {
                data.attributes
                    .push((attr.name.local.to_string(), attr.value.to_string()));
            }
            data
        }
    };
    Some(data)
}
