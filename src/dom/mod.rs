// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! DOM for querying fetched HTML
//!
//! Documents are built from html5ever's tree and queried with XPath.

mod document;
mod node;
mod parser;
mod xpath;

pub use document::Document;
pub use node::{Node, NodeId, NodeType};
pub use parser::{parse_html, parse_html_bytes};
pub use xpath::{XPath, XPathMatch};
