//! HTML5 parsing and DOM helpers using html5ever
//!
//! The converter reads editor HTML through html5ever, which implements the
//! WHATWG parsing algorithm. Malformed markup (unclosed tags, misnesting,
//! stray text) is repaired the same way a browser repairs it, so the block
//! mapping sees a predictable tree.
//!
//! Input is always parsed as a full document. html5ever wraps fragments in
//! `html`/`head`/`body`, and [`body`] returns the element whose children are
//! the fragment's top-level nodes.
//!
//! # Examples
//!
//! ```rust
//! use content_pipeline::parser::{body, element_name, parse_html};
//!
//! let dom = parse_html("<h1>Hello</h1><p>World");
//! let body = body(&dom).expect("html5ever always creates a body");
//! let names: Vec<String> = body
//!     .children
//!     .borrow()
//!     .iter()
//!     .filter_map(|node| element_name(node).map(str::to_string))
//!     .collect();
//! assert_eq!(names, vec!["h1", "p"]);
//! ```

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::charset::decode_html;
use crate::error::ContentError;

/// Parse an HTML string into a DOM tree
///
/// Parsing never fails; an empty string yields a document with an empty body.
pub fn parse_html(html: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(html)
}

/// Parse HTML bytes, decoding them with the charset cascade first
///
/// # Errors
///
/// - [`ContentError::InvalidInput`]: the input is empty
/// - [`ContentError::Encoding`]: the bytes are invalid for the detected charset
pub fn parse_html_with_charset(
    html: &[u8],
    content_type: Option<&str>,
) -> Result<RcDom, ContentError> {
    if html.is_empty() {
        return Err(ContentError::InvalidInput(
            "HTML input is empty".to_string(),
        ));
    }

    let text = decode_html(html, content_type)?;
    Ok(parse_html(&text))
}

/// Find the `body` element of a parsed document
pub fn body(dom: &RcDom) -> Option<Handle> {
    let html = child_element(&dom.document, "html")?;
    child_element(&html, "body")
}

fn child_element(node: &Handle, name: &str) -> Option<Handle> {
    node.children
        .borrow()
        .iter()
        .find(|child| element_name(child) == Some(name))
        .cloned()
}

/// Local tag name of an element node (`None` for text, comments, ...)
pub fn element_name(node: &Handle) -> Option<&str> {
    match node.data {
        NodeData::Element { ref name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// Value of an attribute on an element node
pub fn attribute(node: &Handle, attr_name: &str) -> Option<String> {
    match node.data {
        NodeData::Element { ref attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| attr.name.local.as_ref() == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// First direct or nested element with the given tag name, depth-first
///
/// Walks with an explicit stack, so nesting depth is bounded by memory only.
pub fn find_element(node: &Handle, name: &str) -> Option<Handle> {
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();
    while let Some(current) = stack.pop() {
        if element_name(&current) == Some(name) {
            return Some(current);
        }
        stack.extend(current.children.borrow().iter().rev().cloned());
    }
    None
}

/// Raw text content of a node and its descendants, whitespace untouched
///
/// This is the DOM `textContent`: used for `pre` blocks where every space
/// and newline matters.
pub fn text_content(node: &Handle) -> String {
    let mut output = String::new();
    let mut stack = vec![node.clone()];
    while let Some(current) = stack.pop() {
        match current.data {
            NodeData::Text { ref contents } => output.push_str(&contents.borrow()),
            NodeData::Element { .. } | NodeData::Document => {
                stack.extend(current.children.borrow().iter().rev().cloned());
            }
            _ => {}
        }
    }
    output
}
