//! Selector string builders shared by synthesis, promotion and the tracker.

use chrono::Utc;
use dom_snapshot::{escape_attr_value, escape_ident, Document, NodeId};
use uuid::Uuid;

use crate::policy::LocatorPolicy;
use crate::verify::verify_selector;

pub fn id_selector(id: &str) -> String {
    format!("#{}", escape_ident(id))
}

pub fn attribute_selector(tag: &str, attr: &str, value: &str) -> String {
    format!("{tag}[{attr}=\"{}\"]", escape_attr_value(value))
}

/// `tag.c1.c2`; bare `tag` when `classes` is empty.
pub fn class_selector(tag: &str, classes: &[String]) -> String {
    let mut out = tag.to_string();
    for class_name in classes {
        out.push('.');
        out.push_str(&escape_ident(class_name));
    }
    out
}

pub fn marker_selector(attr: &str, token: &str) -> String {
    format!("[{attr}=\"{}\"]", escape_attr_value(token))
}

pub fn nth_of_type_selector(doc: &Document, node: NodeId) -> Option<String> {
    let tag = doc.tag_name(node)?;
    let index = doc.nth_of_type(node)?;
    Some(format!("{tag}:nth-of-type({index})"))
}

/// `#id` when the element carries a page-unique id.
pub fn unique_id_selector(doc: &Document, node: NodeId) -> Option<String> {
    let id = doc.id_attr(node)?;
    let selector = id_selector(id);
    verify_selector(doc, &selector, Some(node))
        .is_unique()
        .then_some(selector)
}

/// Position-only path: nearest unique-id ancestor (or `body`/`html`) followed
/// by `tag:nth-of-type(n)` steps.
pub fn structural_path(doc: &Document, node: NodeId) -> Option<String> {
    let mut steps: Vec<String> = Vec::new();
    for current in std::iter::once(node).chain(doc.ancestors(node)) {
        if let Some(selector) = unique_id_selector(doc, current) {
            steps.push(selector);
            break;
        }
        let tag = doc.tag_name(current)?;
        if tag == "body" || tag == "html" {
            steps.push(tag.to_string());
            break;
        }
        match nth_of_type_selector(doc, current) {
            Some(step) => steps.push(step),
            None => {
                steps.push(tag.to_string());
                break;
            }
        }
    }
    if steps.is_empty() {
        return None;
    }
    steps.reverse();
    Some(steps.join(" > "))
}

/// Side-effect-free selectors that identify `node` independently of its
/// position: id, unique attributes, then an existing marker.
pub fn durable_selectors(doc: &Document, node: NodeId, policy: &LocatorPolicy) -> Vec<String> {
    let Some(tag) = doc.tag_name(node) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    if let Some(id) = doc.id_attr(node) {
        out.push(id_selector(id));
    }
    for attr in &policy.unique_attributes {
        if let Some(value) = doc.attr(node, attr).filter(|value| !value.trim().is_empty()) {
            out.push(attribute_selector(tag, attr, value));
        }
    }
    if let Some(token) = doc
        .attr(node, &policy.marker_attribute)
        .filter(|token| !token.is_empty())
    {
        out.push(marker_selector(&policy.marker_attribute, token));
    }
    out
}

/// Globally unique marker token: millisecond timestamp plus a random suffix.
pub fn mint_marker_token() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = Uuid::new_v4().simple().to_string();
    format!("pointa-{}-{}", to_base36(millis), &random[..8])
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Elements added by the annotation UI itself (badges, overlays, handles).
pub fn is_ui_injected(doc: &Document, node: NodeId, policy: &LocatorPolicy) -> bool {
    doc.attr(node, &policy.ui_attribute).is_some()
        || doc
            .classes(node)
            .into_iter()
            .any(|class_name| policy.is_internal_class(class_name))
}
