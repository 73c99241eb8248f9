//! Auxiliary anchor fields, captured independently of the selector.

use dom_snapshot::{snippet, Document, NodeId};

use crate::errors::LocatorError;
use crate::policy::LocatorPolicy;
use crate::stability::StabilityFilter;
use crate::types::{AnchorContext, ParentLink, ANCHOR_SCHEMA_VERSION};

/// Record everything about `node` except the selector.
pub fn capture_context(
    doc: &Document,
    node: NodeId,
    policy: &LocatorPolicy,
    filter: &StabilityFilter,
) -> Result<AnchorContext, LocatorError> {
    let tag = doc
        .tag_name(node)
        .ok_or_else(|| LocatorError::InvalidTarget(format!("{:?} is not an element", node)))?;

    let parent_chain = doc
        .ancestors(node)
        .take(policy.parent_chain_depth)
        .filter_map(|ancestor| {
            Some(ParentLink {
                tag: doc.tag_name(ancestor)?.to_string(),
                classes: filter.recorded_classes(doc, ancestor),
            })
        })
        .collect();

    Ok(AnchorContext {
        schema_version: ANCHOR_SCHEMA_VERSION,
        selector: String::new(),
        tag_name: tag.to_string(),
        classes: filter.recorded_classes(doc, node),
        text_snippet: snippet(&doc.text_content(node), policy.snippet_max_chars),
        parent_chain,
        bounding_box: doc.rect(node).unwrap_or_default(),
        viewport: doc.viewport(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::BoundingBox;
    use serde_json::json;

    #[test]
    fn captures_filtered_redundant_fields() {
        let doc = Document::from_json_value(json!({
            "viewport": { "width": 1440, "height": 900 },
            "root": {
                "tag": "html",
                "children": [{
                    "tag": "body",
                    "children": [{
                        "tag": "form",
                        "attrs": { "class": "signup pointa-outline" },
                        "children": [{
                            "tag": "button",
                            "attrs": { "class": "btn focus:ring pointa-selected" },
                            "rect": { "x": 40, "y": 300, "width": 120, "height": 36 },
                            "children": [{ "text": "  Create\n   account  " }]
                        }]
                    }]
                }]
            }
        }))
        .unwrap();
        let button = doc.elements_by_tag("button")[0];
        let mut policy = LocatorPolicy::default();
        policy.snippet_max_chars = 6;
        policy.parent_chain_depth = 2;
        let filter = StabilityFilter::new(&policy);

        let context = capture_context(&doc, button, &policy, &filter).unwrap();
        assert_eq!(context.tag_name, "button");
        assert_eq!(context.classes, vec!["btn"]);
        assert_eq!(context.text_snippet, "Create");
        assert_eq!(context.parent_chain.len(), 2);
        assert_eq!(context.parent_chain[0].tag, "form");
        assert_eq!(context.parent_chain[0].classes, vec!["signup"]);
        assert_eq!(context.parent_chain[1].tag, "body");
        assert_eq!(context.bounding_box, BoundingBox::new(40.0, 300.0, 120.0, 36.0));
        assert_eq!(context.viewport.width, 1440.0);
        assert!(context.selector.is_empty());
    }

    #[test]
    fn text_nodes_are_rejected() {
        let mut doc = Document::default();
        let root = doc.root();
        let html = doc.create_element(root, "html").unwrap();
        let text = doc.append_text(html, "loose").unwrap();
        let policy = LocatorPolicy::default();
        let filter = StabilityFilter::new(&policy);
        assert!(matches!(
            capture_context(&doc, text, &policy, &filter),
            Err(LocatorError::InvalidTarget(_))
        ));
    }
}
