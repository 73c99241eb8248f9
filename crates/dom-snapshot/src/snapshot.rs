//! Serialized page snapshots.
//!
//! A snapshot is the nested JSON a capture layer emits for a page: elements
//! with attributes, layout boxes and children, plus text leaves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Document, NodeId};
use crate::errors::DomError;
use crate::geometry::{BoundingBox, Viewport};

/// Whole-page snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    #[serde(default)]
    pub viewport: Viewport,
    pub root: SnapshotElement,
}

/// Node in a snapshot tree.
///
/// Untagged: anything carrying a `tag` is an element, so an element with
/// inline `text` is never mistaken for a text leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotNode {
    Element(SnapshotElement),
    Text { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotElement {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rect: Option<BoundingBox>,
    /// Inline text, loaded as a leading text child
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SnapshotNode>,
}

impl Document {
    /// Build a document from a decoded snapshot.
    pub fn from_snapshot(snapshot: &DomSnapshot) -> Result<Self, DomError> {
        let mut doc = Document::new(snapshot.viewport);
        let root = doc.root();
        doc.load_element(root, &snapshot.root)?;
        debug!(elements = doc.elements().len(), "loaded DOM snapshot");
        Ok(doc)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, DomError> {
        let snapshot: DomSnapshot =
            serde_json::from_str(raw).map_err(|err| DomError::Snapshot(err.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    pub fn from_json_value(value: serde_json::Value) -> Result<Self, DomError> {
        let snapshot: DomSnapshot =
            serde_json::from_value(value).map_err(|err| DomError::Snapshot(err.to_string()))?;
        Self::from_snapshot(&snapshot)
    }

    fn load_element(
        &mut self,
        parent: NodeId,
        element: &SnapshotElement,
    ) -> Result<NodeId, DomError> {
        if element.tag.trim().is_empty() {
            return Err(DomError::Snapshot("element with empty tag".to_string()));
        }
        let id = self.create_element(parent, element.tag.trim())?;
        for (key, value) in &element.attrs {
            self.set_attr(id, key, value)?;
        }
        if let Some(rect) = element.rect {
            self.set_rect(id, rect)?;
        }
        if let Some(text) = element.text.as_deref().filter(|text| !text.is_empty()) {
            self.append_text(id, text)?;
        }
        for child in &element.children {
            match child {
                SnapshotNode::Text { text } => {
                    self.append_text(id, text)?;
                }
                SnapshotNode::Element(child) => {
                    self.load_element(id, child)?;
                }
            }
        }
        Ok(id)
    }

    /// Serialize the connected tree back into a snapshot.
    pub fn to_snapshot(&self) -> Result<DomSnapshot, DomError> {
        let root = self
            .document_element()
            .ok_or_else(|| DomError::Snapshot("document has no root element".to_string()))?;
        Ok(DomSnapshot {
            viewport: self.viewport(),
            root: self.dump_element(root)?,
        })
    }

    fn dump_element(&self, id: NodeId) -> Result<SnapshotElement, DomError> {
        let element = self.element(id).ok_or(DomError::NotAnElement(id))?;
        let mut children = Vec::new();
        for child in self.children(id) {
            if self.is_element(*child) {
                children.push(SnapshotNode::Element(self.dump_element(*child)?));
            } else {
                let text = self.text_content(*child);
                if !text.is_empty() {
                    children.push(SnapshotNode::Text { text });
                }
            }
        }
        Ok(SnapshotElement {
            tag: element.tag.clone(),
            attrs: element
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            rect: (!element.rect.is_empty()).then_some(element.rect),
            text: None,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "viewport": { "width": 1024, "height": 768 },
            "root": {
                "tag": "HTML",
                "children": [{
                    "tag": "body",
                    "children": [
                        { "text": "Intro " },
                        {
                            "tag": "button",
                            "attrs": { "class": "btn primary", "type": "submit" },
                            "rect": { "x": 10, "y": 20, "width": 80, "height": 32 },
                            "children": [{ "text": "Send" }]
                        }
                    ]
                }]
            }
        })
    }

    #[test]
    fn loads_elements_text_and_geometry() {
        let doc = Document::from_json_value(sample()).unwrap();
        assert_eq!(doc.viewport().width, 1024.0);

        let button = doc.elements_by_tag("button")[0];
        assert_eq!(doc.classes(button), vec!["btn", "primary"]);
        assert_eq!(doc.rect(button), Some(BoundingBox::new(10.0, 20.0, 80.0, 32.0)));
        assert_eq!(doc.normalized_text(doc.elements_by_tag("body")[0]), "Intro Send");
        assert_eq!(doc.tag_name(doc.document_element().unwrap()), Some("html"));
    }

    #[test]
    fn snapshot_round_trips_attributes() {
        let mut doc = Document::from_json_value(sample()).unwrap();
        let button = doc.elements_by_tag("button")[0];
        doc.set_attr(button, "data-pointa-id", "pointa-1").unwrap();

        let reloaded = Document::from_snapshot(&doc.to_snapshot().unwrap()).unwrap();
        let button = reloaded.elements_by_tag("button")[0];
        assert_eq!(reloaded.attr(button, "data-pointa-id"), Some("pointa-1"));
        assert_eq!(reloaded.normalized_text(button), "Send");
    }

    #[test]
    fn rejects_empty_tags() {
        let err = Document::from_json_value(json!({ "root": { "tag": " " } })).unwrap_err();
        assert!(matches!(err, DomError::Snapshot(_)));
    }
}
