//! Arena-backed element tree.
//!
//! Nodes are never freed: detaching a subtree keeps its ids valid so callers
//! holding a `NodeId` can still inspect or re-insert it. `is_connected`
//! distinguishes attached nodes from detached ones.

use serde::{Deserialize, Serialize};

use crate::errors::{DomError, SelectorError};
use crate::geometry::{BoundingBox, Viewport};
use crate::selector::Selector;
use crate::text::normalize_text;

/// Handle to a node in a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload: lowercase tag, ordered attributes and layout box.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    attrs: Vec<(String, String)>,
    pub rect: BoundingBox,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            rect: BoundingBox::default(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|c| c == class_name)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// In-memory document with a viewport.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    viewport: Viewport,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl Document {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
            viewport,
        }
    }

    /// The document node (not an element).
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// First element child of the document node, usually `<html>`.
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).into_iter().next()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create an element and append it to `parent`.
    pub fn create_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        let child = self.create_detached_element(tag);
        self.append_child(parent, child)?;
        Ok(child)
    }

    pub fn create_detached_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData::new(tag)))
    }

    /// Append a text node to `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId, DomError> {
        let child = self.push_node(NodeKind::Text(text.to_string()));
        self.append_child(parent, child)?;
        Ok(child)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Element(element)) => Ok(element),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?.attr(name)
    }

    /// Non-empty `id` attribute.
    pub fn id_attr(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|value| !value.trim().is_empty())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let name = name.to_ascii_lowercase();
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => element.attrs.push((name, value.to_string())),
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        Ok(())
    }

    pub fn classes(&self, id: NodeId) -> Vec<&str> {
        self.element(id)
            .map(|element| element.classes().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class_name: &str) -> bool {
        self.element(id)
            .map(|element| element.has_class(class_name))
            .unwrap_or(false)
    }

    pub fn remove_class(&mut self, id: NodeId, class_name: &str) -> Result<(), DomError> {
        let remaining = self
            .classes(id)
            .into_iter()
            .filter(|c| *c != class_name)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attr(id, "class")
        } else {
            self.set_attr(id, "class", &remaining)
        }
    }

    pub fn rect(&self, id: NodeId) -> Option<BoundingBox> {
        self.element(id).map(|element| element.rect)
    }

    pub fn set_rect(&mut self, id: NodeId, rect: BoundingBox) -> Result<(), DomError> {
        self.element_mut(id)?.rect = rect;
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    /// Parent if it is an element (the document node is skipped).
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.children(parent)
            .iter()
            .skip_while(|child| **child != id)
            .skip(1)
            .copied()
            .find(|child| self.is_element(*child))
    }

    /// Element ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            cursor: self.parent_element(id),
        }
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Every connected element in document order.
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(self.root, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if self.is_element(id) {
            out.push(id);
        }
        for child in self.children(id) {
            self.collect_elements(*child, out);
        }
    }

    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| {
                self.tag_name(*id)
                    .map(|name| name.eq_ignore_ascii_case(tag))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Concatenated descendant text, as `textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };
        if let NodeKind::Text(text) = &node.kind {
            out.push_str(text);
        }
        for child in &node.children {
            self.collect_text(*child, out);
        }
    }

    pub fn normalized_text(&self, id: NodeId) -> String {
        normalize_text(&self.text_content(id))
    }

    /// 1-based position among element siblings sharing the tag name.
    pub fn nth_of_type(&self, id: NodeId) -> Option<usize> {
        let tag = self.tag_name(id)?;
        let parent = self.parent(id)?;
        self.element_children(parent)
            .into_iter()
            .filter(|sibling| self.tag_name(*sibling) == Some(tag))
            .position(|sibling| sibling == id)
            .map(|index| index + 1)
    }

    /// 1-based position among all element siblings.
    pub fn nth_child(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.element_children(parent)
            .into_iter()
            .position(|sibling| sibling == id)
            .map(|index| index + 1)
    }

    pub fn same_type_sibling_count(&self, id: NodeId) -> usize {
        let (Some(tag), Some(parent)) = (self.tag_name(id), self.parent(id)) else {
            return 0;
        };
        self.element_children(parent)
            .into_iter()
            .filter(|sibling| self.tag_name(*sibling) == Some(tag))
            .count()
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Remove a node from its parent; the subtree stays addressable.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        self.node(id)?;
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|child| *child != id);
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when `reference` is `None`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        let parent_node = self.node(parent)?;
        if matches!(parent_node.kind, NodeKind::Text(_)) {
            return Err(DomError::HierarchyRequest(format!(
                "text node {:?} cannot have children",
                parent
            )));
        }
        self.node(child)?;
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(format!(
                "{:?} is an ancestor of {:?}",
                child, parent
            )));
        }
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::HierarchyRequest(format!(
                    "{:?} is not a child of {:?}",
                    reference, parent
                )));
            }
            if reference == child {
                return Ok(());
            }
        }

        self.detach(child)?;
        let siblings = &mut self.nodes[parent.0].children;
        let position = reference
            .and_then(|reference| siblings.iter().position(|id| *id == reference))
            .unwrap_or(siblings.len());
        siblings.insert(position, child);
        self.nodes[child.0].parent = Some(parent);
        Ok(())
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.select(&selector))
    }

    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Every connected element matching a parsed selector, in document order.
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| selector.matches(self, *id))
            .collect()
    }
}

/// Iterator over element ancestors, nearest first.
pub struct Ancestors<'a> {
    doc: &'a Document,
    cursor: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.cursor?;
        self.cursor = self.doc.parent_element(current);
        Some(current)
    }
}
