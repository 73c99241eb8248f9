//! Position-delta tracking for moved elements.
//!
//! A delta records where an element sat before and after a drag as
//! structural parent paths plus a sibling anchor, so a move can be
//! reapplied or reverted after the page has been rebuilt.

use std::sync::Arc;

use dom_snapshot::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::errors::LocatorError;
use crate::policy::LocatorPolicy;
use crate::resolver::{AnchorResolver, DefaultAnchorResolver};
use crate::selector_forms::{is_ui_injected, structural_path};
use crate::synthesizer::Synthesizer;
use crate::types::{AnchorContext, PositionDelta, PositionSnapshot};

pub struct PositionTracker {
    synthesizer: Synthesizer,
    resolver: Arc<dyn AnchorResolver>,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::with_policy(LocatorPolicy::default())
    }
}

impl PositionTracker {
    pub fn new(synthesizer: Synthesizer, resolver: Arc<dyn AnchorResolver>) -> Self {
        Self {
            synthesizer,
            resolver,
        }
    }

    pub fn with_policy(policy: LocatorPolicy) -> Self {
        let resolver = Arc::new(DefaultAnchorResolver::new(policy.clone()));
        Self::new(Synthesizer::new(policy), resolver)
    }

    fn policy(&self) -> &LocatorPolicy {
        self.synthesizer.policy()
    }

    /// Record the current position of `node`.
    pub fn snapshot(&self, doc: &Document, node: NodeId) -> Result<PositionSnapshot, LocatorError> {
        let tag = doc
            .tag_name(node)
            .ok_or_else(|| LocatorError::InvalidTarget(format!("{:?} is not an element", node)))?;
        let parent = doc.parent_element(node).ok_or_else(|| {
            LocatorError::InvalidTarget(format!("{:?} has no parent element", node))
        })?;
        let parent_path = structural_path(doc, parent).ok_or_else(|| {
            LocatorError::InvalidTarget(format!("no structural path for parent of {:?}", node))
        })?;

        let index = self
            .peers(doc, parent, tag, None)
            .iter()
            .position(|peer| *peer == node)
            .unwrap_or(0);

        let mut next = doc.next_element_sibling(node);
        while let Some(candidate) = next {
            if !is_ui_injected(doc, candidate, self.policy()) {
                break;
            }
            next = doc.next_element_sibling(candidate);
        }
        let sibling_ref = next
            .map(|sibling| self.synthesizer.describe(doc, sibling))
            .transpose()?;

        Ok(PositionSnapshot {
            parent_path,
            index,
            sibling_ref,
        })
    }

    /// Delta from `original` to the current position, or `None` if the
    /// element did not move.
    pub fn capture(
        &self,
        doc: &Document,
        node: NodeId,
        original: PositionSnapshot,
    ) -> Result<Option<PositionDelta>, LocatorError> {
        let current = self.snapshot(doc, node)?;
        let same_sibling = match (&original.sibling_ref, &current.sibling_ref) {
            (None, None) => true,
            (Some(before), Some(after)) => before.selector == after.selector,
            _ => false,
        };
        if current.parent_path == original.parent_path
            && current.index == original.index
            && same_sibling
        {
            debug!(parent = %current.parent_path, "element did not move");
            return Ok(None);
        }
        info!(
            "Captured move: {}[{}] -> {}[{}]",
            original.parent_path, original.index, current.parent_path, current.index
        );
        Ok(Some(PositionDelta::from_snapshots(original, current)))
    }

    /// Move `node` to the delta's new position.
    pub fn apply(
        &self,
        doc: &mut Document,
        node: NodeId,
        delta: &PositionDelta,
    ) -> Result<(), LocatorError> {
        self.place(
            doc,
            node,
            &delta.new_parent_path,
            delta.new_index,
            delta.new_sibling_ref.as_ref(),
        )
    }

    /// Move `node` back to the delta's original position.
    pub fn revert(
        &self,
        doc: &mut Document,
        node: NodeId,
        delta: &PositionDelta,
    ) -> Result<(), LocatorError> {
        self.place(
            doc,
            node,
            &delta.old_parent_path,
            delta.old_index,
            delta.old_sibling_ref.as_ref(),
        )
    }

    fn place(
        &self,
        doc: &mut Document,
        node: NodeId,
        parent_path: &str,
        index: usize,
        sibling_ref: Option<&AnchorContext>,
    ) -> Result<(), LocatorError> {
        let tag = doc
            .tag_name(node)
            .ok_or_else(|| LocatorError::InvalidTarget(format!("{:?} is not an element", node)))?
            .to_string();
        let parent = self.resolve_parent(doc, parent_path)?;

        let sibling = match sibling_ref {
            Some(anchor) => self.resolve_sibling(doc, anchor, parent, node),
            None => None,
        };
        if let Some(sibling) = sibling {
            debug!(?sibling, "placing before resolved sibling");
            doc.insert_before(parent, node, Some(sibling))?;
            return Ok(());
        }

        let peers = self.peers(doc, parent, &tag, Some(node));
        match peers.get(index) {
            Some(reference) => {
                debug!(index, "placing by sibling index");
                doc.insert_before(parent, node, Some(*reference))?;
            }
            None => {
                debug!(index, peers = peers.len(), "index past the end; appending");
                doc.append_child(parent, node)?;
            }
        }
        Ok(())
    }

    fn resolve_parent(&self, doc: &Document, parent_path: &str) -> Result<NodeId, LocatorError> {
        let matches = doc.query_selector_all(parent_path).map_err(|err| {
            LocatorError::ParentUnresolved(format!("{parent_path}: {err}"))
        })?;
        match matches.as_slice() {
            [only] => Ok(*only),
            other => {
                warn!(parent = parent_path, matches = other.len(), "parent path did not resolve");
                Err(LocatorError::ParentUnresolved(format!(
                    "{parent_path} matched {} elements",
                    other.len()
                )))
            }
        }
    }

    fn resolve_sibling(
        &self,
        doc: &Document,
        anchor: &AnchorContext,
        parent: NodeId,
        node: NodeId,
    ) -> Option<NodeId> {
        match self.resolver.resolve(doc, anchor) {
            Ok(resolution) => resolution
                .node()
                .filter(|sibling| *sibling != node && doc.parent_element(*sibling) == Some(parent)),
            Err(err) => {
                debug!("sibling reference unusable: {}", err);
                None
            }
        }
    }

    // Same-tag, non-UI element children of `parent`, optionally without `exclude`.
    fn peers(&self, doc: &Document, parent: NodeId, tag: &str, exclude: Option<NodeId>) -> Vec<NodeId> {
        doc.element_children(parent)
            .into_iter()
            .filter(|child| Some(*child) != exclude)
            .filter(|child| doc.tag_name(*child) == Some(tag))
            .filter(|child| !is_ui_injected(doc, *child, self.policy()))
            .collect()
    }
}
