//! Anchor resolver with cascade orchestration

use dom_snapshot::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::errors::LocatorError;
use crate::policy::LocatorPolicy;
use crate::selector_forms::{durable_selectors, is_ui_injected};
use crate::stages::{default_stages, CandidatePool, ResolutionContext, ResolutionStage, StageOutcome};
use crate::types::{AnchorContext, Resolution, ResolveStage};
use crate::verify::verify_selector;

/// Anchor resolver trait
pub trait AnchorResolver: Send + Sync {
    /// Resolve an anchor against the current document.
    ///
    /// `Ok(Resolution::NotFound)` is the normal outcome for an element that
    /// left the page; `Err` is reserved for anchors that cannot be reasoned
    /// about at all.
    fn resolve(&self, doc: &Document, anchor: &AnchorContext) -> Result<Resolution, LocatorError>;

    /// Resolve, then store a promoted selector in the anchor.
    fn resolve_in_place(
        &self,
        doc: &Document,
        anchor: &mut AnchorContext,
    ) -> Result<Resolution, LocatorError> {
        let resolution = self.resolve(doc, anchor)?;
        if let Resolution::Found {
            promoted_selector: Some(selector),
            ..
        } = &resolution
        {
            info!(
                "Promoting selector {} -> {}",
                anchor.selector, selector
            );
            anchor.selector = selector.clone();
        }
        Ok(resolution)
    }
}

/// Default anchor resolver implementation
pub struct DefaultAnchorResolver {
    policy: LocatorPolicy,
    stages: Vec<Box<dyn ResolutionStage>>,
}

impl Default for DefaultAnchorResolver {
    fn default() -> Self {
        Self::new(LocatorPolicy::default())
    }
}

impl DefaultAnchorResolver {
    pub fn new(policy: LocatorPolicy) -> Self {
        Self::with_stages(policy, default_stages())
    }

    pub fn try_new(policy: LocatorPolicy) -> Result<Self, LocatorError> {
        policy.validate()?;
        Ok(Self::new(policy))
    }

    pub fn with_stages(policy: LocatorPolicy, stages: Vec<Box<dyn ResolutionStage>>) -> Self {
        Self { policy, stages }
    }

    pub fn policy(&self) -> &LocatorPolicy {
        &self.policy
    }

    fn initial_pool(&self, doc: &Document, anchor: &AnchorContext) -> CandidatePool {
        CandidatePool::new(
            doc.elements_by_tag(&anchor.tag_name)
                .into_iter()
                .filter(|node| !is_ui_injected(doc, *node, &self.policy))
                .collect(),
        )
    }

    /// First durable selector that uniquely identifies `node`.
    fn promotion(&self, doc: &Document, node: NodeId, current: &str) -> Option<String> {
        durable_selectors(doc, node, &self.policy)
            .into_iter()
            .filter(|selector| selector != current)
            .find(|selector| verify_selector(doc, selector, Some(node)).is_unique())
    }
}

impl AnchorResolver for DefaultAnchorResolver {
    fn resolve(&self, doc: &Document, anchor: &AnchorContext) -> Result<Resolution, LocatorError> {
        anchor.validate()?;
        debug!("Resolving anchor: {} <{}>", anchor.selector, anchor.tag_name);

        let ctx = ResolutionContext {
            doc,
            anchor,
            policy: &self.policy,
        };
        let mut pool = self.initial_pool(doc, anchor);
        let candidates_considered = pool.len();

        for stage in &self.stages {
            debug!("Trying stage: {}", stage.name());
            match stage.run(&ctx, &mut pool) {
                StageOutcome::Match { node, score } => {
                    let stage_kind = stage.kind();
                    // Only a broken stored selector is ever replaced.
                    let promoted_selector = if stage_kind == ResolveStage::DirectSelector {
                        None
                    } else {
                        self.promotion(doc, node, &anchor.selector)
                    };
                    info!(
                        "Resolved anchor using {} stage: {:?} (score: {:?})",
                        stage_kind.name(),
                        node,
                        score
                    );
                    return Ok(Resolution::Found {
                        node,
                        stage: stage_kind,
                        score,
                        promoted_selector,
                    });
                }
                StageOutcome::Continue => {
                    debug!(
                        stage = stage.name(),
                        pool = pool.len(),
                        "stage did not settle"
                    );
                }
            }
        }

        warn!(
            selector = %anchor.selector,
            tag = %anchor.tag_name,
            candidates_considered,
            "Anchor not found"
        );
        Ok(Resolution::NotFound {
            reason: format!(
                "all stages exhausted for <{}> ({} candidates)",
                anchor.tag_name, candidates_considered
            ),
            candidates_considered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_snapshot::BoundingBox;
    use serde_json::json;

    fn doc() -> Document {
        Document::from_json_value(json!({
            "root": {
                "tag": "html",
                "children": [{
                    "tag": "body",
                    "children": [
                        { "tag": "a", "attrs": { "class": "link", "title": "Docs" },
                          "rect": { "x": 10, "y": 10, "width": 60, "height": 18 },
                          "children": [{ "text": "Documentation" }] },
                        { "tag": "a", "attrs": { "class": "link pointa-badge" },
                          "rect": { "x": 10, "y": 10, "width": 60, "height": 18 },
                          "children": [{ "text": "Documentation" }] }
                    ]
                }]
            }
        }))
        .unwrap()
    }

    fn anchor(selector: &str) -> AnchorContext {
        AnchorContext {
            schema_version: 1,
            selector: selector.to_string(),
            tag_name: "a".to_string(),
            classes: vec!["link".to_string()],
            text_snippet: "Documentation".to_string(),
            parent_chain: Vec::new(),
            bounding_box: BoundingBox::new(10.0, 10.0, 60.0, 18.0),
            viewport: Default::default(),
        }
    }

    #[test]
    fn malformed_anchor_fails_loudly() {
        let mut stored = anchor("a.link");
        stored.tag_name.clear();
        let err = DefaultAnchorResolver::default()
            .resolve(&doc(), &stored)
            .unwrap_err();
        assert!(matches!(err, LocatorError::MalformedAnchor(_)));
    }

    #[test]
    fn fallback_recovery_promotes_durable_selector() {
        let doc = doc();
        let mut stored = anchor("a.renamed-link");
        let resolution = DefaultAnchorResolver::default()
            .resolve_in_place(&doc, &mut stored)
            .unwrap();

        assert_eq!(resolution.node(), Some(doc.elements_by_tag("a")[0]));
        assert_eq!(resolution.stage(), Some(ResolveStage::TextContent));
        assert_eq!(stored.selector, "a[title=\"Docs\"]");
    }

    #[test]
    fn direct_hits_are_never_promoted() {
        let doc = doc();
        let mut stored = anchor("body > a:nth-of-type(1)");
        let resolution = DefaultAnchorResolver::default()
            .resolve_in_place(&doc, &mut stored)
            .unwrap();
        assert_eq!(resolution.stage(), Some(ResolveStage::DirectSelector));
        assert_eq!(stored.selector, "body > a:nth-of-type(1)");
    }

    #[test]
    fn ui_injected_elements_are_not_candidates() {
        let doc = doc();
        let resolution = DefaultAnchorResolver::default()
            .resolve(&doc, &anchor(""))
            .unwrap();
        assert_eq!(resolution.node(), Some(doc.elements_by_tag("a")[0]));
    }

    #[test]
    fn inconsistent_policy_is_rejected() {
        let policy = LocatorPolicy {
            position_threshold_px: 0.0,
            ..LocatorPolicy::default()
        };
        let err = DefaultAnchorResolver::try_new(policy).err().unwrap();
        assert!(matches!(err, LocatorError::Policy(_)));
        assert!(!err.is_integrity_error());
    }
}
