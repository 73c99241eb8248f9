//! Resolution cascade stages
//!
//! Five stages in fallback order:
//! 1. Direct selector - the stored selector matches exactly one element
//! 2. Parent chain - ancestors match the recorded chain
//! 3. Text content - normalized text matches the snippet
//! 4. Class filter - shares a recorded class (narrows only)
//! 5. Position - nearest bounding box under the acceptance threshold
//!
//! Stages share a candidate pool. A stage that leaves more than one survivor
//! narrows the pool for the stages after it.

use dom_snapshot::{BoundingBox, Document, NodeId};
use tracing::debug;

use crate::policy::LocatorPolicy;
use crate::types::{AnchorContext, ResolveStage};

/// Inputs shared by every stage for one resolution call.
pub struct ResolutionContext<'a> {
    pub doc: &'a Document,
    pub anchor: &'a AnchorContext,
    pub policy: &'a LocatorPolicy,
}

impl<'a> ResolutionContext<'a> {
    /// Stored box, rescaled horizontally when the viewport width changed.
    pub fn expected_box(&self) -> BoundingBox {
        let stored = self.anchor.bounding_box;
        let stored_width = self.anchor.viewport.width;
        let current_width = self.doc.viewport().width;
        if stored_width > 0.0 && current_width > 0.0 && stored_width != current_width {
            let ratio = current_width / stored_width;
            BoundingBox {
                x: stored.x * ratio,
                width: stored.width * ratio,
                ..stored
            }
        } else {
            stored
        }
    }

    /// Distance over `(x, y)` plus a weighted size mismatch. `None` when
    /// either side carries no geometry.
    pub fn geometry_score(&self, node: NodeId) -> Option<f64> {
        if !self.anchor.has_geometry() {
            return None;
        }
        let actual = self.doc.rect(node).filter(|rect| !rect.is_empty())?;
        let expected = self.expected_box();
        let size_mismatch =
            (actual.width - expected.width).abs() + (actual.height - expected.height).abs();
        Some(actual.origin_distance(&expected) + self.policy.size_penalty_weight * size_mismatch)
    }

    /// Normalized text equals the snippet, or starts with it when the snippet was truncated.
    pub fn text_matches(&self, node: NodeId) -> bool {
        let snippet = self.anchor.text_snippet.as_str();
        let text = self.doc.normalized_text(node);
        if text == snippet {
            return true;
        }
        snippet.chars().count() >= self.policy.snippet_max_chars && text.starts_with(snippet)
    }

    /// Normalized text is exactly the (non-empty) snippet.
    pub fn text_identifies(&self, node: NodeId) -> bool {
        !self.anchor.text_snippet.is_empty()
            && self.doc.normalized_text(node) == self.anchor.text_snippet
    }

    /// How far an exact text match may have drifted: content inserted above
    /// an element can push it down by up to a screenful.
    pub fn text_match_radius(&self) -> f64 {
        self.policy
            .position_threshold_px
            .max(self.doc.viewport().height)
    }

    /// Whether a lone survivor is believable as the original element.
    pub fn is_plausible(&self, node: NodeId) -> bool {
        if let Some(score) = self.geometry_score(node) {
            if score > self.policy.position_threshold_px {
                debug!(?node, score, "candidate is geometrically implausible");
                return false;
            }
        }
        if self.policy.require_text_agreement
            && !self.anchor.text_snippet.is_empty()
            && !self.text_matches(node)
        {
            debug!(?node, "candidate text disagrees with snippet");
            return false;
        }
        true
    }
}

/// Candidates still in contention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    candidates: Vec<NodeId>,
    narrowed_by: Vec<ResolveStage>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<NodeId>) -> Self {
        Self {
            candidates,
            narrowed_by: Vec::new(),
        }
    }

    pub fn candidates(&self) -> &[NodeId] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Stages that narrowed the pool, in order.
    pub fn narrowed_by(&self) -> &[ResolveStage] {
        &self.narrowed_by
    }

    fn filter(&self, mut keep: impl FnMut(NodeId) -> bool) -> Vec<NodeId> {
        self.candidates
            .iter()
            .copied()
            .filter(|node| keep(*node))
            .collect()
    }

    fn narrow(&mut self, stage: ResolveStage, survivors: Vec<NodeId>) {
        debug!(
            stage = stage.name(),
            from = self.candidates.len(),
            to = survivors.len(),
            "narrowed candidate pool"
        );
        self.candidates = survivors;
        self.narrowed_by.push(stage);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Match { node: NodeId, score: Option<f64> },
    Continue,
}

/// Stage trait for anchor resolution
pub trait ResolutionStage: Send + Sync {
    fn run(&self, ctx: &ResolutionContext<'_>, pool: &mut CandidatePool) -> StageOutcome;

    fn kind(&self) -> ResolveStage;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

// Unique plausible survivor wins; several narrow the pool.
fn settle(
    stage: ResolveStage,
    ctx: &ResolutionContext<'_>,
    pool: &mut CandidatePool,
    survivors: Vec<NodeId>,
) -> StageOutcome {
    match survivors.as_slice() {
        [] => StageOutcome::Continue,
        [only] => {
            if ctx.is_plausible(*only) {
                StageOutcome::Match {
                    node: *only,
                    score: ctx.geometry_score(*only),
                }
            } else {
                StageOutcome::Continue
            }
        }
        _ => {
            pool.narrow(stage, survivors);
            StageOutcome::Continue
        }
    }
}

pub struct DirectSelectorStage;

impl ResolutionStage for DirectSelectorStage {
    fn run(&self, ctx: &ResolutionContext<'_>, _pool: &mut CandidatePool) -> StageOutcome {
        let selector = ctx.anchor.selector.trim();
        if selector.is_empty() {
            return StageOutcome::Continue;
        }
        let matches = match ctx.doc.query_selector_all(selector) {
            Ok(matches) => matches,
            Err(err) => {
                debug!(selector, "stored selector does not parse: {}", err);
                return StageOutcome::Continue;
            }
        };
        match matches.as_slice() {
            [only]
                if ctx
                    .doc
                    .tag_name(*only)
                    .map(|tag| tag.eq_ignore_ascii_case(&ctx.anchor.tag_name))
                    .unwrap_or(false) =>
            {
                StageOutcome::Match {
                    node: *only,
                    score: None,
                }
            }
            other => {
                debug!(selector, matches = other.len(), "stored selector is broken");
                StageOutcome::Continue
            }
        }
    }

    fn kind(&self) -> ResolveStage {
        ResolveStage::DirectSelector
    }
}

pub struct ParentChainStage;

impl ParentChainStage {
    fn chain_matches(ctx: &ResolutionContext<'_>, node: NodeId, depth: usize) -> bool {
        let ancestors: Vec<NodeId> = ctx.doc.ancestors(node).take(depth).collect();
        if ancestors.len() < depth {
            return false;
        }
        ancestors
            .iter()
            .zip(&ctx.anchor.parent_chain)
            .all(|(ancestor, link)| {
                let tag_matches = ctx
                    .doc
                    .tag_name(*ancestor)
                    .map(|tag| tag.eq_ignore_ascii_case(&link.tag))
                    .unwrap_or(false);
                let classes_match = link.classes.is_empty()
                    || link
                        .classes
                        .iter()
                        .any(|class_name| ctx.doc.has_class(*ancestor, class_name));
                tag_matches && classes_match
            })
    }
}

impl ResolutionStage for ParentChainStage {
    fn run(&self, ctx: &ResolutionContext<'_>, pool: &mut CandidatePool) -> StageOutcome {
        let depth = ctx.policy.parent_match_depth.min(ctx.anchor.parent_chain.len());
        if depth == 0 {
            return StageOutcome::Continue;
        }
        let survivors = pool.filter(|node| Self::chain_matches(ctx, node, depth));
        settle(self.kind(), ctx, pool, survivors)
    }

    fn kind(&self) -> ResolveStage {
        ResolveStage::ParentChain
    }
}

pub struct TextContentStage;

impl ResolutionStage for TextContentStage {
    fn run(&self, ctx: &ResolutionContext<'_>, pool: &mut CandidatePool) -> StageOutcome {
        if ctx.anchor.text_snippet.is_empty() {
            return StageOutcome::Continue;
        }
        let survivors = pool.filter(|node| ctx.text_matches(node));
        if let [only] = survivors.as_slice() {
            if ctx.text_identifies(*only) {
                let score = ctx.geometry_score(*only);
                if score.map_or(true, |score| score <= ctx.text_match_radius()) {
                    return StageOutcome::Match { node: *only, score };
                }
                debug!(node = ?only, ?score, "text matches but element moved too far");
                return StageOutcome::Continue;
            }
        }
        settle(self.kind(), ctx, pool, survivors)
    }

    fn kind(&self) -> ResolveStage {
        ResolveStage::TextContent
    }
}

/// Never matches on its own; hands class-sharing candidates to the position stage.
pub struct ClassFilterStage;

impl ResolutionStage for ClassFilterStage {
    fn run(&self, ctx: &ResolutionContext<'_>, pool: &mut CandidatePool) -> StageOutcome {
        if ctx.anchor.classes.is_empty() {
            return StageOutcome::Continue;
        }
        let survivors = pool.filter(|node| {
            ctx.anchor
                .classes
                .iter()
                .any(|class_name| ctx.doc.has_class(node, class_name))
        });
        if !survivors.is_empty() && survivors.len() < pool.len() {
            pool.narrow(self.kind(), survivors);
        }
        StageOutcome::Continue
    }

    fn kind(&self) -> ResolveStage {
        ResolveStage::ClassFilter
    }
}

pub struct PositionStage;

impl ResolutionStage for PositionStage {
    fn run(&self, ctx: &ResolutionContext<'_>, pool: &mut CandidatePool) -> StageOutcome {
        let mut scored: Vec<(NodeId, f64)> = pool
            .candidates()
            .iter()
            .filter_map(|node| ctx.geometry_score(*node).map(|score| (*node, score)))
            .collect();
        if scored.is_empty() {
            debug!("no candidate carries comparable geometry");
            return StageOutcome::Continue;
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1));

        let (best, best_score) = scored[0];
        if let Some((_, runner_up)) = scored.get(1) {
            if (runner_up - best_score).abs() <= f64::EPSILON {
                debug!(score = best_score, "nearest candidates are tied");
                return StageOutcome::Continue;
            }
        }
        if !ctx.is_plausible(best) {
            return StageOutcome::Continue;
        }
        StageOutcome::Match {
            node: best,
            score: Some(best_score),
        }
    }

    fn kind(&self) -> ResolveStage {
        ResolveStage::Position
    }
}

/// Default stage cascade
pub fn default_stages() -> Vec<Box<dyn ResolutionStage>> {
    vec![
        Box::new(DirectSelectorStage),
        Box::new(ParentChainStage),
        Box::new(TextContentStage),
        Box::new(ClassFilterStage),
        Box::new(PositionStage),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParentLink;
    use dom_snapshot::Viewport;
    use serde_json::json;

    fn doc() -> Document {
        Document::from_json_value(json!({
            "viewport": { "width": 1000, "height": 800 },
            "root": {
                "tag": "html",
                "children": [{
                    "tag": "body",
                    "children": [
                        {
                            "tag": "ul", "attrs": { "class": "menu" },
                            "children": [
                                { "tag": "li", "attrs": { "class": "item" },
                                  "rect": { "x": 0, "y": 0, "width": 100, "height": 20 },
                                  "children": [{ "text": "Home" }] },
                                { "tag": "li", "attrs": { "class": "item" },
                                  "rect": { "x": 0, "y": 20, "width": 100, "height": 20 },
                                  "children": [{ "text": "About" }] }
                            ]
                        },
                        {
                            "tag": "ol",
                            "children": [
                                { "tag": "li",
                                  "rect": { "x": 0, "y": 400, "width": 100, "height": 20 },
                                  "children": [{ "text": "Home" }] }
                            ]
                        }
                    ]
                }]
            }
        }))
        .unwrap()
    }

    fn anchor(text: &str, y: f64) -> AnchorContext {
        AnchorContext {
            schema_version: 1,
            selector: "li.gone".to_string(),
            tag_name: "li".to_string(),
            classes: vec!["item".to_string()],
            text_snippet: text.to_string(),
            parent_chain: vec![ParentLink {
                tag: "ul".to_string(),
                classes: vec!["menu".to_string()],
            }],
            bounding_box: BoundingBox::new(0.0, y, 100.0, 20.0),
            viewport: Viewport {
                width: 1000.0,
                height: 800.0,
            },
        }
    }

    fn run(stage: &dyn ResolutionStage, doc: &Document, anchor: &AnchorContext) -> (StageOutcome, CandidatePool) {
        let policy = LocatorPolicy::default();
        let ctx = ResolutionContext {
            doc,
            anchor,
            policy: &policy,
        };
        let mut pool = CandidatePool::new(doc.elements_by_tag("li"));
        let outcome = stage.run(&ctx, &mut pool);
        (outcome, pool)
    }

    #[test]
    fn parent_chain_narrows_to_matching_subtree() {
        let doc = doc();
        let (outcome, pool) = run(&ParentChainStage, &doc, &anchor("Home", 0.0));
        assert_eq!(outcome, StageOutcome::Continue);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.narrowed_by(), &[ResolveStage::ParentChain]);
    }

    #[test]
    fn exact_text_tolerates_a_screenful_of_drift() {
        let doc = doc();
        let about = doc.elements_by_tag("li")[1];
        let (outcome, _) = run(&TextContentStage, &doc, &anchor("About", 20.0));
        assert_eq!(
            outcome,
            StageOutcome::Match {
                node: about,
                score: Some(0.0)
            }
        );

        // Well past the position threshold, within one viewport height.
        let (outcome, _) = run(&TextContentStage, &doc, &anchor("About", 700.0));
        assert_eq!(
            outcome,
            StageOutcome::Match {
                node: about,
                score: Some(680.0)
            }
        );

        let (outcome, _) = run(&TextContentStage, &doc, &anchor("About", 1500.0));
        assert_eq!(outcome, StageOutcome::Continue);
    }

    #[test]
    fn position_stage_prefers_nearest_and_refuses_ties() {
        let doc = doc();
        let items = doc.elements_by_tag("li");
        let (outcome, _) = run(&PositionStage, &doc, &anchor("Home", 390.0));
        assert_eq!(
            outcome,
            StageOutcome::Match {
                node: items[2],
                score: Some(10.0)
            }
        );

        // Equidistant from both menu items.
        let (outcome, _) = run(&PositionStage, &doc, &anchor("", 10.0));
        assert_eq!(outcome, StageOutcome::Continue);
    }

    #[test]
    fn expected_box_scales_with_viewport_width() {
        let doc = doc();
        let mut stored = anchor("Home", 0.0);
        stored.bounding_box = BoundingBox::new(200.0, 50.0, 400.0, 20.0);
        stored.viewport.width = 2000.0;
        let policy = LocatorPolicy::default();
        let ctx = ResolutionContext {
            doc: &doc,
            anchor: &stored,
            policy: &policy,
        };
        assert_eq!(ctx.expected_box(), BoundingBox::new(100.0, 50.0, 200.0, 20.0));
    }

    #[test]
    fn direct_selector_tolerates_parse_errors() {
        let doc = doc();
        let mut stored = anchor("Home", 0.0);
        stored.selector = "li[".to_string();
        let (outcome, _) = run(&DirectSelectorStage, &doc, &stored);
        assert_eq!(outcome, StageOutcome::Continue);

        stored.selector = "ol > li".to_string();
        let (outcome, _) = run(&DirectSelectorStage, &doc, &stored);
        assert_eq!(
            outcome,
            StageOutcome::Match {
                node: doc.elements_by_tag("li")[2],
                score: None
            }
        );
    }
}
