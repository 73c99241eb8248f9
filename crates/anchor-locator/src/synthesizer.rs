//! Selector synthesizer: element to anchor context

use dom_snapshot::{Document, NodeId};
use tracing::{debug, info, warn};

use crate::capture::capture_context;
use crate::errors::LocatorError;
use crate::policy::LocatorPolicy;
use crate::selector_forms::{marker_selector, mint_marker_token, structural_path};
use crate::stability::StabilityFilter;
use crate::strategies::{default_strategies, SelectorStrategy, SynthesisContext};
use crate::types::{AnchorContext, Synthesis, SynthesisStrategy};
use crate::verify::{verify_selector, Verdict};

/// Turns elements into anchors.
pub struct Synthesizer {
    policy: LocatorPolicy,
    filter: StabilityFilter,
    strategies: Vec<Box<dyn SelectorStrategy>>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(LocatorPolicy::default())
    }
}

impl Synthesizer {
    pub fn new(policy: LocatorPolicy) -> Self {
        Self::with_strategies(policy, default_strategies())
    }

    /// Like [`Synthesizer::new`], but rejects an inconsistent policy.
    pub fn try_new(policy: LocatorPolicy) -> Result<Self, LocatorError> {
        policy.validate()?;
        Ok(Self::new(policy))
    }

    /// Build with a custom strategy cascade. The marker fallback always runs last.
    pub fn with_strategies(
        policy: LocatorPolicy,
        strategies: Vec<Box<dyn SelectorStrategy>>,
    ) -> Self {
        let filter = StabilityFilter::new(&policy);
        Self {
            policy,
            filter,
            strategies,
        }
    }

    pub fn policy(&self) -> &LocatorPolicy {
        &self.policy
    }

    pub fn filter(&self) -> &StabilityFilter {
        &self.filter
    }

    /// Synthesize an anchor for `node`.
    ///
    /// Tries every strategy in order and returns the first selector that
    /// matches exactly `node`. When none does, tags the element with a marker
    /// attribute; `Synthesis::marker_injected` reports whether that happened.
    pub fn synthesize(&self, doc: &mut Document, node: NodeId) -> Result<Synthesis, LocatorError> {
        self.check_target(doc, node)?;
        let mut anchor = capture_context(doc, node, &self.policy, &self.filter)?;

        if let Some((strategy, selector)) = self.find_selector(doc, node) {
            info!(
                "Synthesized selector using {} strategy: {}",
                strategy.name(),
                selector
            );
            anchor.selector = selector;
            return Ok(Synthesis {
                anchor,
                strategy,
                marker_injected: false,
            });
        }

        if let Some(selector) = self.existing_marker(doc, node) {
            info!("Reusing existing marker: {}", selector);
            anchor.selector = selector;
            return Ok(Synthesis {
                anchor,
                strategy: SynthesisStrategy::Marker,
                marker_injected: false,
            });
        }

        let token = mint_marker_token();
        doc.set_attr(node, &self.policy.marker_attribute, &token)?;
        let selector = marker_selector(&self.policy.marker_attribute, &token);
        let verdict = verify_selector(doc, &selector, Some(node));
        if !verdict.is_unique() {
            warn!(selector = %selector, verdict = %verdict.describe(), "minted marker is not unique");
        }
        warn!(
            tag = %anchor.tag_name,
            "No structural selector was unique; injected marker {}",
            selector
        );
        anchor.selector = selector;
        Ok(Synthesis {
            anchor,
            strategy: SynthesisStrategy::Marker,
            marker_injected: true,
        })
    }

    /// Side-effect-free variant of [`Synthesizer::synthesize`].
    ///
    /// Falls back to an existing marker, then to a structural path, instead
    /// of writing a marker. The selector is unique only when one of the
    /// strategies succeeded.
    pub fn describe(&self, doc: &Document, node: NodeId) -> Result<AnchorContext, LocatorError> {
        self.check_target(doc, node)?;
        let mut anchor = capture_context(doc, node, &self.policy, &self.filter)?;
        anchor.selector = match self.find_selector(doc, node) {
            Some((_, selector)) => selector,
            None => self
                .existing_marker(doc, node)
                .or_else(|| structural_path(doc, node))
                .unwrap_or_else(|| anchor.tag_name.clone()),
        };
        Ok(anchor)
    }

    fn check_target(&self, doc: &Document, node: NodeId) -> Result<(), LocatorError> {
        if !doc.is_element(node) {
            return Err(LocatorError::InvalidTarget(format!(
                "{:?} is not an element",
                node
            )));
        }
        if !doc.is_connected(node) {
            return Err(LocatorError::InvalidTarget(format!(
                "{:?} is not attached to the document",
                node
            )));
        }
        Ok(())
    }

    fn find_selector(&self, doc: &Document, node: NodeId) -> Option<(SynthesisStrategy, String)> {
        let tag = doc.tag_name(node)?;
        let ctx = SynthesisContext {
            doc,
            target: node,
            tag,
            policy: &self.policy,
            filter: &self.filter,
        };

        for strategy in &self.strategies {
            debug!("Trying strategy: {}", strategy.name());
            for candidate in strategy.propose(&ctx) {
                match verify_selector(doc, &candidate, Some(node)) {
                    Verdict::Unique(_) => return Some((strategy.kind(), candidate)),
                    verdict => {
                        debug!(
                            strategy = strategy.name(),
                            selector = %candidate,
                            "rejected: {}",
                            verdict.describe()
                        );
                    }
                }
            }
        }
        None
    }

    fn existing_marker(&self, doc: &Document, node: NodeId) -> Option<String> {
        let token = doc
            .attr(node, &self.policy.marker_attribute)
            .filter(|token| !token.trim().is_empty())?;
        let selector = marker_selector(&self.policy.marker_attribute, token);
        verify_selector(doc, &selector, Some(node))
            .is_unique()
            .then_some(selector)
    }
}
