//! Selector synthesis strategies
//!
//! Seven side-effect-free strategies in cascade order:
//! 1. Id - `#id`
//! 2. Unique attribute - `tag[attr="value"]`
//! 3. Text content - `tag:text-digest(hex)`
//! 4. Stable classes - `tag.c1.c2`
//! 5. Parent context - `parent.p1 > tag.c1`
//! 6. Sibling index - `parent.p1 > tag:nth-of-type(n)`
//! 7. Ancestor path - up to N ancestor levels joined by `>`
//!
//! Strategies only propose selectors. The synthesizer verifies each proposal
//! and owns the marker fallback, which is the one step that writes to the DOM.

use dom_snapshot::{escape_attr_value, text_digest, Document, NodeId};
use tracing::debug;

use crate::policy::LocatorPolicy;
use crate::selector_forms::{
    attribute_selector, class_selector, id_selector, nth_of_type_selector,
};
use crate::stability::StabilityFilter;
use crate::types::SynthesisStrategy;

/// Inputs shared by every strategy for one synthesis call.
pub struct SynthesisContext<'a> {
    pub doc: &'a Document,
    pub target: NodeId,
    pub tag: &'a str,
    pub policy: &'a LocatorPolicy,
    pub filter: &'a StabilityFilter,
}

impl<'a> SynthesisContext<'a> {
    fn stable_classes(&self, node: NodeId, limit: usize) -> Vec<String> {
        self.filter.stable_classes(self.doc, node, limit)
    }
}

/// Strategy trait for selector synthesis
pub trait SelectorStrategy: Send + Sync {
    /// Candidate selectors, most specific first. Empty when the strategy does not apply.
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String>;

    fn kind(&self) -> SynthesisStrategy;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

pub struct IdStrategy;

impl SelectorStrategy for IdStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        ctx.doc
            .id_attr(ctx.target)
            .map(|id| vec![id_selector(id)])
            .unwrap_or_default()
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::Id
    }
}

pub struct UniqueAttributeStrategy;

impl SelectorStrategy for UniqueAttributeStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        ctx.policy
            .unique_attributes
            .iter()
            .filter_map(|attr| {
                let value = ctx.doc.attr(ctx.target, attr)?;
                (!value.trim().is_empty()).then(|| attribute_selector(ctx.tag, attr, value))
            })
            .collect()
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::UniqueAttribute
    }
}

/// Keys on a digest of the normalized text so raw text never lands in a selector.
pub struct TextContentStrategy;

impl SelectorStrategy for TextContentStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        if !ctx
            .policy
            .text_selector_tags
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(ctx.tag))
        {
            return Vec::new();
        }
        let text = ctx.doc.normalized_text(ctx.target);
        if text.is_empty() || text.chars().count() >= ctx.policy.text_selector_max_len {
            return Vec::new();
        }
        let same_text = ctx
            .doc
            .elements_by_tag(ctx.tag)
            .into_iter()
            .filter(|node| ctx.doc.normalized_text(*node) == text)
            .count();
        if same_text != 1 {
            debug!(tag = ctx.tag, same_text, "text is not unique for tag");
            return Vec::new();
        }
        vec![format!("{}:text-digest({})", ctx.tag, text_digest(&text))]
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::TextContent
    }
}

pub struct StableClassStrategy;

impl SelectorStrategy for StableClassStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        let classes = ctx.stable_classes(ctx.target, ctx.policy.max_classes);
        if classes.is_empty() {
            return Vec::new();
        }
        vec![class_selector(ctx.tag, &classes)]
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::StableClasses
    }
}

pub struct ParentContextStrategy;

impl SelectorStrategy for ParentContextStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        let Some(parent) = ctx.doc.parent_element(ctx.target) else {
            return Vec::new();
        };
        let Some(parent_tag) = ctx.doc.tag_name(parent) else {
            return Vec::new();
        };
        let parent_classes = ctx.stable_classes(parent, ctx.policy.parent_context_classes);
        if parent_classes.is_empty() {
            return Vec::new();
        }
        let own = class_selector(ctx.tag, &ctx.stable_classes(ctx.target, ctx.policy.max_classes));
        vec![format!(
            "{} > {}",
            class_selector(parent_tag, &parent_classes),
            own
        )]
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::ParentContext
    }
}

pub struct SiblingIndexStrategy;

impl SelectorStrategy for SiblingIndexStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        let Some(parent) = ctx.doc.parent_element(ctx.target) else {
            return Vec::new();
        };
        let (Some(parent_tag), Some(step)) = (
            ctx.doc.tag_name(parent),
            nth_of_type_selector(ctx.doc, ctx.target),
        ) else {
            return Vec::new();
        };

        let mut parent_forms = Vec::new();
        let parent_classes = ctx.stable_classes(parent, ctx.policy.parent_context_classes);
        if !parent_classes.is_empty() {
            parent_forms.push(class_selector(parent_tag, &parent_classes));
        }
        if let Some(id) = ctx.doc.id_attr(parent) {
            parent_forms.push(id_selector(id));
        }
        parent_forms
            .into_iter()
            .map(|parent_form| format!("{parent_form} > {step}"))
            .collect()
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::SiblingIndex
    }
}

/// Walks up the tree, prepending one level at a time so the shortest
/// unique path is proposed first. The target's own step comes first.
pub struct AncestorPathStrategy;

impl AncestorPathStrategy {
    fn level_step(ctx: &SynthesisContext<'_>, node: NodeId) -> Option<String> {
        let tag = ctx.doc.tag_name(node)?;
        let classes = ctx.stable_classes(node, ctx.policy.max_classes);
        if !classes.is_empty() {
            return Some(class_selector(tag, &classes));
        }
        if let Some(id) = ctx.doc.id_attr(node) {
            return Some(format!("{tag}{}", id_selector(id)));
        }
        if let Some(role) = ctx.doc.attr(node, "role").filter(|role| !role.trim().is_empty()) {
            return Some(attribute_selector(tag, "role", role));
        }
        if let Some(signature) = ctx.doc.attr(node, "style").and_then(gradient_signature) {
            let mut step = tag.to_string();
            for fragment in signature {
                step.push_str(&format!("[style*=\"{}\"]", escape_attr_value(&fragment)));
            }
            return Some(step);
        }
        nth_of_type_selector(ctx.doc, node)
    }
}

impl SelectorStrategy for AncestorPathStrategy {
    fn propose(&self, ctx: &SynthesisContext<'_>) -> Vec<String> {
        let Some(target_step) = Self::level_step(ctx, ctx.target) else {
            return Vec::new();
        };
        let mut proposals = vec![target_step.clone()];
        let mut steps = vec![target_step];

        for ancestor in ctx.doc.ancestors(ctx.target).take(ctx.policy.ancestor_depth) {
            let Some(tag) = ctx.doc.tag_name(ancestor) else {
                break;
            };
            if tag == "body" || tag == "html" {
                steps.insert(0, tag.to_string());
                proposals.push(steps.join(" > "));
                break;
            }
            let Some(step) = Self::level_step(ctx, ancestor) else {
                break;
            };
            steps.insert(0, step);
            proposals.push(steps.join(" > "));
        }
        proposals
    }

    fn kind(&self) -> SynthesisStrategy {
        SynthesisStrategy::AncestorPath
    }
}

/// Default strategy cascade
pub fn default_strategies() -> Vec<Box<dyn SelectorStrategy>> {
    vec![
        Box::new(IdStrategy),
        Box::new(UniqueAttributeStrategy),
        Box::new(TextContentStrategy),
        Box::new(StableClassStrategy),
        Box::new(ParentContextStrategy),
        Box::new(SiblingIndexStrategy),
        Box::new(AncestorPathStrategy),
    ]
}

/// Substrings identifying a `linear-gradient` background: the gradient
/// keyword plus its first and last colour stops.
pub fn gradient_signature(style: &str) -> Option<Vec<String>> {
    const KEYWORD: &str = "linear-gradient(";
    let start = style.find(KEYWORD)? + KEYWORD.len();
    let args = balanced_args(&style[start..])?;
    let stops: Vec<&str> = split_top_level(args)
        .into_iter()
        .map(str::trim)
        .filter(|arg| !arg.is_empty() && !is_gradient_direction(arg))
        .collect();
    let first = stop_color(stops.first()?)?;
    let last = stop_color(stops.last()?)?;

    let mut fragments = vec!["linear-gradient".to_string(), first];
    if !fragments.contains(&last) {
        fragments.push(last);
    }
    Some(fragments)
}

// Content up to the parenthesis closing the one already consumed.
fn balanced_args(rest: &str) -> Option<&str> {
    let mut depth = 1usize;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..idx]);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in args.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&args[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}

fn is_gradient_direction(arg: &str) -> bool {
    if arg.starts_with("to ") {
        return true;
    }
    let numeric = arg.starts_with(|ch: char| ch.is_ascii_digit() || ch == '-' || ch == '.');
    numeric && ["deg", "turn", "rad", "grad"].iter().any(|unit| arg.ends_with(unit))
}

// Colour part of a stop, without its position.
fn stop_color(stop: &str) -> Option<String> {
    let stop = stop.trim();
    if let Some(open) = stop.find('(') {
        let close = stop.find(')')?;
        return (close > open).then(|| stop[..=close].to_string());
    }
    stop.split_whitespace().next().map(String::from)
}
