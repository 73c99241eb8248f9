use anchor_locator::LocatorPolicy;
use anyhow::Result;

use super::output::{emit, OutputFormat};

pub fn cmd_policy(policy: &LocatorPolicy, format: OutputFormat) -> Result<()> {
    emit(format, policy, render_human)
}

fn render_human(policy: &LocatorPolicy) -> String {
    let mut lines = vec![
        format!(
            "Synthesis → max_classes={}, parent_context_classes={}, ancestor_depth={}",
            policy.max_classes, policy.parent_context_classes, policy.ancestor_depth
        ),
        format!(
            "Text → selector_tags=[{}], selector_max_len={}, snippet_max_chars={}",
            policy.text_selector_tags.join(", "),
            policy.text_selector_max_len,
            policy.snippet_max_chars
        ),
        format!(
            "Parent chain → capture_depth={}, match_depth={}",
            policy.parent_chain_depth, policy.parent_match_depth
        ),
        format!(
            "Geometry → threshold_px={}, size_penalty_weight={}, require_text_agreement={}",
            policy.position_threshold_px,
            policy.size_penalty_weight,
            policy.require_text_agreement
        ),
    ];
    lines.push(format!(
        "Markers → attribute={}, ui_attribute={}, internal_prefixes=[{}]",
        policy.marker_attribute,
        policy.ui_attribute,
        policy.internal_class_prefixes.join(", ")
    ));
    lines.push(format!(
        "Unique attributes → {}",
        policy.unique_attributes.join(", ")
    ));
    lines.join("\n")
}
