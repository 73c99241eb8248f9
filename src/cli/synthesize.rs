use std::path::PathBuf;

use anchor_locator::{AnchorContext, LocatorPolicy, SynthesisStrategy, Synthesizer};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use dom_snapshot::{Document, NodeId};
use serde::Serialize;
use tracing::info;

use super::output::{emit, OutputFormat};
use super::runtime::{read_snapshot, write_json};

#[derive(Args, Clone, Debug)]
pub struct SynthesizeArgs {
    /// DOM snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    pub snapshot: PathBuf,

    /// CSS selector picking the target element (first match)
    #[arg(long, conflicts_with = "index", required_unless_present = "index")]
    pub target: Option<String>,

    /// Position of the target among the document's elements, in document order
    #[arg(long)]
    pub index: Option<usize>,

    /// Write the (possibly marked) snapshot back to FILE
    #[arg(long, value_name = "FILE")]
    pub write_back: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeReport {
    pub strategy: SynthesisStrategy,
    pub marker_injected: bool,
    pub anchor: AnchorContext,
}

pub fn cmd_synthesize(
    args: SynthesizeArgs,
    policy: &LocatorPolicy,
    format: OutputFormat,
) -> Result<()> {
    let mut doc = read_snapshot(&args.snapshot)?;
    let target = pick_target(&doc, &args)?;

    let synthesis = Synthesizer::try_new(policy.clone())
        .context("Rejected locator policy")?
        .synthesize(&mut doc, target)
        .context("Failed to synthesize anchor")?;

    if let Some(path) = &args.write_back {
        let snapshot = doc.to_snapshot().context("Failed to serialize snapshot")?;
        write_json(path, &snapshot)?;
        info!("Snapshot written to {}", path.display());
    }

    let report = SynthesizeReport {
        strategy: synthesis.strategy,
        marker_injected: synthesis.marker_injected,
        anchor: synthesis.anchor,
    };
    emit(format, &report, render_human)
}

fn pick_target(doc: &Document, args: &SynthesizeArgs) -> Result<NodeId> {
    if let Some(selector) = &args.target {
        return doc
            .query_selector(selector)
            .with_context(|| format!("Invalid target selector {selector}"))?
            .ok_or_else(|| anyhow!("No element matches {selector}"));
    }
    let index = args
        .index
        .ok_or_else(|| anyhow!("Either --target or --index is required"))?;
    let elements = doc.elements();
    elements.get(index).copied().ok_or_else(|| {
        anyhow!(
            "Element index {index} out of range ({} elements)",
            elements.len()
        )
    })
}

fn render_human(report: &SynthesizeReport) -> String {
    let anchor = &report.anchor;
    let mut lines = vec![
        format!("Selector: {}", anchor.selector),
        format!("Strategy: {}", report.strategy.name()),
        format!("Tag: {}", anchor.tag_name),
    ];
    if !anchor.classes.is_empty() {
        lines.push(format!("Classes: {}", anchor.classes.join(" ")));
    }
    if !anchor.text_snippet.is_empty() {
        lines.push(format!("Text: {}", anchor.text_snippet));
    }
    if !anchor.parent_chain.is_empty() {
        let chain: Vec<&str> = anchor
            .parent_chain
            .iter()
            .map(|link| link.tag.as_str())
            .collect();
        lines.push(format!("Parents: {}", chain.join(" < ")));
    }
    if report.marker_injected {
        lines.push("Marker attribute injected into the document".to_string());
    }
    lines.join("\n")
}
