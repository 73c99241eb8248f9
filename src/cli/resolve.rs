use std::fs;
use std::path::PathBuf;

use anchor_locator::{
    structural_path, AnchorContext, AnchorResolver, DefaultAnchorResolver, LocatorPolicy,
    Resolution, ResolveStage,
};
use anyhow::{Context, Result};
use clap::Args;
use dom_snapshot::{snippet, Document};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::output::{emit, OutputFormat};
use super::runtime::{read_snapshot, write_json};

#[derive(Args, Clone, Debug)]
pub struct ResolveArgs {
    /// DOM snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    pub snapshot: PathBuf,

    /// Stored anchor (JSON), bare or as emitted by `synthesize --output json`
    #[arg(long, value_name = "FILE")]
    pub anchor: PathBuf,

    /// Write the anchor with its promoted selector to FILE
    #[arg(long, value_name = "FILE")]
    pub promote: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<ResolveStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Structural path of the matched element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidates_considered: Option<usize>,
}

pub fn cmd_resolve(args: ResolveArgs, policy: &LocatorPolicy, format: OutputFormat) -> Result<()> {
    let doc = read_snapshot(&args.snapshot)?;
    let mut anchor = read_anchor(&args)?;

    let resolver =
        DefaultAnchorResolver::try_new(policy.clone()).context("Rejected locator policy")?;
    let resolution = resolver
        .resolve_in_place(&doc, &mut anchor)
        .context("Failed to resolve anchor")?;

    if let Some(path) = &args.promote {
        match &resolution {
            Resolution::Found {
                promoted_selector: Some(selector),
                ..
            } => {
                write_json(path, &anchor)?;
                info!("Promoted anchor ({}) written to {}", selector, path.display());
            }
            _ => info!("No promotion; {} left untouched", path.display()),
        }
    }

    let report = build_report(&doc, resolution, policy.snippet_max_chars);
    emit(format, &report, render_human)
}

fn read_anchor(args: &ResolveArgs) -> Result<AnchorContext> {
    let content = fs::read_to_string(&args.anchor)
        .with_context(|| format!("Failed to read anchor {}", args.anchor.display()))?;
    let mut value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse anchor {}", args.anchor.display()))?;
    // Accept the full synthesize report as well as a bare anchor.
    let inner = value
        .get_mut("anchor")
        .filter(|inner| inner.is_object())
        .map(Value::take);
    if let Some(inner) = inner {
        value = inner;
    }
    serde_json::from_value(value)
        .with_context(|| format!("Invalid anchor in {}", args.anchor.display()))
}

fn build_report(doc: &Document, resolution: Resolution, max_chars: usize) -> ResolveReport {
    match resolution {
        Resolution::Found {
            node,
            stage,
            score,
            promoted_selector,
        } => ResolveReport {
            found: true,
            stage: Some(stage),
            score,
            element: structural_path(doc, node),
            text: Some(snippet(&doc.text_content(node), max_chars))
                .filter(|text| !text.is_empty()),
            promoted_selector,
            reason: None,
            candidates_considered: None,
        },
        Resolution::NotFound {
            reason,
            candidates_considered,
        } => {
            warn!("Anchor not found: {}", reason);
            ResolveReport {
                found: false,
                stage: None,
                score: None,
                element: None,
                text: None,
                promoted_selector: None,
                reason: Some(reason),
                candidates_considered: Some(candidates_considered),
            }
        }
    }
}

fn render_human(report: &ResolveReport) -> String {
    if !report.found {
        return format!(
            "Not found: {} ({} candidates considered)",
            report.reason.as_deref().unwrap_or("no match"),
            report.candidates_considered.unwrap_or(0)
        );
    }
    let mut lines = vec![format!(
        "Found: {}",
        report.element.as_deref().unwrap_or("<element>")
    )];
    if let Some(stage) = report.stage {
        lines.push(format!("Stage: {}", stage.name()));
    }
    if let Some(score) = report.score {
        lines.push(format!("Geometry score: {:.1}", score));
    }
    if let Some(text) = &report.text {
        lines.push(format!("Text: {}", text));
    }
    if let Some(selector) = &report.promoted_selector {
        lines.push(format!("Promoted selector: {}", selector));
    }
    lines.join("\n")
}
