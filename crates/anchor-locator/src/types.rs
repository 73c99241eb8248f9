//! Core types for the locator system

use dom_snapshot::{BoundingBox, NodeId, Viewport};
use serde::{Deserialize, Serialize};

use crate::errors::LocatorError;

/// Schema version written into every new anchor.
pub const ANCHOR_SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    ANCHOR_SCHEMA_VERSION
}

/// One ancestor in an anchor's parent chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
}

/// Portable identity record for one element.
///
/// `selector` is the primary handle. Every other field is an independent
/// signal the resolver falls back on once the selector stops matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorContext {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub selector: String,

    #[serde(default)]
    pub tag_name: String,

    /// Class list without internal or transient classes
    #[serde(default)]
    pub classes: Vec<String>,

    /// Leading normalized text, length-capped
    #[serde(default)]
    pub text_snippet: String,

    /// Ancestors, nearest first
    #[serde(default)]
    pub parent_chain: Vec<ParentLink>,

    #[serde(default)]
    pub bounding_box: BoundingBox,

    #[serde(default)]
    pub viewport: Viewport,
}

impl AnchorContext {
    /// Reject anchors the resolver cannot reason about.
    pub fn validate(&self) -> Result<(), LocatorError> {
        if self.schema_version == 0 || self.schema_version > ANCHOR_SCHEMA_VERSION {
            return Err(LocatorError::MalformedAnchor(format!(
                "unsupported schemaVersion {} (supported: 1..={})",
                self.schema_version, ANCHOR_SCHEMA_VERSION
            )));
        }
        if self.tag_name.trim().is_empty() {
            return Err(LocatorError::MalformedAnchor(
                "tagName is missing or empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn has_geometry(&self) -> bool {
        !self.bounding_box.is_empty()
    }
}

/// Synthesis strategy enumeration, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SynthesisStrategy {
    Id,
    UniqueAttribute,
    TextContent,
    StableClasses,
    ParentContext,
    SiblingIndex,
    AncestorPath,
    Marker,
}

impl SynthesisStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SynthesisStrategy::Id => "id",
            SynthesisStrategy::UniqueAttribute => "unique-attribute",
            SynthesisStrategy::TextContent => "text-content",
            SynthesisStrategy::StableClasses => "stable-classes",
            SynthesisStrategy::ParentContext => "parent-context",
            SynthesisStrategy::SiblingIndex => "sibling-index",
            SynthesisStrategy::AncestorPath => "ancestor-path",
            SynthesisStrategy::Marker => "marker",
        }
    }
}

/// Result of synthesizing an anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub anchor: AnchorContext,

    /// Strategy that produced the selector
    pub strategy: SynthesisStrategy,

    /// Whether synthesis wrote a marker attribute onto the element
    pub marker_injected: bool,
}

/// Resolution cascade stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveStage {
    DirectSelector,
    ParentChain,
    TextContent,
    ClassFilter,
    Position,
}

impl ResolveStage {
    pub fn name(&self) -> &'static str {
        match self {
            ResolveStage::DirectSelector => "direct-selector",
            ResolveStage::ParentChain => "parent-chain",
            ResolveStage::TextContent => "text-content",
            ResolveStage::ClassFilter => "class-filter",
            ResolveStage::Position => "position",
        }
    }

    pub fn cascade() -> Vec<ResolveStage> {
        vec![
            ResolveStage::DirectSelector,
            ResolveStage::ParentChain,
            ResolveStage::TextContent,
            ResolveStage::ClassFilter,
            ResolveStage::Position,
        ]
    }
}

/// Outcome of resolving an anchor.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Found {
        node: NodeId,

        /// Stage that produced the match
        stage: ResolveStage,

        /// Geometry score when geometry was consulted
        score: Option<f64>,

        /// Durable selector to store when the original one broke
        promoted_selector: Option<String>,
    },
    NotFound {
        reason: String,

        /// Candidates of the anchor's tag present in the document
        candidates_considered: usize,
    },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    pub fn node(&self) -> Option<NodeId> {
        match self {
            Resolution::Found { node, .. } => Some(*node),
            Resolution::NotFound { .. } => None,
        }
    }

    pub fn stage(&self) -> Option<ResolveStage> {
        match self {
            Resolution::Found { stage, .. } => Some(*stage),
            Resolution::NotFound { .. } => None,
        }
    }
}

/// Where an element sat before a drag started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSnapshot {
    pub parent_path: String,

    /// Index among same-tag, non-UI siblings
    pub index: usize,

    /// Next non-UI element sibling, if any
    pub sibling_ref: Option<AnchorContext>,
}

/// A recorded move from one DOM location to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDelta {
    pub old_parent_path: String,
    pub old_index: usize,
    pub old_sibling_ref: Option<AnchorContext>,
    pub new_parent_path: String,
    pub new_index: usize,
    pub new_sibling_ref: Option<AnchorContext>,
}

impl PositionDelta {
    pub fn from_snapshots(old: PositionSnapshot, new: PositionSnapshot) -> Self {
        Self {
            old_parent_path: old.parent_path,
            old_index: old.index,
            old_sibling_ref: old.sibling_ref,
            new_parent_path: new.parent_path,
            new_index: new.index,
            new_sibling_ref: new.sibling_ref,
        }
    }
}
