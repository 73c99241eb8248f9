//! Error types for the DOM snapshot

use thiserror::Error;

use crate::document::NodeId;

/// DOM operation error
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomError {
    /// Node id does not exist in this document
    #[error("unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// Operation requires an element but got a text or document node
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    /// Insertion would create a cycle or target a node that cannot have children
    #[error("hierarchy request error: {0}")]
    HierarchyRequest(String),

    /// Snapshot could not be decoded
    #[error("invalid snapshot: {0}")]
    Snapshot(String),
}

/// Selector parse error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Empty selector string
    #[error("empty selector")]
    Empty,

    /// Syntax error at a character offset
    #[error("invalid selector '{selector}' at {offset}: {reason}")]
    Syntax {
        selector: String,
        offset: usize,
        reason: String,
    },

    /// Valid CSS that this engine does not evaluate
    #[error("unsupported selector feature '{feature}' in '{selector}'")]
    Unsupported { selector: String, feature: String },
}
