//! Error types for the locator system
//!
//! Ambiguous and wrong matches never surface here: strategies absorb them and
//! the cascade moves on. A resolver that runs out of stages reports
//! `Resolution::NotFound`, which is a normal result rather than an error.

use dom_snapshot::DomError;
use thiserror::Error;

use crate::policy::PolicyError;

/// Locator error enumeration
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocatorError {
    /// Stored anchor is missing required data or uses an unknown schema
    #[error("Malformed anchor: {0}")]
    MalformedAnchor(String),

    /// Synthesis target is not a connected element
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Position delta parent could not be resolved to exactly one element
    #[error("Parent unresolved: {0}")]
    ParentUnresolved(String),

    /// Underlying DOM mutation failed
    #[error("DOM error: {0}")]
    Dom(#[from] DomError),

    /// Policy could not be loaded or validated
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),
}

impl LocatorError {
    /// Data-integrity problems upstream of this crate, as opposed to page drift.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            LocatorError::MalformedAnchor(_) | LocatorError::InvalidTarget(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_errors_are_flagged() {
        assert!(LocatorError::MalformedAnchor("no tag".into()).is_integrity_error());
        assert!(!LocatorError::ParentUnresolved("body > ul".into()).is_integrity_error());
    }

    #[test]
    fn display_includes_context() {
        let err = LocatorError::MalformedAnchor("tagName is empty".into());
        assert_eq!(err.to_string(), "Malformed anchor: tagName is empty");
    }
}
