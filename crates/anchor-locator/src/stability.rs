//! Class stability heuristics.
//!
//! Utility-CSS frameworks and CSS-module tooling emit class names that are
//! either state-dependent or build-hash-dependent. Those must never end up
//! in a persisted selector.

use dom_snapshot::{Document, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::policy::LocatorPolicy;

static STATE_VARIANT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[a-z0-9-]+:)*(?:hover|focus|focus-within|focus-visible|active|disabled|visited|checked|selected|open|group-[a-z-]+|peer-[a-z-]+|aria-[a-z-]+|data-[a-z-]+):",
    )
    .expect("valid class pattern")
});

static ANIMATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9-]+:)*-?(?:animate|animation|transition|duration|delay|ease)(?:-|$)")
        .expect("valid class pattern")
});

static HASH_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{8,}$").expect("valid class pattern"));

// `Button_primary__3xK9a` style CSS-module output.
static CSS_MODULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9-]*_[A-Za-z0-9-]+__[A-Za-z0-9_-]{4,}$")
        .expect("valid class pattern")
});

// Emotion / styled-components output: `css-1x2y3z`, `sc-bdVaJa`.
static CSS_IN_JS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:css|sc|jsx|emotion)-[A-Za-z0-9]{4,}(?:-[A-Za-z0-9]+)*$")
        .expect("valid class pattern")
});

/// Decides which classes are safe to persist.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    internal_prefixes: Vec<String>,
}

impl StabilityFilter {
    pub fn new(policy: &LocatorPolicy) -> Self {
        Self {
            internal_prefixes: policy
                .internal_class_prefixes
                .iter()
                .filter(|prefix| !prefix.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Classes injected by the annotation UI.
    pub fn is_internal(&self, class_name: &str) -> bool {
        self.internal_prefixes
            .iter()
            .any(|prefix| class_name.starts_with(prefix.as_str()))
    }

    /// State-variant or animation classes that come and go with interaction.
    pub fn is_transient(&self, class_name: &str) -> bool {
        STATE_VARIANT.is_match(class_name) || ANIMATION.is_match(class_name)
    }

    /// Build-generated names that change between deployments.
    pub fn is_generated(&self, class_name: &str) -> bool {
        if HASH_LIKE.is_match(class_name) && class_name.chars().any(|ch| ch.is_ascii_digit()) {
            return true;
        }
        if CSS_MODULE.is_match(class_name) {
            return true;
        }
        // `css-grid` is a real name; generated suffixes carry digits or capitals.
        CSS_IN_JS.is_match(class_name)
            && class_name
                .split_once('-')
                .map(|(_, suffix)| {
                    suffix
                        .chars()
                        .any(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase())
                })
                .unwrap_or(false)
    }

    pub fn is_stable(&self, class_name: &str) -> bool {
        !class_name.is_empty()
            && !class_name.contains("--")
            && !class_name.contains('[')
            && !class_name.contains(']')
            && !self.is_internal(class_name)
            && !self.is_transient(class_name)
            && !self.is_generated(class_name)
    }

    /// Class list recorded in an anchor: everything except internal and
    /// transient classes, deduplicated, in document order.
    pub fn recorded_classes(&self, doc: &Document, node: NodeId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for class_name in doc.classes(node) {
            if self.is_internal(class_name) || self.is_transient(class_name) {
                continue;
            }
            if !out.iter().any(|seen| seen == class_name) {
                out.push(class_name.to_string());
            }
        }
        out
    }

    /// Up to `limit` stable classes of `node`, deduplicated, in document order.
    pub fn stable_classes(&self, doc: &Document, node: NodeId, limit: usize) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for class_name in doc.classes(node) {
            if out.len() >= limit {
                break;
            }
            if self.is_stable(class_name) && !out.iter().any(|seen| seen == class_name) {
                out.push(class_name.to_string());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filter() -> StabilityFilter {
        StabilityFilter::new(&LocatorPolicy::default())
    }

    #[test]
    fn semantic_classes_are_stable() {
        let filter = filter();
        for class_name in ["btn", "primary", "card-title", "container", "navigation", "nav_item"] {
            assert!(filter.is_stable(class_name), "{class_name} should be stable");
        }
    }

    #[test]
    fn state_variants_are_rejected() {
        let filter = filter();
        for class_name in [
            "hover:bg-blue-500",
            "focus:outline-none",
            "active:scale-95",
            "disabled:opacity-50",
            "md:hover:underline",
            "group-hover:text-white",
        ] {
            assert!(filter.is_transient(class_name), "{class_name}");
            assert!(!filter.is_stable(class_name), "{class_name}");
        }
        assert!(!filter.is_transient("md:flex"));
    }

    #[test]
    fn animation_classes_are_rejected() {
        let filter = filter();
        for class_name in ["animate-spin", "transition-all", "duration-300", "ease-in-out", "delay-150"] {
            assert!(!filter.is_stable(class_name), "{class_name}");
        }
        assert!(filter.is_stable("easel"));
    }

    #[test]
    fn generated_names_are_rejected() {
        let filter = filter();
        for class_name in [
            "a1b2c3d4e5",
            "x7k2m9q4",
            "Button_primary__3xK9a",
            "css-1x2y3z4",
            "sc-bdVaJa",
        ] {
            assert!(filter.is_generated(class_name), "{class_name}");
            assert!(!filter.is_stable(class_name), "{class_name}");
        }
    }

    #[test]
    fn hash_tokens_need_a_digit() {
        let filter = filter();
        // Long all-letter names read as words, even when they are not.
        assert!(!filter.is_generated("dropdown"));
        assert!(!filter.is_generated("abcdefgh"));
        assert!(filter.is_generated("abcdefg1"));
        // Too short to be a build hash.
        assert!(!filter.is_generated("a1b2c3d"));
    }

    #[test]
    fn modifier_and_arbitrary_value_syntax_is_rejected() {
        let filter = filter();
        assert!(!filter.is_stable("btn--large"));
        assert!(!filter.is_stable("w-[327px]"));
        assert!(!filter.is_stable("pointa-highlight"));
        assert!(filter.is_stable("css-grid"));
    }

    #[test]
    fn recorded_classes_keep_generated_but_drop_internal_names() {
        let doc = Document::from_json_value(json!({
            "root": {
                "tag": "html",
                "children": [{
                    "tag": "button",
                    "attrs": { "class": "btn hover:bg-red pointa-highlight a1b2c3d4e5 primary btn" }
                }]
            }
        }))
        .unwrap();
        let button = doc.elements_by_tag("button")[0];
        let filter = filter();

        assert_eq!(
            filter.recorded_classes(&doc, button),
            vec!["btn", "a1b2c3d4e5", "primary"]
        );
        assert_eq!(filter.stable_classes(&doc, button, 4), vec!["btn", "primary"]);
        assert_eq!(filter.stable_classes(&doc, button, 1), vec!["btn"]);
    }
}
