//! Uniqueness verification shared by every synthesis strategy and by promotion.

use dom_snapshot::{Document, NodeId};

/// Outcome of running a candidate selector against the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Exactly one node, and it is the expected one when a target was given
    Unique(NodeId),
    NoMatch,
    Ambiguous(usize),
    /// Exactly one node, but not the target
    WrongMatch(NodeId),
    Invalid(String),
}

impl Verdict {
    pub fn is_unique(&self) -> bool {
        matches!(self, Verdict::Unique(_))
    }

    pub fn describe(&self) -> String {
        match self {
            Verdict::Unique(node) => format!("unique ({:?})", node),
            Verdict::NoMatch => "no match".to_string(),
            Verdict::Ambiguous(count) => format!("ambiguous ({count} matches)"),
            Verdict::WrongMatch(node) => format!("wrong match ({:?})", node),
            Verdict::Invalid(reason) => format!("invalid selector: {reason}"),
        }
    }
}

pub fn verify_selector(doc: &Document, selector: &str, target: Option<NodeId>) -> Verdict {
    let matches = match doc.query_selector_all(selector) {
        Ok(matches) => matches,
        Err(err) => return Verdict::Invalid(err.to_string()),
    };
    match matches.as_slice() {
        [] => Verdict::NoMatch,
        [only] => match target {
            Some(expected) if expected != *only => Verdict::WrongMatch(*only),
            _ => Verdict::Unique(*only),
        },
        many => Verdict::Ambiguous(many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Document {
        Document::from_json_value(json!({
            "root": {
                "tag": "html",
                "children": [{
                    "tag": "body",
                    "children": [
                        { "tag": "button", "attrs": { "id": "save", "class": "btn" } },
                        { "tag": "button", "attrs": { "class": "btn" } }
                    ]
                }]
            }
        }))
        .unwrap()
    }

    #[test]
    fn unique_match_against_target() {
        let doc = doc();
        let buttons = doc.elements_by_tag("button");
        assert_eq!(
            verify_selector(&doc, "#save", Some(buttons[0])),
            Verdict::Unique(buttons[0])
        );
        assert_eq!(
            verify_selector(&doc, "#save", Some(buttons[1])),
            Verdict::WrongMatch(buttons[0])
        );
        assert_eq!(verify_selector(&doc, "#save", None), Verdict::Unique(buttons[0]));
    }

    #[test]
    fn ambiguous_missing_and_invalid() {
        let doc = doc();
        assert_eq!(verify_selector(&doc, "button.btn", None), Verdict::Ambiguous(2));
        assert_eq!(verify_selector(&doc, "a", None), Verdict::NoMatch);
        assert!(matches!(
            verify_selector(&doc, "button[", None),
            Verdict::Invalid(_)
        ));
    }
}
