//! Locator policy: every tunable of synthesis and resolution.
//!
//! Loading layers built-in defaults, optional YAML files, then
//! `POINTA_LOCATOR__<FIELD>` environment overlays.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;
use tracing::debug;

const ENV_PREFIX: &str = "POINTA_LOCATOR__";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("io error: {0}")]
    Io(String),
    #[error("invalid policy: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocatorPolicy {
    /// Classes used by the stable-class selector
    pub max_classes: usize,
    /// Parent classes used by the parent-context selector
    pub parent_context_classes: usize,
    /// Ancestor levels walked by the ancestor-path selector
    pub ancestor_depth: usize,
    /// Tags eligible for the text-content selector
    pub text_selector_tags: Vec<String>,
    /// Text must be shorter than this to key a selector on it
    pub text_selector_max_len: usize,
    pub snippet_max_chars: usize,
    /// Ancestors recorded in an anchor
    pub parent_chain_depth: usize,
    /// Ancestors compared during parent-chain resolution
    pub parent_match_depth: usize,
    /// Maximum geometry score accepted by the resolver
    pub position_threshold_px: f64,
    pub size_penalty_weight: f64,
    /// Fallback candidates must agree with a non-empty text snippet
    pub require_text_agreement: bool,
    pub marker_attribute: String,
    /// Attribute the annotation UI puts on the nodes it injects
    pub ui_attribute: String,
    pub internal_class_prefixes: Vec<String>,
    pub unique_attributes: Vec<String>,
}

impl Default for LocatorPolicy {
    fn default() -> Self {
        Self {
            max_classes: 4,
            parent_context_classes: 2,
            ancestor_depth: 5,
            text_selector_tags: ["button", "a", "span", "div"]
                .into_iter()
                .map(String::from)
                .collect(),
            text_selector_max_len: 100,
            snippet_max_chars: 80,
            parent_chain_depth: 4,
            parent_match_depth: 3,
            position_threshold_px: 150.0,
            size_penalty_weight: 0.5,
            require_text_agreement: true,
            marker_attribute: "data-pointa-id".to_string(),
            ui_attribute: "data-pointa-ui".to_string(),
            internal_class_prefixes: vec!["pointa-".to_string()],
            unique_attributes: ["aria-label", "title", "data-testid", "data-test", "role"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl LocatorPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_classes == 0 {
            return Err(PolicyError::Invalid("max_classes must be > 0".into()));
        }
        if self.ancestor_depth == 0 {
            return Err(PolicyError::Invalid("ancestor_depth must be > 0".into()));
        }
        if self.snippet_max_chars == 0 {
            return Err(PolicyError::Invalid("snippet_max_chars must be > 0".into()));
        }
        if !(self.position_threshold_px.is_finite() && self.position_threshold_px > 0.0) {
            return Err(PolicyError::Invalid(format!(
                "position_threshold_px must be a positive number, got {}",
                self.position_threshold_px
            )));
        }
        if !(self.size_penalty_weight.is_finite() && self.size_penalty_weight >= 0.0) {
            return Err(PolicyError::Invalid(format!(
                "size_penalty_weight must be >= 0, got {}",
                self.size_penalty_weight
            )));
        }
        for (field, value) in [
            ("marker_attribute", &self.marker_attribute),
            ("ui_attribute", &self.ui_attribute),
        ] {
            let valid = !value.is_empty()
                && value
                    .chars()
                    .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
            if !valid {
                return Err(PolicyError::Invalid(format!(
                    "{field} must be a lowercase attribute name, got '{value}'"
                )));
            }
        }
        Ok(())
    }

    /// Whether a class belongs to the annotation UI itself.
    pub fn is_internal_class(&self, class_name: &str) -> bool {
        self.internal_class_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && class_name.starts_with(prefix.as_str()))
    }
}

#[derive(Debug, Default)]
pub struct LoadOptions {
    pub paths: Vec<PathBuf>,
    pub include_env: bool,
}

pub fn load_policy(path: Option<&Path>) -> Result<LocatorPolicy, PolicyError> {
    let mut options = LoadOptions {
        include_env: true,
        ..LoadOptions::default()
    };
    if let Some(p) = path {
        options.paths.push(p.to_path_buf());
    }
    load_policy_with_options(&options)
}

pub fn load_policy_with_options(options: &LoadOptions) -> Result<LocatorPolicy, PolicyError> {
    let mut value = serde_json::to_value(LocatorPolicy::default())
        .map_err(|err| PolicyError::Invalid(err.to_string()))?;

    for path in &options.paths {
        if path.exists() {
            let overlay = overlay_from_file(path)?;
            merge_values(&mut value, overlay);
            debug!(path = %path.display(), "applied locator policy file");
        }
    }

    if options.include_env {
        apply_env_overlays(&mut value, env::vars());
    }

    let policy: LocatorPolicy =
        serde_json::from_value(value).map_err(|err| PolicyError::Invalid(err.to_string()))?;
    policy.validate()?;
    Ok(policy)
}

fn overlay_from_file(path: &Path) -> Result<Value, PolicyError> {
    let content = fs::read_to_string(path).map_err(|err| PolicyError::Io(err.to_string()))?;
    if content.trim().is_empty() {
        return Ok(Value::Object(JsonMap::new()));
    }
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| PolicyError::Invalid(err.to_string()))?;
    let json_value =
        serde_json::to_value(yaml_value).map_err(|err| PolicyError::Invalid(err.to_string()))?;
    if !json_value.is_object() {
        return Err(PolicyError::Invalid(format!(
            "{} must contain a mapping",
            path.display()
        )));
    }
    Ok(json_value)
}

fn apply_env_overlays(value: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, raw) in vars {
        let Some(field) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let field = field.trim().to_ascii_lowercase();
        if field.is_empty() {
            continue;
        }
        if let Value::Object(map) = value {
            debug!(field = %field, "applied locator policy env override");
            map.insert(field, parse_env_value(&raw));
        }
    }
}

fn parse_env_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
        return parsed;
    }
    if let Ok(boolean) = raw.parse::<bool>() {
        return Value::Bool(boolean);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return Value::Number(int_val.into());
    }
    Value::String(raw.to_string())
}

fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_value() -> Value {
        serde_json::to_value(LocatorPolicy::default()).unwrap()
    }

    #[test]
    fn defaults_are_valid() {
        let policy = LocatorPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.max_classes, 4);
        assert_eq!(policy.marker_attribute, "data-pointa-id");
        assert!(policy.is_internal_class("pointa-highlight"));
        assert!(!policy.is_internal_class("btn"));
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locator.yaml");
        fs::write(
            &path,
            "position_threshold_px: 90.5\ninternal_class_prefixes:\n  - pointa-\n  - annot-\n",
        )
        .unwrap();

        let policy = load_policy_with_options(&LoadOptions {
            paths: vec![path],
            include_env: false,
        })
        .unwrap();
        assert_eq!(policy.position_threshold_px, 90.5);
        assert!(policy.is_internal_class("annot-badge"));
        assert_eq!(policy.max_classes, 4);
    }

    #[test]
    fn missing_file_is_ignored() {
        let policy = load_policy_with_options(&LoadOptions {
            paths: vec![PathBuf::from("/nonexistent/locator.yaml")],
            include_env: false,
        })
        .unwrap();
        assert_eq!(policy, LocatorPolicy::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locator.yaml");
        fs::write(&path, "postion_threshold_px: 10\n").unwrap();

        let err = load_policy_with_options(&LoadOptions {
            paths: vec![path],
            include_env: false,
        })
        .unwrap_err();
        assert!(matches!(err, PolicyError::Invalid(_)));
    }

    #[test]
    fn env_overlays_parse_typed_values() {
        let mut value = default_value();
        apply_env_overlays(
            &mut value,
            vec![
                ("POINTA_LOCATOR__MAX_CLASSES".to_string(), "2".to_string()),
                (
                    "POINTA_LOCATOR__REQUIRE_TEXT_AGREEMENT".to_string(),
                    "false".to_string(),
                ),
                (
                    "POINTA_LOCATOR__MARKER_ATTRIBUTE".to_string(),
                    "data-anchor-id".to_string(),
                ),
                ("UNRELATED".to_string(), "1".to_string()),
            ],
        );
        let policy: LocatorPolicy = serde_json::from_value(value).unwrap();
        assert_eq!(policy.max_classes, 2);
        assert!(!policy.require_text_agreement);
        assert_eq!(policy.marker_attribute, "data-anchor-id");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut policy = LocatorPolicy::default();
        policy.position_threshold_px = 0.0;
        assert!(policy.validate().is_err());

        let mut policy = LocatorPolicy::default();
        policy.marker_attribute = "Data Pointa".into();
        assert!(policy.validate().is_err());
    }
}
