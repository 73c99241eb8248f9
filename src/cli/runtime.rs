use std::fs;
use std::path::{Path, PathBuf};

use anchor_locator::{load_policy, LocatorPolicy};
use anyhow::{bail, Context, Result};
use dom_snapshot::Document;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging(level: &str, debug: bool) -> Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        level.parse().context("Invalid log level")?
    };

    // stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

pub struct LoadedPolicy {
    pub policy: LocatorPolicy,
    pub path: Option<PathBuf>,
}

pub fn load_policy_config(config_path: Option<&PathBuf>) -> Result<LoadedPolicy> {
    let policy_path = match config_path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        }
        None => {
            // Priority: ./config/locator.yaml > ~/.config/pointa/locator.yaml
            let local_config = PathBuf::from("config/locator.yaml");
            if local_config.exists() {
                Some(local_config)
            } else {
                dirs::config_dir()
                    .map(|dir| dir.join("pointa").join("locator.yaml"))
                    .filter(|path| path.exists())
            }
        }
    };

    if policy_path.is_none() {
        debug!("No locator policy file found; using defaults and environment");
    }
    let policy = load_policy(policy_path.as_deref()).context("Failed to load locator policy")?;
    Ok(LoadedPolicy {
        policy,
        path: policy_path,
    })
}

pub fn read_snapshot(path: &Path) -> Result<Document> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    let doc = Document::from_json_str(&content)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))?;
    info!(
        "Loaded snapshot {} ({} elements)",
        path.display(),
        doc.elements().len()
    );
    Ok(doc)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    if path.exists() {
        info!("Overwriting {}", path.display());
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
