//! Build configuration passed explicitly into the pipeline.

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    /// Rounds of blueprint-inside-blueprint expansion before giving up.
    pub max_blueprint_depth: usize,
    pub reject_cycles: bool,
    /// Split `LR`/`RL` components into one instance per side.
    pub mirror_sides: bool,
    pub propagate_limits: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_blueprint_depth: 8,
            reject_cycles: true,
            mirror_sides: true,
            propagate_limits: true,
        }
    }
}

impl BuildConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_fields_take_defaults() {
        let config = BuildConfig::parse(r#"{"rejectCycles": false}"#).expect("parse");
        assert_eq!(
            config,
            BuildConfig {
                reject_cycles: false,
                ..BuildConfig::default()
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(BuildConfig::parse(r#"{"maxDepth": 3}"#).is_err());
    }

    #[test]
    fn load_reports_the_path() {
        let err = BuildConfig::load("/nonexistent/rig.json").expect_err("missing");
        assert!(format!("{err:#}").contains("/nonexistent/rig.json"));
    }
}
