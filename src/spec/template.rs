//! Template, blueprint and default-attribute documents.
//!
//! A template is a JSON object of component-name -> component entry.
//! A blueprint has the same shape plus a reserved `variables` object:
//! {
//!   "variables": { "inputComponents": ["shoulder"] },
//!   "shoulder": { "componentType": "SingleJointModule", "children": [...] },
//!   "elbow":    { "componentType": "SingleJointModule" }
//! }
//! The defaults document is `{ "inputAttrs": [...], "outputAttrs": [...] }`.

use crate::Result;
use crate::diagnostics::{Diagnostics, Stage};
use crate::expand::DefaultAttrSet;
use crate::spec::component::{ComponentDoc, ComponentSpec, Prefix};
use anyhow::{Context, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Raw template document keyed by component name.
pub type TemplateDoc = BTreeMap<String, ComponentDoc>;

/// Validated template set keyed by component name.
pub type TemplateSet = BTreeMap<String, ComponentSpec>;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintVars {
    #[serde(default)]
    pub input_components: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BlueprintDoc {
    #[serde(default)]
    pub variables: BlueprintVars,
    #[serde(flatten)]
    pub components: BTreeMap<String, ComponentDoc>,
}

pub fn parse_template(text: &str) -> Result<TemplateDoc> {
    let doc: TemplateDoc = serde_json::from_str(text).context("parse template document")?;
    Ok(doc)
}

pub fn load_template(path: impl AsRef<Path>) -> Result<TemplateDoc> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read template file {}", path.display()))?;
    parse_template(&text).with_context(|| format!("in template file {}", path.display()))
}

pub fn parse_blueprint(text: &str) -> Result<BlueprintDoc> {
    let doc: BlueprintDoc = serde_json::from_str(text).context("parse blueprint document")?;
    for name in &doc.variables.input_components {
        if !doc.components.contains_key(name) {
            bail!("blueprint input component '{}' is not defined in the blueprint", name);
        }
    }
    Ok(doc)
}

pub fn load_blueprint(path: impl AsRef<Path>) -> Result<BlueprintDoc> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read blueprint file {}", path.display()))?;
    parse_blueprint(&text).with_context(|| format!("in blueprint file {}", path.display()))
}

pub fn parse_defaults(text: &str) -> Result<DefaultAttrSet> {
    let defaults: DefaultAttrSet =
        serde_json::from_str(text).context("parse default-attribute document")?;
    Ok(defaults)
}

pub fn load_defaults(path: impl AsRef<Path>) -> Result<DefaultAttrSet> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read defaults file {}", path.display()))?;
    parse_defaults(&text).with_context(|| format!("in defaults file {}", path.display()))
}

/// Turn a raw template into component specs. Top-level components must carry a
/// prefix; a missing one falls back to `C` with a warning.
pub fn build_template_set(doc: &TemplateDoc, diagnostics: &mut Diagnostics) -> TemplateSet {
    let mut out = TemplateSet::new();
    for (name, entry) in doc {
        if entry.prefix.is_none() {
            diagnostics.warn(
                Stage::Load,
                name.clone(),
                "component has no prefix; defaulting to C",
            );
        }
        if entry.component_type.trim().is_empty() {
            diagnostics.warn(Stage::Load, name.clone(), "component has no componentType");
        }
        out.insert(
            name.clone(),
            ComponentSpec::from_doc(name, entry, Prefix::C, diagnostics),
        );
    }
    out
}
