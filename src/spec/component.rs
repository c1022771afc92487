//! Component specifications: raw document shapes plus the validated in-memory form.
//!
//! JSON shape of one template entry (keyed by component name):
//! {
//!   "componentType": "RootModule",
//!   "prefix": "C",
//!   "children": [
//!     {
//!       "childName": "spine", "childPrefix": "C", "connectionType": "parent",
//!       "parentAttrs": ["OUT_WORLD"], "childAttrs": ["IN_WORLD"],
//!       "parentUpAttrs": [], "childUpAttrs": [], "spaceName": "root"
//!     }
//!   ],
//!   "controls": {}, "componentVars": {},
//!   "inputAttrs": [...], "outputAttrs": [...],
//!   "bindGeometry": [{"name": "end", "parent": null}]
//! }

use crate::diagnostics::{Diagnostics, Stage};
use crate::spec::attr::{AttrPath, AttributeSpec, ConnectionKind};
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Mirroring tag. `LR`/`RL` mean "duplicate me into L and R instances".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Prefix {
    L,
    R,
    C,
    LR,
    RL,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::L => "L",
            Self::R => "R",
            Self::C => "C",
            Self::LR => "LR",
            Self::RL => "RL",
        }
    }

    /// Containment rule used to match components against child references:
    /// `L` is contained in `LR`, every prefix is contained in itself.
    pub fn is_within(self, other: Prefix) -> bool {
        other.as_str().contains(self.as_str())
    }

    pub fn is_mirrored(self) -> bool {
        matches!(self, Self::LR | Self::RL)
    }

    /// Sides produced by mirroring, in declaration order.
    pub fn sides(self) -> &'static [Prefix] {
        match self {
            Self::L => &[Self::L],
            Self::R => &[Self::R],
            Self::C => &[Self::C],
            Self::LR => &[Self::L, Self::R],
            Self::RL => &[Self::R, Self::L],
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One bind-geometry operation handed to the bind builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindOp {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Raw child reference as it appears in a template or blueprint document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRefDoc {
    pub child_name: String,
    #[serde(default, deserialize_with = "blank_prefix")]
    pub child_prefix: Option<Prefix>,
    #[serde(default = "default_connection_type")]
    pub connection_type: String,
    #[serde(default)]
    pub parent_attrs: Vec<String>,
    #[serde(default)]
    pub child_attrs: Vec<String>,
    #[serde(default)]
    pub parent_up_attrs: Vec<String>,
    #[serde(default)]
    pub child_up_attrs: Vec<String>,
    #[serde(default)]
    pub space_name: Option<String>,
}

/// `""`, whitespace and `null` all mean "no prefix given".
fn blank_prefix<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Prefix>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => {
            let de: serde::de::value::StrDeserializer<'_, D::Error> = text.into_deserializer();
            Prefix::deserialize(de).map(Some)
        }
    }
}

fn default_connection_type() -> String {
    ConnectionKind::Parent.as_str().to_string()
}

/// Raw component entry. Blueprint-internal components may leave `prefix` blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDoc {
    #[serde(default)]
    pub component_type: String,
    #[serde(default, deserialize_with = "blank_prefix")]
    pub prefix: Option<Prefix>,
    #[serde(default)]
    pub children: Vec<ChildRefDoc>,
    #[serde(default)]
    pub controls: BTreeMap<String, Value>,
    #[serde(default)]
    pub component_vars: BTreeMap<String, Value>,
    #[serde(default)]
    pub input_attrs: Vec<AttrEntry>,
    #[serde(default)]
    pub output_attrs: Vec<AttrEntry>,
    #[serde(default)]
    pub bind_geometry: Vec<BindOp>,
}

/// An attribute declaration as written. Entries that do not form a valid
/// [`AttributeSpec`] (an unsupported `attrType`, a missing name) are kept raw
/// so they can be reported against their component instead of failing the load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrEntry {
    Valid(AttributeSpec),
    Invalid(Value),
}

impl AttrEntry {
    fn resolve(&self) -> Result<AttributeSpec, String> {
        match self {
            Self::Valid(spec) => Ok(spec.clone()),
            Self::Invalid(raw) => {
                let name = ["attrName", "name"]
                    .iter()
                    .find_map(|key| raw.get(key).and_then(Value::as_str))
                    .unwrap_or("<unnamed>");
                let reason = match serde_json::from_value::<AttributeSpec>(raw.clone()) {
                    Err(err) => err.to_string(),
                    Ok(_) => "malformed declaration".to_string(),
                };
                Err(format!("dropping attribute '{name}': {reason}"))
            }
        }
    }
}

/// Validated child reference: parallel attribute lists plus a parsed kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildRef {
    pub child_name: String,
    pub child_prefix: Prefix,
    pub connection_kind: ConnectionKind,
    pub parent_attrs: Vec<String>,
    pub child_attrs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parent_up_attrs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub child_up_attrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_name: Option<String>,
}

impl ChildRef {
    pub fn new(child_name: impl Into<String>, child_prefix: Prefix, kind: ConnectionKind) -> Self {
        Self {
            child_name: child_name.into(),
            child_prefix,
            connection_kind: kind,
            parent_attrs: Vec::new(),
            child_attrs: Vec::new(),
            parent_up_attrs: Vec::new(),
            child_up_attrs: Vec::new(),
            space_name: None,
        }
    }

    pub fn with_attrs<S: Into<String>>(mut self, pairs: impl IntoIterator<Item = (S, S)>) -> Self {
        for (parent, child) in pairs {
            self.parent_attrs.push(parent.into());
            self.child_attrs.push(child.into());
        }
        self
    }

    pub fn with_up_attrs<S: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (S, S)>,
    ) -> Self {
        for (parent, child) in pairs {
            self.parent_up_attrs.push(parent.into());
            self.child_up_attrs.push(child.into());
        }
        self
    }

    pub fn with_space_name(mut self, space_name: impl Into<String>) -> Self {
        self.space_name = Some(space_name.into());
        self
    }

    /// Parallel-list invariant: down lists match, up lists match.
    pub fn is_balanced(&self) -> bool {
        self.parent_attrs.len() == self.child_attrs.len()
            && self.parent_up_attrs.len() == self.child_up_attrs.len()
    }

    /// Resolve a raw reference. `default_prefix` fills a blank child prefix.
    pub fn from_doc(doc: &ChildRefDoc, default_prefix: Prefix) -> Result<Self, String> {
        let connection_kind = doc
            .connection_type
            .parse::<ConnectionKind>()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            child_name: doc.child_name.clone(),
            child_prefix: doc.child_prefix.unwrap_or(default_prefix),
            connection_kind,
            parent_attrs: doc.parent_attrs.clone(),
            child_attrs: doc.child_attrs.clone(),
            parent_up_attrs: doc.parent_up_attrs.clone(),
            child_up_attrs: doc.child_up_attrs.clone(),
            space_name: doc.space_name.clone(),
        })
    }
}

/// A component instance. Identity is `(name, prefix)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,
    pub prefix: Prefix,
    pub component_type: String,
    pub children: Vec<ChildRef>,
    pub controls: BTreeMap<String, Value>,
    pub component_vars: BTreeMap<String, Value>,
    pub input_attrs: Vec<AttributeSpec>,
    pub output_attrs: Vec<AttributeSpec>,
    pub bind_geometry: Vec<BindOp>,
}

impl ComponentSpec {
    pub fn new(name: impl Into<String>, prefix: Prefix, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix,
            component_type: component_type.into(),
            children: Vec::new(),
            controls: BTreeMap::new(),
            component_vars: BTreeMap::new(),
            input_attrs: Vec::new(),
            output_attrs: Vec::new(),
            bind_geometry: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ChildRef) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_input(mut self, attr: AttributeSpec) -> Self {
        self.input_attrs.push(attr);
        self
    }

    pub fn with_output(mut self, attr: AttributeSpec) -> Self {
        self.output_attrs.push(attr);
        self
    }

    /// Build a component from its document. Child references with an unknown
    /// connection kind and unusable attribute declarations are dropped and
    /// reported.
    pub fn from_doc(
        name: &str,
        doc: &ComponentDoc,
        default_prefix: Prefix,
        diagnostics: &mut Diagnostics,
    ) -> Self {
        let prefix = doc.prefix.unwrap_or(default_prefix);
        let mut children = Vec::with_capacity(doc.children.len());
        for child in &doc.children {
            match ChildRef::from_doc(child, prefix) {
                Ok(child) => children.push(child),
                Err(message) => diagnostics.warn(
                    Stage::Load,
                    format!("{prefix}_{name}"),
                    format!("dropping child reference to '{}': {}", child.child_name, message),
                ),
            }
        }

        let mut attrs = |entries: &[AttrEntry]| -> Vec<AttributeSpec> {
            entries
                .iter()
                .filter_map(|entry| match entry.resolve() {
                    Ok(spec) => Some(spec),
                    Err(message) => {
                        diagnostics.warn(Stage::Load, format!("{prefix}_{name}"), message);
                        None
                    }
                })
                .collect()
        };
        let input_attrs = attrs(&doc.input_attrs);
        let output_attrs = attrs(&doc.output_attrs);

        Self {
            name: name.to_string(),
            prefix,
            component_type: doc.component_type.clone(),
            children,
            controls: doc.controls.clone(),
            component_vars: doc.component_vars.clone(),
            input_attrs,
            output_attrs,
            bind_geometry: doc.bind_geometry.clone(),
        }
    }

    pub fn identity(&self) -> (&str, Prefix) {
        (&self.name, self.prefix)
    }

    /// `{prefix}_{name}`, the stem of every host node this component owns.
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.prefix, self.name)
    }

    pub fn matches(&self, child: &ChildRef) -> bool {
        self.name == child.child_name && self.prefix.is_within(child.child_prefix)
    }

    pub fn group_name(&self, part: &str) -> String {
        format!("{}_{}_GRP", self.full_name(), part)
    }

    pub fn input_group(&self) -> String {
        self.group_name("input")
    }

    pub fn output_group(&self) -> String {
        self.group_name("output")
    }

    pub fn input_path(&self, attr: &str) -> AttrPath {
        AttrPath::new(self.input_group(), attr)
    }

    pub fn output_path(&self, attr: &str) -> AttrPath {
        AttrPath::new(self.output_group(), attr)
    }

    pub fn input_attr(&self, name: &str) -> Option<&AttributeSpec> {
        self.input_attrs.iter().find(|a| a.name == name)
    }

    pub fn output_attr(&self, name: &str) -> Option<&AttributeSpec> {
        self.output_attrs.iter().find(|a| a.name == name)
    }
}
