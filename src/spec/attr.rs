//! Attribute declarations and the connection kinds that wire them.
//!
//! JSON shape (authoring names are accepted as aliases):
//! {
//!   "attrName": "OUT_WORLD",      // or "name"
//!   "attrType": "matrix",         // or "kind"
//!   "internalAttr": "end_CTL.worldMatrix",
//!   "min": 0.0, "max": 1.0,
//!   "enumValues": ["world", "local"],
//!   "connectionType": "spaceSwitch"
//! }

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttrKind {
    #[serde(alias = "float", alias = "double")]
    Scalar,
    #[serde(alias = "double3", alias = "float3")]
    Vector,
    Matrix,
    Bool,
    Enum,
    String,
}

/// Wiring strategy for one parent/child attribute pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionKind {
    Direct,
    Copy,
    CopyTransform,
    Proxy,
    Parent,
    ParentOffset,
    ParentOffsetTranslate,
    SpaceSwitch,
}

impl ConnectionKind {
    pub const ALL: [ConnectionKind; 8] = [
        Self::Direct,
        Self::Copy,
        Self::CopyTransform,
        Self::Proxy,
        Self::Parent,
        Self::ParentOffset,
        Self::ParentOffsetTranslate,
        Self::SpaceSwitch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Copy => "copy",
            Self::CopyTransform => "copyTransform",
            Self::Proxy => "proxy",
            Self::Parent => "parent",
            Self::ParentOffset => "parentOffset",
            Self::ParentOffsetTranslate => "parentOffsetTranslate",
            Self::SpaceSwitch => "spaceSwitch",
        }
    }

    /// Hierarchical kinds receive the default attribute surface during merging.
    pub fn is_hierarchical(self) -> bool {
        matches!(
            self,
            Self::Parent | Self::ParentOffset | Self::ParentOffsetTranslate | Self::SpaceSwitch
        )
    }

    /// Kinds resolved in the second wiring stage, after every direct link exists.
    pub fn is_deferred(self) -> bool {
        matches!(
            self,
            Self::ParentOffset | Self::ParentOffsetTranslate | Self::SpaceSwitch
        )
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownConnectionKind(pub String);

impl fmt::Display for UnknownConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown connectionType '{}'", self.0)
    }
}

impl std::error::Error for UnknownConnectionKind {}

impl FromStr for ConnectionKind {
    type Err = UnknownConnectionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownConnectionKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSpec {
    #[serde(alias = "attrName")]
    pub name: String,

    #[serde(alias = "attrType")]
    pub kind: AttrKind,

    #[serde(default, alias = "internalAttr", skip_serializing_if = "Option::is_none")]
    pub internal_ref: Option<String>,

    #[serde(
        default,
        alias = "connectionType",
        skip_serializing_if = "Option::is_none"
    )]
    pub connection_kind: Option<ConnectionKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: AttrKind) -> Self {
        Self {
            name: name.into(),
            kind,
            internal_ref: None,
            connection_kind: None,
            min: None,
            max: None,
            enum_values: Vec::new(),
        }
    }

    pub fn with_limits(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_internal_ref(mut self, internal_ref: impl Into<String>) -> Self {
        self.internal_ref = Some(internal_ref.into());
        self
    }

    pub fn limits(&self) -> Limits {
        Limits {
            min: self.min,
            max: self.max,
        }
    }
}

/// Optional numeric range carried by an attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Limits {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Limits {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Intersection of two ranges: the larger min and the smaller max.
    pub fn intersect(self, other: Limits) -> Limits {
        Limits {
            min: pick(self.min, other.min, f64::max),
            max: pick(self.max, other.max, f64::min),
        }
    }
}

fn pick(a: Option<f64>, b: Option<f64>, f: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, b) => a.or(b),
    }
}

// node names follow the host's `{prefix}_{component}_{part}` convention;
// attribute parts may carry indices and compound children (`target[0].weight`).
static ATTR_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_:|]*)\.([A-Za-z_][A-Za-z0-9_\[\]\.]*)$")
        .expect("attribute path pattern is valid")
});

/// A `node.attr` address in the host scene.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AttrPath {
    pub node: String,
    pub attr: String,
}

impl AttrPath {
    pub fn new(node: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            attr: attr.into(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let caps = ATTR_PATH_RE.captures(s.trim())?;
        Some(Self::new(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.attr)
    }
}
