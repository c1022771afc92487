//! In-memory scene. Records every node, attribute, link and switch so a build
//! can be inspected without a 3D host.

use crate::error::HostError;
use crate::host::{AttributeHost, FollowMode, SpaceOption};
use crate::spec::{AttrKind, AttrPath, AttributeSpec, Limits};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AttrValue {
    Scalar(f64),
    Vector([f64; 3]),
    Matrix([f64; 16]),
    Bool(bool),
    Enum(usize),
    String(String),
}

impl AttrValue {
    pub fn default_for(kind: AttrKind) -> Self {
        match kind {
            AttrKind::Scalar => Self::Scalar(0.0),
            AttrKind::Vector => Self::Vector([0.0; 3]),
            AttrKind::Matrix => Self::Matrix(IDENTITY),
            AttrKind::Bool => Self::Bool(false),
            AttrKind::Enum => Self::Enum(0),
            AttrKind::String => Self::String(String::new()),
        }
    }

    pub fn kind(&self) -> AttrKind {
        match self {
            Self::Scalar(_) => AttrKind::Scalar,
            Self::Vector(_) => AttrKind::Vector,
            Self::Matrix(_) => AttrKind::Matrix,
            Self::Bool(_) => AttrKind::Bool,
            Self::Enum(_) => AttrKind::Enum,
            Self::String(_) => AttrKind::String,
        }
    }
}

const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Scene mutations in the order they were made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SceneOp {
    CreateNode { name: String, parent: Option<String> },
    AddAttr { path: AttrPath, kind: AttrKind },
    Connect { src: AttrPath, dst: AttrPath },
    CopyValue { src: AttrPath, dst: AttrPath },
    CopyTransform { src: AttrPath, dst: AttrPath },
    Proxy { src: AttrPath, dst: AttrPath },
    FollowParent { src: AttrPath, dst: AttrPath, mode: FollowMode },
    SpaceSwitch { dst: AttrPath, node: String, options: Vec<SpaceOption>, active: usize },
    SetLimits { path: AttrPath, limits: Limits },
}

#[derive(Debug, Clone)]
struct SceneAttr {
    kind: AttrKind,
    value: AttrValue,
    limits: Limits,
    enum_values: Vec<String>,
    proxy_of: Option<AttrPath>,
}

#[derive(Debug, Clone, Default)]
struct SceneNode {
    parent: Option<String>,
    attrs: BTreeMap<String, SceneAttr>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    nodes: BTreeMap<String, SceneNode>,
    // dst -> src
    connections: BTreeMap<AttrPath, AttrPath>,
    ops: Vec<SceneOp>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<SceneOp> {
        self.ops
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn parent_of(&self, node: &str) -> Option<&str> {
        self.nodes.get(node)?.parent.as_deref()
    }

    /// All live links as `(src, dst)`.
    pub fn connections(&self) -> impl Iterator<Item = (&AttrPath, &AttrPath)> {
        self.connections.iter().map(|(dst, src)| (src, dst))
    }

    pub fn proxy_of(&self, path: &AttrPath) -> Option<&AttrPath> {
        self.attr(path).ok()?.proxy_of.as_ref()
    }

    pub fn enum_values(&self, path: &AttrPath) -> Option<&[String]> {
        self.attr(path).ok().map(|a| a.enum_values.as_slice())
    }

    pub fn set_value(&mut self, path: &AttrPath, value: AttrValue) -> Result<(), HostError> {
        let attr = self.attr_mut(path)?;
        if attr.kind != value.kind() {
            return Err(HostError::KindMismatch {
                src: format!("{:?}", value.kind()),
                dst: path.to_string(),
                reason: "value kind differs from attribute kind".to_string(),
            });
        }
        attr.value = value;
        Ok(())
    }

    /// Current value, following live links and proxies upstream.
    pub fn value(&self, path: &AttrPath) -> Option<&AttrValue> {
        let mut current = path;
        // every hop consumes one link or proxy, so this bounds cyclic wiring
        for _ in 0..=self.connections.len() + self.nodes.len() {
            let attr = self.attr(current).ok()?;
            match self.connections.get(current).or(attr.proxy_of.as_ref()) {
                Some(upstream) => current = upstream,
                None => return Some(&attr.value),
            }
        }
        None
    }

    fn attr(&self, path: &AttrPath) -> Result<&SceneAttr, HostError> {
        self.nodes
            .get(&path.node)
            .ok_or_else(|| HostError::MissingNode(path.node.clone()))?
            .attrs
            .get(&path.attr)
            .ok_or_else(|| HostError::MissingAttr(path.to_string()))
    }

    fn attr_mut(&mut self, path: &AttrPath) -> Result<&mut SceneAttr, HostError> {
        self.nodes
            .get_mut(&path.node)
            .ok_or_else(|| HostError::MissingNode(path.node.clone()))?
            .attrs
            .get_mut(&path.attr)
            .ok_or_else(|| HostError::MissingAttr(path.to_string()))
    }

    fn same_kind(&self, src: &AttrPath, dst: &AttrPath) -> Result<AttrKind, HostError> {
        let src_kind = self.attr(src)?.kind;
        let dst_kind = self.attr(dst)?.kind;
        if src_kind != dst_kind {
            return Err(HostError::KindMismatch {
                src: src.to_string(),
                dst: dst.to_string(),
                reason: format!("{src_kind:?} vs {dst_kind:?}"),
            });
        }
        Ok(src_kind)
    }

    fn ensure_free(&self, dst: &AttrPath) -> Result<(), HostError> {
        match self.connections.get(dst) {
            Some(existing) => Err(HostError::AlreadyConnected {
                dst: dst.to_string(),
                existing: existing.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn insert_attr(&mut self, node: &str, attr: &AttributeSpec) -> Result<AttrPath, HostError> {
        let entry = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| HostError::MissingNode(node.to_string()))?;
        let path = AttrPath::new(node, attr.name.as_str());
        if entry.attrs.contains_key(&attr.name) {
            return Err(HostError::Duplicate(path.to_string()));
        }
        entry.attrs.insert(
            attr.name.clone(),
            SceneAttr {
                kind: attr.kind,
                value: AttrValue::default_for(attr.kind),
                limits: attr.limits(),
                enum_values: attr.enum_values.clone(),
                proxy_of: None,
            },
        );
        Ok(path)
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

impl AttributeHost for MemoryScene {
    fn create_node(&mut self, name: &str, parent: Option<&str>) -> Result<(), HostError> {
        if name.is_empty() || name.contains(['.', ' ']) {
            return Err(HostError::InvalidPath(name.to_string()));
        }
        if self.nodes.contains_key(name) {
            return Err(HostError::Duplicate(name.to_string()));
        }
        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(HostError::MissingNode(parent.to_string()));
            }
        }
        self.nodes.insert(
            name.to_string(),
            SceneNode {
                parent: parent.map(str::to_string),
                attrs: BTreeMap::new(),
            },
        );
        self.ops.push(SceneOp::CreateNode {
            name: name.to_string(),
            parent: parent.map(str::to_string),
        });
        Ok(())
    }

    fn has_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    fn add_attr(&mut self, node: &str, attr: &AttributeSpec) -> Result<(), HostError> {
        let path = self.insert_attr(node, attr)?;
        self.ops.push(SceneOp::AddAttr {
            path,
            kind: attr.kind,
        });
        Ok(())
    }

    fn attr_kind(&self, path: &AttrPath) -> Option<AttrKind> {
        self.attr(path).ok().map(|a| a.kind)
    }

    fn connect(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError> {
        self.same_kind(src, dst)?;
        self.ensure_free(dst)?;
        self.connections.insert(dst.clone(), src.clone());
        self.ops.push(SceneOp::Connect {
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    fn source_of(&self, dst: &AttrPath) -> Option<AttrPath> {
        self.connections.get(dst).cloned()
    }

    fn copy_value(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError> {
        self.same_kind(src, dst)?;
        let value = self
            .value(src)
            .cloned()
            .ok_or_else(|| HostError::MissingAttr(src.to_string()))?;
        self.attr_mut(dst)?.value = value;
        self.ops.push(SceneOp::CopyValue {
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    fn copy_transform(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError> {
        let kind = self.same_kind(src, dst)?;
        if !matches!(kind, AttrKind::Matrix | AttrKind::Vector) {
            return Err(HostError::KindMismatch {
                src: src.to_string(),
                dst: dst.to_string(),
                reason: "transform copies need matrix or vector attributes".to_string(),
            });
        }
        let value = self
            .value(src)
            .cloned()
            .ok_or_else(|| HostError::MissingAttr(src.to_string()))?;
        self.attr_mut(dst)?.value = value;
        self.ops.push(SceneOp::CopyTransform {
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    fn make_proxy(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError> {
        self.same_kind(src, dst)?;
        let attr = self.attr_mut(dst)?;
        if let Some(existing) = &attr.proxy_of {
            return Err(HostError::AlreadyConnected {
                dst: dst.to_string(),
                existing: existing.to_string(),
            });
        }
        attr.proxy_of = Some(src.clone());
        self.ops.push(SceneOp::Proxy {
            src: src.clone(),
            dst: dst.clone(),
        });
        Ok(())
    }

    fn follow_parent(
        &mut self,
        src: &AttrPath,
        dst: &AttrPath,
        mode: FollowMode,
    ) -> Result<(), HostError> {
        let kind = self.same_kind(src, dst)?;
        if kind != AttrKind::Matrix {
            return Err(HostError::KindMismatch {
                src: src.to_string(),
                dst: dst.to_string(),
                reason: "parent follow needs matrix attributes".to_string(),
            });
        }
        self.ensure_free(dst)?;
        self.connections.insert(dst.clone(), src.clone());
        self.ops.push(SceneOp::FollowParent {
            src: src.clone(),
            dst: dst.clone(),
            mode,
        });
        Ok(())
    }

    fn create_space_switch(
        &mut self,
        dst: &AttrPath,
        options: &[SpaceOption],
        active: usize,
    ) -> Result<(), HostError> {
        let dst_kind = self.attr(dst)?.kind;
        for option in options {
            self.same_kind(&option.source, dst)?;
        }
        if !options.iter().any(|o| o.id == active) {
            return Err(HostError::MissingAttr(format!("{dst} space option {active}")));
        }

        let node = format!("{}_{}_SPACE_SWITCH", dst.node, sanitize(&dst.attr));
        self.nodes.insert(node.clone(), SceneNode::default());
        let mut selector = AttributeSpec::new("activeSpace", AttrKind::Enum);
        selector.enum_values = options.iter().map(|o| o.name.clone()).collect();
        self.insert_attr(&node, &selector)?;
        self.insert_attr(&node, &AttributeSpec::new("output", dst_kind))?;
        for option in options {
            let target = AttributeSpec::new(format!("target[{}]", option.id), dst_kind);
            let target = self.insert_attr(&node, &target)?;
            self.connections.insert(target, option.source.clone());
        }
        let position = options.iter().position(|o| o.id == active).unwrap_or(0);
        self.attr_mut(&AttrPath::new(node.as_str(), "activeSpace"))?.value = AttrValue::Enum(position);
        self.connections
            .insert(dst.clone(), AttrPath::new(node.as_str(), format!("target[{active}]")));

        self.ops.push(SceneOp::SpaceSwitch {
            dst: dst.clone(),
            node,
            options: options.to_vec(),
            active,
        });
        Ok(())
    }

    fn limits(&self, path: &AttrPath) -> Option<Limits> {
        self.attr(path).ok().map(|a| a.limits)
    }

    fn set_limits(&mut self, path: &AttrPath, limits: Limits) -> Result<(), HostError> {
        self.attr_mut(path)?.limits = limits;
        self.ops.push(SceneOp::SetLimits {
            path: path.clone(),
            limits,
        });
        Ok(())
    }
}
