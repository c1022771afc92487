//! Collaborator interfaces.
//!
//! The core never creates scene content itself. It talks to an
//! [`AttributeHost`] (the target scene) and drives one component builder per
//! component through [`BindBuilder`] and [`ControlBuilder`].

pub mod memory;
pub mod registry;
pub mod standard;

use crate::error::HostError;
use crate::spec::{AttrKind, AttrPath, AttributeSpec, ComponentSpec, Limits};
use serde::Serialize;

pub use memory::{AttrValue, MemoryScene, SceneOp};
pub use registry::{ComponentFactory, ComponentRegistry};
pub use standard::StandardComponent;

/// How a child follows its parent's matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowMode {
    Full,
    TranslateOnly,
}

/// One selectable source of a space switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceOption {
    pub id: usize,
    pub name: String,
    pub source: AttrPath,
}

/// Scene capability: create, connect, copy and query attributes by path.
pub trait AttributeHost {
    fn create_node(&mut self, name: &str, parent: Option<&str>) -> Result<(), HostError>;
    fn has_node(&self, name: &str) -> bool;

    fn add_attr(&mut self, node: &str, attr: &AttributeSpec) -> Result<(), HostError>;
    fn attr_kind(&self, path: &AttrPath) -> Option<AttrKind>;

    /// Live link; fails with [`HostError::AlreadyConnected`] if `dst` is driven.
    fn connect(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError>;
    fn source_of(&self, dst: &AttrPath) -> Option<AttrPath>;

    /// One-off value copy, no link.
    fn copy_value(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError>;
    /// One-off pose copy (translate/rotate/scale), no link.
    fn copy_transform(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError>;
    /// `dst` becomes an alternate access point for `src`.
    fn make_proxy(&mut self, src: &AttrPath, dst: &AttrPath) -> Result<(), HostError>;
    fn follow_parent(
        &mut self,
        src: &AttrPath,
        dst: &AttrPath,
        mode: FollowMode,
    ) -> Result<(), HostError>;
    /// Blend `options` into `dst`, replacing any existing driver. `active` is an option id.
    fn create_space_switch(
        &mut self,
        dst: &AttrPath,
        options: &[SpaceOption],
        active: usize,
    ) -> Result<(), HostError>;

    fn limits(&self, path: &AttrPath) -> Option<Limits>;
    fn set_limits(&mut self, path: &AttrPath, limits: Limits) -> Result<(), HostError>;
}

/// First build step: groups and bind joints.
pub trait BindBuilder {
    fn create_bind_structures(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError>;
}

/// Second build step: exposed attributes and control rig.
pub trait ControlBuilder {
    fn initialize_attributes(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError>;

    fn create_control_structure(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError>;
}

pub trait ComponentBuilder: BindBuilder + ControlBuilder {}

impl<T: BindBuilder + ControlBuilder> ComponentBuilder for T {}
