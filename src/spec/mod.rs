//! Spec layer: JSON document shapes + validated in-memory structures.
//!
//! Nothing here touches expansion, the graph or a host. It owns:
//! - attribute declarations and connection kinds
//! - component specs and child references
//! - template / blueprint / defaults documents

pub mod attr;
pub mod component;
pub mod template;

pub use attr::{AttrKind, AttrPath, AttributeSpec, ConnectionKind, Limits};
pub use component::{AttrEntry, BindOp, ChildRef, ChildRefDoc, ComponentDoc, ComponentSpec, Prefix};
pub use template::{
    BlueprintDoc, BlueprintVars, TemplateDoc, TemplateSet, build_template_set, load_blueprint,
    load_defaults, load_template, parse_blueprint, parse_defaults, parse_template,
};
