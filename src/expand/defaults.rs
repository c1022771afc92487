//! Default-attribute merging.
//!
//! Every component gets the process-wide default input/output attributes it
//! does not already declare, and every hierarchical child edge gets the
//! default output -> input pairs it does not already carry.

use crate::diagnostics::{Diagnostics, Stage};
use crate::spec::{AttributeSpec, ComponentSpec};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultAttrSet {
    #[serde(default)]
    pub input_attrs: Vec<AttributeSpec>,
    #[serde(default)]
    pub output_attrs: Vec<AttributeSpec>,
}

impl DefaultAttrSet {
    pub fn is_empty(&self) -> bool {
        self.input_attrs.is_empty() && self.output_attrs.is_empty()
    }

    /// Default edge pairs: output `i` of the parent feeds input `i` of the child.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.output_attrs
            .iter()
            .zip(&self.input_attrs)
            .map(|(out, inp)| (out.name.as_str(), inp.name.as_str()))
    }
}

/// Append each default not already declared by name. Explicit entries keep
/// their position and win over defaults.
fn merge_attr_list(declared: &mut Vec<AttributeSpec>, defaults: &[AttributeSpec]) {
    for default in defaults {
        if !declared.iter().any(|attr| attr.name == default.name) {
            declared.push(default.clone());
        }
    }
}

pub fn merge_defaults(
    mut spec: ComponentSpec,
    defaults: &DefaultAttrSet,
    diagnostics: &mut Diagnostics,
) -> ComponentSpec {
    merge_attr_list(&mut spec.input_attrs, &defaults.input_attrs);
    merge_attr_list(&mut spec.output_attrs, &defaults.output_attrs);

    let full_name = spec.full_name();
    spec.children.retain(|child| {
        if child.is_balanced() {
            return true;
        }
        diagnostics.warn(
            Stage::Merge,
            full_name.clone(),
            format!(
                "dropping child reference to {}_{}: parentAttrs/childAttrs ({}/{}) or up attrs ({}/{}) differ in length",
                child.child_prefix,
                child.child_name,
                child.parent_attrs.len(),
                child.child_attrs.len(),
                child.parent_up_attrs.len(),
                child.child_up_attrs.len(),
            ),
        );
        false
    });

    for child in spec
        .children
        .iter_mut()
        .filter(|child| child.connection_kind.is_hierarchical())
    {
        for (parent_attr, child_attr) in defaults.edge_pairs() {
            // a child input already driven by this edge is left alone
            if child.child_attrs.iter().any(|a| a == child_attr) {
                continue;
            }
            child.parent_attrs.push(parent_attr.to_string());
            child.child_attrs.push(child_attr.to_string());
        }
    }

    spec
}

pub fn merge_all(
    specs: Vec<ComponentSpec>,
    defaults: &DefaultAttrSet,
    diagnostics: &mut Diagnostics,
) -> Vec<ComponentSpec> {
    specs
        .into_iter()
        .map(|spec| merge_defaults(spec, defaults, diagnostics))
        .collect()
}
