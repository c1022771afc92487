//! Serializable build summary.

use crate::diagnostics::Diagnostic;
use crate::expand::BlueprintSpec;
use crate::graph::ComponentGraph;
use crate::spec::ComponentSpec;
use crate::wire::{Link, SpaceSwitchSummary};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSummary {
    pub full_name: String,
    pub component_type: String,
    /// Builder type actually used, when it differs from `component_type`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub built_as: Option<String>,
    pub children: Vec<String>,
    pub parents: Vec<String>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintSummary {
    pub id: String,
    pub aliases: Vec<String>,
    pub input_components: Vec<String>,
}

impl From<&BlueprintSpec> for BlueprintSummary {
    fn from(spec: &BlueprintSpec) -> Self {
        Self {
            id: spec.id.clone(),
            aliases: spec.aliases.clone(),
            input_components: spec.input_component_names.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub components: Vec<ComponentSummary>,
    pub roots: Vec<String>,
    pub blueprints: Vec<BlueprintSummary>,
    pub bind_order: Vec<String>,
    pub control_order: Vec<String>,
    pub links: Vec<Link>,
    pub space_switches: Vec<SpaceSwitchSummary>,
    pub limits_updated: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    pub fn component(&self, full_name: &str) -> Option<&ComponentSummary> {
        self.components.iter().find(|c| c.full_name == full_name)
    }
}

pub(crate) fn summarize_components(
    graph: &ComponentGraph,
    built_as: impl Fn(&ComponentSpec) -> Option<String>,
) -> Vec<ComponentSummary> {
    let mut out = Vec::with_capacity(graph.len());
    graph.for_each_component(|id, component| {
        let node = graph.node(id);
        out.push(ComponentSummary {
            full_name: component.full_name(),
            component_type: component.component_type.clone(),
            built_as: built_as(component),
            children: node.children.iter().map(|c| graph.full_name(*c)).collect(),
            parents: node.parents.iter().map(|p| graph.full_name(*p)).collect(),
            inputs: component.input_attrs.iter().map(|a| a.name.clone()).collect(),
            outputs: component.output_attrs.iter().map(|a| a.name.clone()).collect(),
        });
    });
    out
}
