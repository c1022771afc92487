//! Build driver: expansion, graph, two scheduled traversals, wiring, limits.

use crate::Result;
use crate::config::BuildConfig;
use crate::diagnostics::{Diagnostics, Stage};
use crate::expand::{BlueprintCatalog, DefaultAttrSet, expand, merge_all, split_sides};
use crate::graph::ComponentGraph;
use crate::host::{AttributeHost, ComponentBuilder, ComponentRegistry};
use crate::report::{BlueprintSummary, BuildReport, summarize_components};
use crate::spec::{ComponentSpec, TemplateDoc, TemplateSet, build_template_set};
use crate::wire::{propagate_limits, wire_deferred, wire_direct};
use anyhow::Context;

pub struct RigBuilder {
    config: BuildConfig,
    registry: ComponentRegistry,
    defaults: DefaultAttrSet,
    catalog: BlueprintCatalog,
}

impl RigBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            registry: ComponentRegistry::new(),
            defaults: DefaultAttrSet::default(),
            catalog: BlueprintCatalog::empty(),
        }
    }

    pub fn with_registry(mut self, registry: ComponentRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_defaults(mut self, defaults: DefaultAttrSet) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_catalog(mut self, catalog: BlueprintCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn catalog(&self) -> &BlueprintCatalog {
        &self.catalog
    }

    /// Expand blueprints, mirror sides and merge default attributes.
    pub fn prepare(
        &mut self,
        templates: TemplateSet,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<ComponentSpec>> {
        let expanded = expand(
            templates,
            &mut self.catalog,
            self.config.max_blueprint_depth,
            diagnostics,
        )?;
        let components = if self.config.mirror_sides {
            split_sides(expanded, diagnostics)
        } else {
            expanded.into_values().collect()
        };
        Ok(merge_all(components, &self.defaults, diagnostics))
    }

    /// Run the whole pipeline against `host`.
    ///
    /// Fatal: blueprint loading, a component cycle (unless cycles are allowed),
    /// a stalled traversal. Everything a collaborator reports is recorded in
    /// the report's diagnostics and the build moves on.
    pub fn build(
        &mut self,
        templates: TemplateSet,
        host: &mut dyn AttributeHost,
    ) -> Result<BuildReport> {
        self.run(templates, host, Diagnostics::new())
    }

    /// [`RigBuilder::build`] from a raw template document, keeping the
    /// load-time findings in the report.
    pub fn build_document(
        &mut self,
        doc: &TemplateDoc,
        host: &mut dyn AttributeHost,
    ) -> Result<BuildReport> {
        let mut diagnostics = Diagnostics::new();
        let templates = build_template_set(doc, &mut diagnostics);
        self.run(templates, host, diagnostics)
    }

    fn run(
        &mut self,
        templates: TemplateSet,
        host: &mut dyn AttributeHost,
        mut diagnostics: Diagnostics,
    ) -> Result<BuildReport> {
        let components = self.prepare(templates, &mut diagnostics)?;
        let graph = ComponentGraph::build(components, &mut diagnostics);

        if self.config.reject_cycles {
            graph.check_acyclic().context("building component graph")?;
        } else {
            for id in graph.unreachable() {
                diagnostics.warn(
                    Stage::Graph,
                    graph.full_name(id),
                    "not reachable from any root; component is not built",
                );
            }
        }

        // one builder per node, alive across both traversals
        let mut builders: Vec<Option<Box<dyn ComponentBuilder>>> = graph
            .components()
            .map(|component| self.builder_for(component, &mut diagnostics))
            .collect();

        let bind_order = graph
            .traverse(|id, component| {
                let Some(builder) = builders[id.0].as_mut() else {
                    return;
                };
                if let Err(err) = builder.create_bind_structures(component, &mut *host) {
                    diagnostics.warn(Stage::Bind, component.full_name(), err.to_string());
                }
                if let Err(err) = builder.initialize_attributes(component, &mut *host) {
                    diagnostics.warn(Stage::Bind, component.full_name(), err.to_string());
                }
            })
            .context("bind traversal")?;
        tracing::info!(components = bind_order.len(), "bind structures built");

        let control_order = graph
            .traverse(|id, component| {
                let Some(builder) = builders[id.0].as_mut() else {
                    return;
                };
                if let Err(err) = builder.create_control_structure(component, &mut *host) {
                    diagnostics.warn(Stage::Control, component.full_name(), err.to_string());
                }
            })
            .context("control traversal")?;
        tracing::info!(components = control_order.len(), "control structures built");

        let mut wiring = wire_direct(&graph, &mut *host, &mut diagnostics);
        wire_deferred(&mut wiring, &mut *host, &mut diagnostics);
        tracing::info!(
            links = wiring.links.len(),
            space_switches = wiring.space_switches.len(),
            "components wired"
        );

        let limits_updated = if self.config.propagate_limits {
            propagate_limits(&mut *host, &wiring.links, &mut diagnostics)
        } else {
            0
        };

        let registry = &self.registry;
        let components = summarize_components(&graph, |component| {
            (!registry.contains(component.component_type.trim()))
                .then(|| registry.default_type().to_string())
        });

        Ok(BuildReport {
            components,
            roots: graph.roots().iter().map(|id| graph.full_name(*id)).collect(),
            blueprints: self.catalog.loaded().map(BlueprintSummary::from).collect(),
            bind_order: bind_order.iter().map(|id| graph.full_name(*id)).collect(),
            control_order: control_order.iter().map(|id| graph.full_name(*id)).collect(),
            links: wiring.links,
            space_switches: wiring.space_switches,
            limits_updated,
            diagnostics: diagnostics.into_vec(),
        })
    }

    fn builder_for(
        &self,
        component: &ComponentSpec,
        diagnostics: &mut Diagnostics,
    ) -> Option<Box<dyn ComponentBuilder>> {
        let component_type = component.component_type.trim();
        if !self.registry.contains(component_type) {
            diagnostics.warn(
                Stage::Bind,
                component.full_name(),
                format!(
                    "unknown component type '{}'; using '{}'",
                    component_type,
                    self.registry.default_type()
                ),
            );
        }
        let builder = self.registry.create(component_type);
        if builder.is_none() {
            diagnostics.warn(
                Stage::Bind,
                component.full_name(),
                "no builder registered; component skipped",
            );
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::host::MemoryScene;
    use crate::spec::{AttrKind, AttributeSpec, ChildRef, ConnectionKind, Prefix};
    use pretty_assertions::assert_eq;

    fn template(components: Vec<ComponentSpec>) -> TemplateSet {
        components
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect()
    }

    fn defaults() -> DefaultAttrSet {
        DefaultAttrSet {
            input_attrs: vec![AttributeSpec::new("IN_WORLD", AttrKind::Matrix)],
            output_attrs: vec![AttributeSpec::new("OUT_WORLD", AttrKind::Matrix)],
        }
    }

    #[test]
    fn builds_parent_before_child_and_wires_defaults() {
        let root = ComponentSpec::new("root", Prefix::C, "RootModule")
            .with_child(ChildRef::new("spine", Prefix::C, ConnectionKind::Parent));
        let spine = ComponentSpec::new("spine", Prefix::C, "SingleJointModule");

        let mut builder = RigBuilder::new(BuildConfig::default()).with_defaults(defaults());
        let mut scene = MemoryScene::new();
        let report = builder
            .build(template(vec![root, spine]), &mut scene)
            .expect("build");

        assert_eq!(report.bind_order, vec!["C_root", "C_spine"]);
        assert_eq!(report.control_order, report.bind_order);
        assert_eq!(report.roots, vec!["C_root"]);
        assert_eq!(report.links.len(), 1);
        assert!(report.diagnostics.iter().all(|d| d.stage != Stage::Wire));
    }

    #[test]
    fn cycles_abort_by_default() {
        let a = ComponentSpec::new("a", Prefix::C, "UtilityModule")
            .with_child(ChildRef::new("b", Prefix::C, ConnectionKind::Parent));
        let b = ComponentSpec::new("b", Prefix::C, "UtilityModule")
            .with_child(ChildRef::new("a", Prefix::C, ConnectionKind::Parent));

        let mut builder = RigBuilder::new(BuildConfig::default());
        let err = builder
            .build(template(vec![a, b]), &mut MemoryScene::new())
            .expect_err("cycle");
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn unknown_type_uses_default_builder() {
        let tail = ComponentSpec::new("tail", Prefix::C, "TentacleModule");
        let mut builder = RigBuilder::new(BuildConfig::default());
        let mut scene = MemoryScene::new();
        let report = builder
            .build(template(vec![tail]), &mut scene)
            .expect("build");

        assert!(scene.has_node("C_tail_GRP"));
        let summary = report.component("C_tail").expect("summary");
        assert_eq!(summary.built_as.as_deref(), Some("UtilityModule"));
        assert_eq!(
            report
                .diagnostics
                .iter()
                .filter(|d| d.stage == Stage::Bind)
                .count(),
            1
        );
    }
}
