use crate::diagnostics::{Diagnostics, Stage};
use crate::error::HostError;
use crate::graph::ComponentGraph;
use crate::host::{AttributeHost, FollowMode, SpaceOption};
use crate::spec::{AttrPath, ChildRef, ComponentSpec, ConnectionKind};
use crate::wire::{Link, PendingLink, SpaceSwitchSummary, Wiring};

/// Stage one over every edge of `graph`.
pub fn wire_direct(
    graph: &ComponentGraph,
    host: &mut dyn AttributeHost,
    diagnostics: &mut Diagnostics,
) -> Wiring {
    let mut wiring = Wiring::new();
    for edge in graph.edges() {
        resolve_edge(
            graph.component(edge.parent),
            graph.component(edge.child),
            graph.child_ref(edge),
            host,
            &mut wiring,
            diagnostics,
        );
    }
    tracing::debug!(
        links = wiring.links.len(),
        pending = wiring.pending.len(),
        "direct wiring done"
    );
    wiring
}

/// Wire one parent/child pair. Down pairs run parent output -> child input,
/// up pairs run child output -> parent input. Hierarchical kinds that need
/// the finished stage-one state are queued on `wiring.pending`.
pub fn resolve_edge(
    parent: &ComponentSpec,
    child: &ComponentSpec,
    child_ref: &ChildRef,
    host: &mut dyn AttributeHost,
    wiring: &mut Wiring,
    diagnostics: &mut Diagnostics,
) {
    if !child_ref.is_balanced() {
        diagnostics.warn(
            Stage::Wire,
            parent.full_name(),
            format!(
                "child reference to {} has unequal attribute lists; skipped",
                child.full_name()
            ),
        );
        return;
    }

    for (parent_attr, child_attr) in child_ref.parent_attrs.iter().zip(&child_ref.child_attrs) {
        // the receiving attribute may pin its own kind
        let kind = child
            .input_attr(child_attr)
            .and_then(|attr| attr.connection_kind)
            .unwrap_or(child_ref.connection_kind);
        let pair = PendingLink {
            src: parent.output_path(parent_attr),
            dst: child.input_path(child_attr),
            kind,
            source_component: parent.full_name(),
            space_name: child_ref.space_name.clone(),
        };
        dispatch(pair, host, wiring, diagnostics);
    }

    for (parent_attr, child_attr) in child_ref
        .parent_up_attrs
        .iter()
        .zip(&child_ref.child_up_attrs)
    {
        let kind = parent
            .input_attr(parent_attr)
            .and_then(|attr| attr.connection_kind)
            .unwrap_or(child_ref.connection_kind);
        let pair = PendingLink {
            src: child.output_path(child_attr),
            dst: parent.input_path(parent_attr),
            kind,
            source_component: child.full_name(),
            space_name: child_ref.space_name.clone(),
        };
        dispatch(pair, host, wiring, diagnostics);
    }
}

fn dispatch(
    pair: PendingLink,
    host: &mut dyn AttributeHost,
    wiring: &mut Wiring,
    diagnostics: &mut Diagnostics,
) {
    let result = match pair.kind {
        ConnectionKind::Direct | ConnectionKind::Parent => host.connect(&pair.src, &pair.dst),
        ConnectionKind::Copy => host.copy_value(&pair.src, &pair.dst),
        ConnectionKind::CopyTransform => host.copy_transform(&pair.src, &pair.dst),
        ConnectionKind::Proxy => host.make_proxy(&pair.src, &pair.dst),
        ConnectionKind::ParentOffset
        | ConnectionKind::ParentOffsetTranslate
        | ConnectionKind::SpaceSwitch => {
            wiring.pending.push(pair);
            return;
        }
    };
    record(result, pair.src, pair.dst, pair.kind, wiring, diagnostics);
}

fn record(
    result: Result<(), HostError>,
    src: AttrPath,
    dst: AttrPath,
    kind: ConnectionKind,
    wiring: &mut Wiring,
    diagnostics: &mut Diagnostics,
) {
    match result {
        Ok(()) => {
            tracing::trace!(%src, %dst, %kind, "wired");
            wiring.links.push(Link { src, dst, kind });
        }
        // the first link stays
        Err(err @ HostError::AlreadyConnected { .. }) => {
            diagnostics.warn(
                Stage::Wire,
                dst.node.clone(),
                format!("{kind} {src} -> {dst} skipped, keeping existing link: {err}"),
            );
        }
        Err(err) => {
            diagnostics.warn(
                Stage::Wire,
                dst.node.clone(),
                format!("{kind} {src} -> {dst} failed: {err}"),
            );
        }
    }
}

/// Stage two: parent follows and space switches from the pending list.
pub fn wire_deferred(
    wiring: &mut Wiring,
    host: &mut dyn AttributeHost,
    diagnostics: &mut Diagnostics,
) {
    let pending = std::mem::take(&mut wiring.pending);

    // switch targets, in first-seen order, with their contributing links
    let mut switches: Vec<(AttrPath, Vec<PendingLink>)> = Vec::new();
    for pair in pending {
        let mode = match pair.kind {
            ConnectionKind::ParentOffset => FollowMode::Full,
            ConnectionKind::ParentOffsetTranslate => FollowMode::TranslateOnly,
            _ => {
                match switches.iter_mut().find(|(dst, _)| *dst == pair.dst) {
                    Some((_, group)) => group.push(pair),
                    None => switches.push((pair.dst.clone(), vec![pair])),
                }
                continue;
            }
        };
        let result = host.follow_parent(&pair.src, &pair.dst, mode);
        record(result, pair.src, pair.dst, pair.kind, wiring, diagnostics);
    }

    for (dst, group) in switches {
        build_space_switch(dst, group, host, wiring, diagnostics);
    }
}

fn build_space_switch(
    dst: AttrPath,
    group: Vec<PendingLink>,
    host: &mut dyn AttributeHost,
    wiring: &mut Wiring,
    diagnostics: &mut Diagnostics,
) {
    let mut options: Vec<SpaceOption> = Vec::with_capacity(group.len() + 1);
    if let Some(existing) = host.source_of(&dst) {
        options.push(SpaceOption {
            id: 0,
            name: existing.node.clone(),
            source: existing,
        });
    }
    for pair in &group {
        if options.iter().any(|o| o.source == pair.src) {
            continue;
        }
        options.push(SpaceOption {
            id: options.len(),
            name: pair
                .space_name
                .clone()
                .unwrap_or_else(|| pair.source_component.clone()),
            source: pair.src.clone(),
        });
    }

    // last declared parent drives by default
    let active = group
        .last()
        .and_then(|last| options.iter().find(|o| o.source == last.src))
        .map(|o| o.id)
        .unwrap_or(0);

    match host.create_space_switch(&dst, &options, active) {
        Ok(()) => {
            tracing::debug!(%dst, options = options.len(), active, "space switch built");
            for option in &options {
                wiring.links.push(Link {
                    src: option.source.clone(),
                    dst: dst.clone(),
                    kind: ConnectionKind::SpaceSwitch,
                });
            }
            wiring.space_switches.push(SpaceSwitchSummary {
                dst,
                options,
                active,
            });
        }
        Err(err) => diagnostics.warn(
            Stage::Wire,
            dst.node.clone(),
            format!("space switch on {dst} failed: {err}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::host::{AttrValue, BindBuilder, ControlBuilder, MemoryScene, SceneOp, StandardComponent};
    use crate::spec::{AttrKind, AttributeSpec, Prefix};
    use pretty_assertions::assert_eq;

    fn component(name: &str) -> ComponentSpec {
        ComponentSpec::new(name, Prefix::C, "UtilityModule")
            .with_input(AttributeSpec::new("IN_WORLD", AttrKind::Matrix))
            .with_input(AttributeSpec::new("IN_SCALE", AttrKind::Scalar))
            .with_output(AttributeSpec::new("OUT_WORLD", AttrKind::Matrix))
            .with_output(AttributeSpec::new("OUT_SCALE", AttrKind::Scalar))
    }

    fn scene_for(graph: &ComponentGraph) -> MemoryScene {
        let mut scene = MemoryScene::new();
        graph.for_each_component(|_, spec| {
            let mut builder = StandardComponent::default();
            builder.create_bind_structures(spec, &mut scene).expect("bind");
            builder.initialize_attributes(spec, &mut scene).expect("attrs");
        });
        scene
    }

    fn build(components: Vec<ComponentSpec>) -> (ComponentGraph, MemoryScene) {
        let graph = ComponentGraph::build(components, &mut Diagnostics::new());
        let scene = scene_for(&graph);
        (graph, scene)
    }

    #[test]
    fn parent_edge_links_every_pair() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::Parent)
                .with_attrs([("OUT_WORLD", "IN_WORLD"), ("OUT_SCALE", "IN_SCALE")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let mut diagnostics = Diagnostics::new();
        let wiring = wire_direct(&graph, &mut scene, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(wiring.links.len(), 2);
        assert_eq!(
            scene.source_of(&AttrPath::new("C_spine_input_GRP", "IN_SCALE")),
            Some(AttrPath::new("C_root_output_GRP", "OUT_SCALE"))
        );
    }

    #[test]
    fn second_parent_on_same_input_warns_and_keeps_first_link() {
        let edge = || {
            ChildRef::new("hand", Prefix::C, ConnectionKind::Parent)
                .with_attrs([("OUT_WORLD", "IN_WORLD")])
        };
        let (graph, mut scene) = build(vec![
            component("arm").with_child(edge()),
            component("chest").with_child(edge()),
            component("hand"),
        ]);
        let mut diagnostics = Diagnostics::new();
        let wiring = wire_direct(&graph, &mut scene, &mut diagnostics);

        assert_eq!(wiring.links.len(), 1);
        let notes: Vec<_> = diagnostics.in_stage(Stage::Wire).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
        assert_eq!(notes[0].component, "C_hand_input_GRP");
        assert!(notes[0].message.contains("keeping existing link"));
        assert_eq!(
            scene.source_of(&AttrPath::new("C_hand_input_GRP", "IN_WORLD")),
            Some(AttrPath::new("C_arm_output_GRP", "OUT_WORLD"))
        );
    }

    #[test]
    fn up_attrs_run_child_to_parent() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::Direct)
                .with_up_attrs([("IN_SCALE", "OUT_SCALE")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let wiring = wire_direct(&graph, &mut scene, &mut Diagnostics::new());

        assert_eq!(
            wiring.links,
            vec![Link {
                src: AttrPath::new("C_spine_output_GRP", "OUT_SCALE"),
                dst: AttrPath::new("C_root_input_GRP", "IN_SCALE"),
                kind: ConnectionKind::Direct,
            }]
        );
    }

    #[test]
    fn child_attribute_kind_overrides_reference_kind() {
        let mut child = component("spine");
        child.input_attrs[1].connection_kind = Some(ConnectionKind::Copy);
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::Parent)
                .with_attrs([("OUT_WORLD", "IN_WORLD"), ("OUT_SCALE", "IN_SCALE")]),
        );
        let (graph, mut scene) = build(vec![root, child]);
        let wiring = wire_direct(&graph, &mut scene, &mut Diagnostics::new());

        let kinds: Vec<ConnectionKind> = wiring.links.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![ConnectionKind::Parent, ConnectionKind::Copy]);
        assert_eq!(
            scene.source_of(&AttrPath::new("C_spine_input_GRP", "IN_SCALE")),
            None
        );
    }

    #[test]
    fn copy_transform_edge_copies_without_live_link() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::CopyTransform)
                .with_attrs([("OUT_WORLD", "IN_WORLD")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let mut placed = [0.0; 16];
        placed[12] = 4.0;
        scene
            .set_value(&AttrPath::new("C_root_output_GRP", "OUT_WORLD"), AttrValue::Matrix(placed))
            .expect("set");

        let mut diagnostics = Diagnostics::new();
        let wiring = wire_direct(&graph, &mut scene, &mut diagnostics);

        let dst = AttrPath::new("C_spine_input_GRP", "IN_WORLD");
        assert!(diagnostics.is_empty());
        assert_eq!(wiring.links[0].kind, ConnectionKind::CopyTransform);
        assert_eq!(scene.value(&dst), Some(&AttrValue::Matrix(placed)));
        assert_eq!(scene.source_of(&dst), None);
    }

    #[test]
    fn proxy_edge_marks_child_input_as_proxy() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::Proxy)
                .with_attrs([("OUT_SCALE", "IN_SCALE")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let wiring = wire_direct(&graph, &mut scene, &mut Diagnostics::new());

        let src = AttrPath::new("C_root_output_GRP", "OUT_SCALE");
        let dst = AttrPath::new("C_spine_input_GRP", "IN_SCALE");
        assert_eq!(wiring.links[0].kind, ConnectionKind::Proxy);
        assert_eq!(scene.proxy_of(&dst), Some(&src));
    }

    #[test]
    fn refused_proxy_is_not_recorded_as_a_link() {
        let edge = || {
            ChildRef::new("hand", Prefix::C, ConnectionKind::Proxy)
                .with_attrs([("OUT_SCALE", "IN_SCALE")])
        };
        let (graph, mut scene) = build(vec![
            component("arm").with_child(edge()),
            component("chest").with_child(edge()),
            component("hand"),
        ]);
        let mut diagnostics = Diagnostics::new();
        let wiring = wire_direct(&graph, &mut scene, &mut diagnostics);

        assert_eq!(wiring.links.len(), 1);
        assert_eq!(wiring.links[0].src, AttrPath::new("C_arm_output_GRP", "OUT_SCALE"));
        let notes: Vec<_> = diagnostics.in_stage(Stage::Wire).collect();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].severity, Severity::Warning);
    }

    #[test]
    fn translate_offset_follows_parent_translation_only() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::ParentOffsetTranslate)
                .with_attrs([("OUT_WORLD", "IN_WORLD")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let mut diagnostics = Diagnostics::new();
        let mut wiring = wire_direct(&graph, &mut scene, &mut diagnostics);
        assert!(wiring.links.is_empty());

        wire_deferred(&mut wiring, &mut scene, &mut diagnostics);

        let src = AttrPath::new("C_root_output_GRP", "OUT_WORLD");
        let dst = AttrPath::new("C_spine_input_GRP", "IN_WORLD");
        assert!(diagnostics.is_empty());
        assert_eq!(wiring.links[0].kind, ConnectionKind::ParentOffsetTranslate);
        assert!(scene.ops().contains(&SceneOp::FollowParent {
            src,
            dst,
            mode: FollowMode::TranslateOnly,
        }));
    }

    #[test]
    fn deferred_kinds_wait_for_stage_two() {
        let root = component("root").with_child(
            ChildRef::new("spine", Prefix::C, ConnectionKind::ParentOffset)
                .with_attrs([("OUT_WORLD", "IN_WORLD")]),
        );
        let (graph, mut scene) = build(vec![root, component("spine")]);
        let mut diagnostics = Diagnostics::new();
        let mut wiring = wire_direct(&graph, &mut scene, &mut diagnostics);
        assert!(wiring.links.is_empty());
        assert_eq!(wiring.pending.len(), 1);

        wire_deferred(&mut wiring, &mut scene, &mut diagnostics);
        assert!(wiring.pending.is_empty());
        assert_eq!(wiring.links[0].kind, ConnectionKind::ParentOffset);
        assert_eq!(
            scene.source_of(&AttrPath::new("C_spine_input_GRP", "IN_WORLD")),
            Some(AttrPath::new("C_root_output_GRP", "OUT_WORLD"))
        );
    }

    #[test]
    fn space_switch_folds_in_existing_driver_and_activates_last_parent() {
        let world = component("world").with_child(
            ChildRef::new("hand", Prefix::C, ConnectionKind::Parent)
                .with_attrs([("OUT_WORLD", "IN_WORLD")]),
        );
        let chest = component("chest").with_child(
            ChildRef::new("hand", Prefix::C, ConnectionKind::SpaceSwitch)
                .with_attrs([("OUT_WORLD", "IN_WORLD")])
                .with_space_name("chestSpace"),
        );
        let head = component("head").with_child(
            ChildRef::new("hand", Prefix::C, ConnectionKind::SpaceSwitch)
                .with_attrs([("OUT_WORLD", "IN_WORLD")]),
        );
        let (graph, mut scene) = build(vec![world, chest, head, component("hand")]);
        let mut diagnostics = Diagnostics::new();
        let mut wiring = wire_direct(&graph, &mut scene, &mut diagnostics);
        wire_deferred(&mut wiring, &mut scene, &mut diagnostics);

        assert_eq!(wiring.space_switches.len(), 1);
        let switch = &wiring.space_switches[0];
        let names: Vec<&str> = switch.options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["C_world_output_GRP", "chestSpace", "C_head"]);
        let ids: Vec<usize> = switch.options.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(switch.active, 2);
        assert!(diagnostics.warnings().next().is_none());
    }
}
