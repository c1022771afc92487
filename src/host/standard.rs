//! The standard component builder shared by the built-in component types.
//!
//! Layout per component (`P` prefix, `N` name):
//!
//! ```text
//! rig_GRP
//! └── P_N_GRP
//!     ├── P_N_output_GRP      declared output attributes
//!     ├── P_N_input_GRP       declared input attributes
//!     ├── P_N_controls_GRP    P_N_<control>_CTL, internal reference nodes
//!     └── P_N_deform_GRP      P_N_<bind>_BND_JNT
//! ```

use crate::error::HostError;
use crate::host::{AttributeHost, BindBuilder, ControlBuilder};
use crate::spec::{AttrPath, AttributeSpec, ComponentSpec};

pub const RIG_GROUP: &str = "rig_GRP";

#[derive(Debug, Default)]
pub struct StandardComponent {
    groups_built: bool,
}

impl StandardComponent {
    /// `{full}_{internalRef}` split into node and attribute. References that
    /// are not attribute paths are not wired.
    fn internal_path(component: &ComponentSpec, attr: &AttributeSpec) -> Option<AttrPath> {
        let internal = attr.internal_ref.as_deref()?;
        AttrPath::parse(&format!("{}_{}", component.full_name(), internal))
    }

    fn ensure_internal(
        component: &ComponentSpec,
        attr: &AttributeSpec,
        path: &AttrPath,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError> {
        if !host.has_node(&path.node) {
            host.create_node(&path.node, Some(component.group_name("controls").as_str()))?;
        }
        if host.attr_kind(path).is_none() {
            let mut internal = attr.clone();
            internal.name = path.attr.clone();
            internal.internal_ref = None;
            host.add_attr(&path.node, &internal)?;
        }
        Ok(())
    }
}

impl BindBuilder for StandardComponent {
    fn create_bind_structures(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError> {
        if !host.has_node(RIG_GROUP) {
            host.create_node(RIG_GROUP, None)?;
        }

        let base = format!("{}_GRP", component.full_name());
        host.create_node(&base, Some(RIG_GROUP))?;
        for part in ["output", "input", "controls", "deform"] {
            host.create_node(&component.group_name(part), Some(base.as_str()))?;
        }
        self.groups_built = true;

        let deform = component.group_name("deform");
        for op in &component.bind_geometry {
            let joint = format!("{}_{}_BND_JNT", component.full_name(), op.name);
            let parent = match &op.parent {
                Some(parent) => format!("{}_{}_BND_JNT", component.full_name(), parent),
                None => deform.clone(),
            };
            host.create_node(&joint, Some(parent.as_str()))?;
        }
        Ok(())
    }
}

impl ControlBuilder for StandardComponent {
    fn initialize_attributes(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError> {
        let output = component.output_group();
        for attr in &component.output_attrs {
            host.add_attr(&output, attr)?;
        }
        let input = component.input_group();
        for attr in &component.input_attrs {
            host.add_attr(&input, attr)?;
        }
        Ok(())
    }

    fn create_control_structure(
        &mut self,
        component: &ComponentSpec,
        host: &mut dyn AttributeHost,
    ) -> Result<(), HostError> {
        if !self.groups_built {
            return Err(HostError::MissingNode(format!("{}_GRP", component.full_name())));
        }

        let controls = component.group_name("controls");
        for name in component.controls.keys() {
            host.create_node(
                &format!("{}_{}_CTL", component.full_name(), name),
                Some(controls.as_str()),
            )?;
        }

        for attr in &component.output_attrs {
            if let Some(internal) = Self::internal_path(component, attr) {
                Self::ensure_internal(component, attr, &internal, host)?;
                host.connect(&internal, &component.output_path(&attr.name))?;
            }
        }
        for attr in &component.input_attrs {
            if let Some(internal) = Self::internal_path(component, attr) {
                Self::ensure_internal(component, attr, &internal, host)?;
                host.connect(&component.input_path(&attr.name), &internal)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryScene;
    use crate::spec::{AttrKind, BindOp, Prefix};
    use pretty_assertions::assert_eq;

    fn spine() -> ComponentSpec {
        let mut spec = ComponentSpec::new("spine", Prefix::C, "SingleJointModule")
            .with_input(
                AttributeSpec::new("IN_WORLD", AttrKind::Matrix)
                    .with_internal_ref("base_CTL.offsetParentMatrix"),
            )
            .with_output(
                AttributeSpec::new("OUT_WORLD", AttrKind::Matrix)
                    .with_internal_ref("base_CTL.worldMatrix"),
            )
            .with_output(AttributeSpec::new("OUT_NOTE", AttrKind::String).with_internal_ref("not a path"));
        spec.bind_geometry = vec![
            BindOp {
                name: "base".to_string(),
                parent: None,
            },
            BindOp {
                name: "tip".to_string(),
                parent: Some("base".to_string()),
            },
        ];
        spec.controls.insert("base".to_string(), serde_json::json!({"shape": "circle"}));
        spec
    }

    #[test]
    fn builds_group_layout_and_bind_joints() {
        let component = spine();
        let mut scene = MemoryScene::new();
        let mut builder = StandardComponent::default();
        builder
            .create_bind_structures(&component, &mut scene)
            .expect("bind");

        assert_eq!(scene.parent_of("C_spine_GRP"), Some(RIG_GROUP));
        assert_eq!(scene.parent_of("C_spine_input_GRP"), Some("C_spine_GRP"));
        assert_eq!(scene.parent_of("C_spine_base_BND_JNT"), Some("C_spine_deform_GRP"));
        assert_eq!(scene.parent_of("C_spine_tip_BND_JNT"), Some("C_spine_base_BND_JNT"));
    }

    #[test]
    fn control_structure_wires_internal_references() {
        let component = spine();
        let mut scene = MemoryScene::new();
        let mut builder = StandardComponent::default();
        builder.create_bind_structures(&component, &mut scene).expect("bind");
        builder.initialize_attributes(&component, &mut scene).expect("attrs");
        builder
            .create_control_structure(&component, &mut scene)
            .expect("controls");

        assert!(scene.has_node("C_spine_base_CTL"));
        assert_eq!(
            scene.source_of(&component.output_path("OUT_WORLD")),
            Some(AttrPath::new("C_spine_base_CTL", "worldMatrix"))
        );
        assert_eq!(
            scene.source_of(&AttrPath::new("C_spine_base_CTL", "offsetParentMatrix")),
            Some(component.input_path("IN_WORLD"))
        );
        assert_eq!(scene.source_of(&component.output_path("OUT_NOTE")), None);
    }

    #[test]
    fn controls_before_bind_is_an_error() {
        let component = spine();
        let mut scene = MemoryScene::new();
        let err = StandardComponent::default()
            .create_control_structure(&component, &mut scene)
            .expect_err("groups missing");
        assert_eq!(err, HostError::MissingNode("C_spine_GRP".to_string()));
    }
}
