//! Blueprint expansion.
//!
//! A template entry whose `componentType` names a blueprint is an *instance*:
//! every blueprint component is copied into the template as
//! `instanceName + localName`, and every child reference to the instance is
//! replaced by references to the blueprint's input components.

use crate::Result;
use crate::diagnostics::{Diagnostics, Stage};
use crate::spec::{BlueprintDoc, ChildRef, ComponentDoc, ComponentSpec, TemplateSet, load_blueprint};
use anyhow::{Context, bail};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Where blueprint documents come from.
pub trait BlueprintSource {
    fn contains(&self, id: &str) -> bool;
    fn load(&self, id: &str) -> Result<BlueprintDoc>;
}

/// `<root>/<id>.json`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            bail!("blueprint catalog {} is not a readable directory", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        valid.then(|| self.root.join(format!("{id}.json")))
    }
}

impl BlueprintSource for DirectorySource {
    fn contains(&self, id: &str) -> bool {
        self.path_for(id).is_some_and(|p| p.is_file())
    }

    fn load(&self, id: &str) -> Result<BlueprintDoc> {
        let path = self
            .path_for(id)
            .with_context(|| format!("invalid blueprint id '{}'", id))?;
        load_blueprint(path)
    }
}

impl BlueprintSource for BTreeMap<String, BlueprintDoc> {
    fn contains(&self, id: &str) -> bool {
        self.contains_key(id)
    }

    fn load(&self, id: &str) -> Result<BlueprintDoc> {
        self.get(id)
            .cloned()
            .with_context(|| format!("blueprint '{}' not found", id))
    }
}

/// A loaded blueprint plus every instance name that expanded it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlueprintSpec {
    pub id: String,
    pub components_by_local_name: BTreeMap<String, ComponentDoc>,
    pub input_component_names: Vec<String>,
    pub aliases: Vec<String>,
}

impl BlueprintSpec {
    fn from_doc(id: &str, doc: BlueprintDoc) -> Self {
        Self {
            id: id.to_string(),
            components_by_local_name: doc.components,
            input_component_names: doc.variables.input_components,
            aliases: Vec::new(),
        }
    }
}

pub struct BlueprintCatalog {
    source: Box<dyn BlueprintSource>,
    cache: BTreeMap<String, BlueprintSpec>,
}

impl BlueprintCatalog {
    pub fn new(source: impl BlueprintSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            cache: BTreeMap::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(BTreeMap::<String, BlueprintDoc>::new())
    }

    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(DirectorySource::open(root)?))
    }

    pub fn is_blueprint(&self, component_type: &str) -> bool {
        !component_type.trim().is_empty()
            && (self.cache.contains_key(component_type) || self.source.contains(component_type))
    }

    /// Load once per distinct id; later calls hit the cache.
    pub fn load(&mut self, id: &str) -> Result<&mut BlueprintSpec> {
        if !self.cache.contains_key(id) {
            let doc = self
                .source
                .load(id)
                .with_context(|| format!("load blueprint '{}'", id))?;
            tracing::debug!(blueprint = id, components = doc.components.len(), "loaded blueprint");
            self.cache.insert(id.to_string(), BlueprintSpec::from_doc(id, doc));
        }
        self.cache
            .get_mut(id)
            .with_context(|| format!("blueprint '{}' missing from cache", id))
    }

    pub fn get(&self, id: &str) -> Option<&BlueprintSpec> {
        self.cache.get(id)
    }

    pub fn loaded(&self) -> impl Iterator<Item = &BlueprintSpec> {
        self.cache.values()
    }
}

struct Instance {
    name: String,
    blueprint: String,
}

/// Expand every blueprint instance in `templates`, repeating for blueprints
/// nested inside blueprints up to `max_depth` rounds.
pub fn expand(
    templates: TemplateSet,
    catalog: &mut BlueprintCatalog,
    max_depth: usize,
    diagnostics: &mut Diagnostics,
) -> Result<TemplateSet> {
    let mut set = templates;

    for depth in 0.. {
        let instances: Vec<Instance> = set
            .iter()
            .filter(|(_, spec)| catalog.is_blueprint(&spec.component_type))
            .map(|(name, spec)| Instance {
                name: name.clone(),
                blueprint: spec.component_type.clone(),
            })
            .collect();
        if instances.is_empty() {
            break;
        }
        if depth >= max_depth {
            let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
            bail!(
                "blueprint nesting exceeds {} levels (still unexpanded: {})",
                max_depth,
                names.join(", ")
            );
        }

        // alias -> names of the components that replace references to it
        let mut rewrites: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for instance in &instances {
            let prefix = match set.get(&instance.name) {
                Some(spec) => spec.prefix,
                None => continue,
            };
            let blueprint = catalog.load(&instance.blueprint)?;
            if !blueprint.aliases.contains(&instance.name) {
                blueprint.aliases.push(instance.name.clone());
            }
            tracing::debug!(
                instance = %instance.name,
                blueprint = %instance.blueprint,
                "expanding blueprint instance"
            );

            for (local, doc) in &blueprint.components_by_local_name {
                let name = format!("{}{}", instance.name, local);
                let mut spec = ComponentSpec::from_doc(&name, doc, prefix, diagnostics);
                for child in &mut spec.children {
                    child.child_name = format!("{}{}", instance.name, child.child_name);
                }
                if set.contains_key(&name) {
                    diagnostics.warn(
                        Stage::Expand,
                        name.clone(),
                        format!(
                            "blueprint '{}' component collides with an existing component; keeping the existing one",
                            instance.blueprint
                        ),
                    );
                    continue;
                }
                set.insert(name, spec);
            }

            let inputs = blueprint
                .input_component_names
                .iter()
                .map(|input| format!("{}{}", instance.name, input))
                .collect();
            rewrites.insert(instance.name.clone(), inputs);
        }

        for spec in set.values_mut() {
            let owner = spec.full_name();
            spec.children = rewrite_aliases(
                &owner,
                std::mem::take(&mut spec.children),
                &rewrites,
                diagnostics,
            );
        }
        for alias in rewrites.keys() {
            set.remove(alias);
        }
    }

    Ok(set)
}

fn rewrite_aliases(
    owner: &str,
    children: Vec<ChildRef>,
    rewrites: &BTreeMap<String, Vec<String>>,
    diagnostics: &mut Diagnostics,
) -> Vec<ChildRef> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match rewrites.get(&child.child_name) {
            Some(inputs) if inputs.is_empty() => diagnostics.warn(
                Stage::Expand,
                owner,
                format!(
                    "child reference to '{}' dropped: its blueprint declares no input components",
                    child.child_name
                ),
            ),
            Some(inputs) => {
                for input in inputs {
                    let mut rewritten = child.clone();
                    rewritten.child_name = input.clone();
                    out.push(rewritten);
                }
            }
            None => out.push(child),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{ConnectionKind, Prefix, build_template_set, parse_blueprint, parse_template};
    use pretty_assertions::assert_eq;

    fn arm_catalog() -> BlueprintCatalog {
        let arm = parse_blueprint(
            r#"{
                "variables": {"inputComponents": ["shoulder"]},
                "shoulder": {
                    "componentType": "SingleJointModule",
                    "children": [{"childName": "elbow", "connectionType": "parent"}]
                },
                "elbow": {"componentType": "SingleJointModule"}
            }"#,
        )
        .expect("blueprint should parse");
        BlueprintCatalog::new(BTreeMap::from([("armBlueprint".to_string(), arm)]))
    }

    fn template(text: &str) -> TemplateSet {
        let doc = parse_template(text).expect("template should parse");
        build_template_set(&doc, &mut Diagnostics::new())
    }

    const TWO_ARMS: &str = r#"{
        "root": {
            "componentType": "RootModule",
            "prefix": "C",
            "children": [
                {"childName": "LArm", "childPrefix": "L", "connectionType": "parent",
                 "parentAttrs": ["OUT_WORLD"], "childAttrs": ["IN_WORLD"]},
                {"childName": "RArm", "childPrefix": "R", "connectionType": "parent"}
            ]
        },
        "LArm": {"componentType": "armBlueprint", "prefix": "L"},
        "RArm": {"componentType": "armBlueprint", "prefix": "R"}
    }"#;

    #[test]
    fn instances_expand_into_namespaced_components() {
        let mut catalog = arm_catalog();
        let set = expand(template(TWO_ARMS), &mut catalog, 8, &mut Diagnostics::new())
            .expect("expand should succeed");

        assert_eq!(
            set.keys().cloned().collect::<Vec<_>>(),
            vec!["LArmelbow", "LArmshoulder", "RArmelbow", "RArmshoulder", "root"]
        );
        assert_eq!(set["LArmshoulder"].prefix, Prefix::L);
        assert_eq!(set["RArmelbow"].prefix, Prefix::R);
        assert_eq!(set["LArmshoulder"].children[0].child_name, "LArmelbow");
        assert_eq!(set["LArmshoulder"].children[0].child_prefix, Prefix::L);

        let blueprint = catalog.get("armBlueprint").expect("cached");
        assert_eq!(blueprint.aliases, vec!["LArm", "RArm"]);
    }

    #[test]
    fn references_to_instances_point_at_input_components() {
        let mut catalog = arm_catalog();
        let set = expand(template(TWO_ARMS), &mut catalog, 8, &mut Diagnostics::new())
            .expect("expand should succeed");

        let root = &set["root"];
        let targets: Vec<&str> = root.children.iter().map(|c| c.child_name.as_str()).collect();
        assert_eq!(targets, vec!["LArmshoulder", "RArmshoulder"]);
        assert_eq!(root.children[0].connection_kind, ConnectionKind::Parent);
        assert_eq!(root.children[0].parent_attrs, vec!["OUT_WORLD"]);
        assert_eq!(root.children[0].child_attrs, vec!["IN_WORLD"]);
    }

    #[test]
    fn expansion_is_stable_across_fresh_catalogs() {
        let first = expand(template(TWO_ARMS), &mut arm_catalog(), 8, &mut Diagnostics::new())
            .expect("first expand");
        let second = expand(template(TWO_ARMS), &mut arm_catalog(), 8, &mut Diagnostics::new())
            .expect("second expand");
        assert_eq!(
            first.keys().collect::<Vec<_>>(),
            second.keys().collect::<Vec<_>>()
        );
    }

    #[test]
    fn unreferenced_instances_still_expand() {
        let mut catalog = arm_catalog();
        let set = expand(
            template(r#"{"spareArm": {"componentType": "armBlueprint", "prefix": "C"}}"#),
            &mut catalog,
            8,
            &mut Diagnostics::new(),
        )
        .expect("expand should succeed");
        assert_eq!(
            set.keys().cloned().collect::<Vec<_>>(),
            vec!["spareArmelbow", "spareArmshoulder"]
        );
    }

    #[test]
    fn nested_blueprints_expand_in_rounds() {
        let arm = arm_catalog().source.load("armBlueprint").expect("arm");
        let torso = parse_blueprint(
            r#"{
                "variables": {"inputComponents": ["chest"]},
                "chest": {
                    "componentType": "SingleJointModule",
                    "children": [{"childName": "Arm", "connectionType": "parent"}]
                },
                "Arm": {"componentType": "armBlueprint"}
            }"#,
        )
        .expect("torso");
        let mut catalog = BlueprintCatalog::new(BTreeMap::from([
            ("armBlueprint".to_string(), arm),
            ("torsoBlueprint".to_string(), torso),
        ]));

        let set = expand(
            template(r#"{"upper": {"componentType": "torsoBlueprint", "prefix": "C"}}"#),
            &mut catalog,
            8,
            &mut Diagnostics::new(),
        )
        .expect("expand should succeed");

        assert_eq!(
            set.keys().cloned().collect::<Vec<_>>(),
            vec!["upperArmelbow", "upperArmshoulder", "upperchest"]
        );
        assert_eq!(set["upperchest"].children[0].child_name, "upperArmshoulder");
    }

    #[test]
    fn blank_blueprint_prefixes_take_the_instance_prefix() {
        let arm = parse_blueprint(
            r#"{
                "variables": {"inputComponents": ["shoulder"]},
                "shoulder": {
                    "componentType": "SingleJointModule",
                    "prefix": "",
                    "children": [{"childName": "hand", "childPrefix": "", "connectionType": "parent"}]
                },
                "hand": {"componentType": "SingleJointModule", "prefix": ""}
            }"#,
        )
        .expect("blank prefixes should parse");
        let mut catalog = BlueprintCatalog::new(BTreeMap::from([("armBlueprint".to_string(), arm)]));

        let set = expand(
            template(r#"{"LArm": {"componentType": "armBlueprint", "prefix": "L"}}"#),
            &mut catalog,
            8,
            &mut Diagnostics::new(),
        )
        .expect("expand should succeed");

        assert_eq!(set["LArmshoulder"].prefix, Prefix::L);
        assert_eq!(set["LArmhand"].prefix, Prefix::L);
        assert_eq!(set["LArmshoulder"].children[0].child_name, "LArmhand");
        assert_eq!(set["LArmshoulder"].children[0].child_prefix, Prefix::L);
    }

    #[test]
    fn instance_without_inputs_reports_dropped_references() {
        let prop = parse_blueprint(
            r#"{"variables": {"inputComponents": []}, "mesh": {"componentType": "UtilityModule"}}"#,
        )
        .expect("prop");
        let mut catalog = BlueprintCatalog::new(BTreeMap::from([("propBlueprint".to_string(), prop)]));

        let mut diagnostics = Diagnostics::new();
        let set = expand(
            template(
                r#"{
                    "root": {
                        "componentType": "RootModule",
                        "prefix": "C",
                        "children": [{"childName": "sword", "connectionType": "parent"}]
                    },
                    "sword": {"componentType": "propBlueprint", "prefix": "C"}
                }"#,
            ),
            &mut catalog,
            8,
            &mut diagnostics,
        )
        .expect("expand should succeed");

        assert!(set["root"].children.is_empty());
        assert!(set.contains_key("swordmesh"));
        let dropped: Vec<_> = diagnostics.in_stage(Stage::Expand).collect();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].component, "C_root");
        assert!(dropped[0].message.contains("'sword'"));
    }

    #[test]
    fn self_referencing_blueprint_hits_depth_limit() {
        let looped = parse_blueprint(
            r#"{"variables": {"inputComponents": ["a"]}, "a": {"componentType": "loop"}}"#,
        )
        .expect("loop");
        let mut catalog = BlueprintCatalog::new(BTreeMap::from([("loop".to_string(), looped)]));

        let err = expand(
            template(r#"{"x": {"componentType": "loop", "prefix": "C"}}"#),
            &mut catalog,
            3,
            &mut Diagnostics::new(),
        )
        .expect_err("recursive blueprint should fail");
        assert!(err.to_string().contains("nesting exceeds 3"));
    }

    #[test]
    fn directory_catalog_requires_existing_directory() {
        let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures");
        assert!(BlueprintCatalog::from_dir(fixtures.join("missing")).is_err());

        let mut catalog = BlueprintCatalog::from_dir(fixtures.join("blueprints")).expect("catalog");
        assert!(catalog.is_blueprint("armBlueprint"));
        assert!(!catalog.is_blueprint("../armBlueprint"));
        assert!(!catalog.is_blueprint("SingleJointModule"));
        assert_eq!(
            catalog.load("armBlueprint").expect("load").input_component_names,
            vec!["shoulder"]
        );
    }
}
