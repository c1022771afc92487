//! Side mirroring: `LR`/`RL` components become separate `L` and `R` instances.

use crate::diagnostics::{Diagnostics, Stage};
use crate::spec::{ComponentSpec, TemplateSet};

/// Flatten the template set into a component list, duplicating mirrored
/// components once per side. A mirrored instance narrows its own combined
/// child prefixes to its side so the left arm never parents the right hand.
pub fn split_sides(set: TemplateSet, diagnostics: &mut Diagnostics) -> Vec<ComponentSpec> {
    let mut out = Vec::with_capacity(set.len());
    for (_, spec) in set {
        if !spec.prefix.is_mirrored() {
            out.push(spec);
            continue;
        }

        diagnostics.info(
            Stage::Mirror,
            spec.full_name(),
            format!("mirroring into {} instances", spec.prefix.sides().len()),
        );
        for &side in spec.prefix.sides() {
            let mut instance = spec.clone();
            instance.prefix = side;
            for child in &mut instance.children {
                if child.child_prefix.is_mirrored() {
                    child.child_prefix = side;
                }
            }
            out.push(instance);
        }
    }
    out
}
