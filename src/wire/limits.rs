use crate::diagnostics::{Diagnostics, Stage};
use crate::host::AttributeHost;
use crate::spec::Limits;
use crate::wire::Link;
use std::collections::BTreeSet;

/// Share min/max constraints across every link in both directions until
/// nothing changes. Both ends of a link end up with the intersection of the
/// two ranges. Links whose intersection is empty are reported and left alone.
///
/// Returns how many attribute ranges were tightened.
pub fn propagate_limits(
    host: &mut dyn AttributeHost,
    links: &[Link],
    diagnostics: &mut Diagnostics,
) -> usize {
    let mut updated = 0;
    let mut conflicting: BTreeSet<usize> = BTreeSet::new();

    // each productive round tightens at least one bound drawn from a finite set
    for _ in 0..=links.len() * 2 {
        let mut changed = false;
        for (index, link) in links.iter().enumerate() {
            if conflicting.contains(&index) {
                continue;
            }
            let (Some(src), Some(dst)) = (host.limits(&link.src), host.limits(&link.dst)) else {
                continue;
            };
            let merged = src.intersect(dst);
            if is_inverted(merged) {
                conflicting.insert(index);
                diagnostics.warn(
                    Stage::Limits,
                    link.dst.node.clone(),
                    format!("limits on {} and {} do not overlap", link.src, link.dst),
                );
                continue;
            }
            for (path, current) in [(&link.src, src), (&link.dst, dst)] {
                if current == merged {
                    continue;
                }
                match host.set_limits(path, merged) {
                    Ok(()) => {
                        updated += 1;
                        changed = true;
                    }
                    Err(err) => diagnostics.warn(
                        Stage::Limits,
                        path.node.clone(),
                        format!("could not set limits on {path}: {err}"),
                    ),
                }
            }
        }
        if !changed {
            break;
        }
    }

    tracing::debug!(updated, "limits propagated");
    updated
}

fn is_inverted(limits: Limits) -> bool {
    matches!((limits.min, limits.max), (Some(min), Some(max)) if min > max)
}
