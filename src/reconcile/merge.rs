//! Graph merge: append fresh leaves, then widen the all-node aggregators.

use crate::outbound::{RoutingConfiguration, merge_unique};
use crate::policy::Policy;
use crate::reconcile::ingest::IngestedNodes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Selector,
    Probe,
}

/// Returns how many leaves were appended. Baseline nodes win tag collisions.
pub fn merge_leaves(
    config: &mut RoutingConfiguration,
    ingested: &IngestedNodes,
    policy: &Policy,
) -> usize {
    let mut appended = 0usize;
    for node in &ingested.nodes {
        if config.push(node.clone()) {
            appended += 1;
        } else {
            tracing::debug!(tag = %node.tag, "baseline already has this tag; keeping baseline node");
        }
    }
    tracing::info!(appended, "merged leaves into configuration");

    let tags: Vec<&str> = ingested.tags.iter().map(String::as_str).collect();
    widen(config, &policy.tags.manual, Expect::Selector, &tags);
    widen(config, &policy.tags.auto, Expect::Probe, &tags);
    appended
}

fn widen(config: &mut RoutingConfiguration, tag: &str, expect: Expect, leaves: &[&str]) {
    let Some(node) = config.get_mut(tag) else {
        return;
    };
    let kind_ok = match expect {
        Expect::Selector => node.is_selector(),
        Expect::Probe => node.is_probe(),
    };
    if !kind_ok {
        tracing::warn!(
            tag,
            found = %node.type_name(),
            expected = ?expect,
            "all-node aggregator has the wrong type; not widening it"
        );
        return;
    }
    if let Some(members) = node.members_mut() {
        let added = merge_unique(members, leaves.iter().copied());
        tracing::debug!(tag, added, "widened aggregator");
    }
}
