//! Scaffold guarantor: the mandatory aggregators exist before anything is
//! merged into them. Existing nodes are never replaced.

use crate::outbound::{OutboundNode, RoutingConfiguration};
use crate::policy::Policy;

/// Synthesize every missing scaffold node. Returns the tags that were added.
pub fn ensure_scaffold(config: &mut RoutingConfiguration, policy: &Policy) -> Vec<String> {
    let tags = &policy.tags;
    let mut wanted = vec![
        OutboundNode::direct(tags.direct.as_str()),
        OutboundNode::selector(tags.manual.as_str(), Vec::new()),
        OutboundNode::probe(
            tags.auto.as_str(),
            Vec::new(),
            policy.probe.url.as_str(),
            policy.probe.interval.as_str(),
        ),
        OutboundNode::selector(
            tags.default.as_str(),
            vec![tags.manual.clone(), tags.auto.clone(), tags.direct.clone()],
        ),
    ];
    wanted.extend(
        policy
            .regions
            .iter()
            .map(|r| OutboundNode::selector(r.tag.as_str(), Vec::new())),
    );

    let mut added = Vec::new();
    for node in wanted {
        let tag = node.tag.clone();
        if config.push(node) {
            added.push(tag);
        }
    }
    if !added.is_empty() {
        tracing::info!(added = ?added, "synthesized scaffold nodes");
    }
    added
}
