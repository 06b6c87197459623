//! Region classifier: fill each region selector with the leaves whose tag
//! matches its pattern.

use crate::outbound::{RoutingConfiguration, merge_unique};
use crate::policy::Policy;
use crate::reconcile::ingest::IngestedNodes;

/// Per-region outcome, in policy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOutcome {
    pub matched: usize,
    pub coerced: bool,
}

pub fn classify(
    config: &mut RoutingConfiguration,
    ingested: &IngestedNodes,
    policy: &Policy,
) -> Vec<RegionOutcome> {
    let mut outcomes = Vec::with_capacity(policy.regions.len());
    for bucket in &policy.regions {
        let Some(node) = config.get_mut(&bucket.tag) else {
            continue;
        };

        // Region selectors must stay user-selectable.
        let coerced = node.coerce_to_selector();
        if coerced {
            tracing::warn!(tag = %bucket.tag, "region aggregator was a urltest; turned it into a selector");
        }

        if node.members().is_none() {
            tracing::warn!(
                tag = %bucket.tag,
                found = %node.type_name(),
                "region tag is not an aggregator; skipping"
            );
            continue;
        }
        let Some(members) = node.members_mut() else {
            continue;
        };
        let matched = bucket.select(&ingested.tags);

        if !matched.is_empty() {
            merge_unique(members, matched.iter().copied());
        } else if members.is_empty() {
            members.push(policy.tags.default.clone());
        }
        tracing::debug!(tag = %bucket.tag, matched = matched.len(), "classified region");

        outcomes.push(RegionOutcome {
            matched: matched.len(),
            coerced,
        });
    }
    outcomes
}
