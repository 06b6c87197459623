//! Node ingestion: drop untagged descriptors, dedupe by tag (first wins).

use crate::outbound::OutboundNode;
use crate::source::FetchedBatch;

use std::collections::HashSet;

/// Tag-unique leaves in ingestion order, plus their tags.
#[derive(Debug, Clone, Default)]
pub struct IngestedNodes {
    pub nodes: Vec<OutboundNode>,
    pub tags: Vec<String>,
}

/// Normalize fetched batches. Every batch has already been checked for at
/// least one tagged descriptor by `fetch_all`.
pub fn ingest(batches: Vec<FetchedBatch>) -> IngestedNodes {
    let mut out = IngestedNodes::default();
    let mut seen = HashSet::new();
    let mut untagged = 0usize;

    for batch in batches {
        for raw in batch.nodes {
            let Some(node) = OutboundNode::leaf_from_value(raw) else {
                untagged += 1;
                continue;
            };
            if seen.insert(node.tag.clone()) {
                out.tags.push(node.tag.clone());
                out.nodes.push(node);
            }
        }
    }

    if untagged > 0 {
        tracing::warn!(untagged, "ignored node descriptors without a tag");
    }
    tracing::info!(nodes = out.nodes.len(), "ingested nodes");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceRef;
    use crate::source::request::SourceKind;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    fn batch(name: &str, nodes: Value) -> FetchedBatch {
        FetchedBatch {
            origin: SourceRef {
                kind: SourceKind::Subscription,
                name: name.to_string(),
            },
            nodes: nodes.as_array().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn first_occurrence_wins_across_batches() {
        let ingested = ingest(vec![
            batch("a", json!([{"tag": "HK-1", "server": "a"}, {"tag": "US-1"}])),
            batch("b", json!([{"tag": "HK-1", "server": "b"}, {"tag": "JP-1"}])),
        ]);
        assert_eq!(ingested.tags, vec!["HK-1", "US-1", "JP-1"]);
        assert_eq!(ingested.nodes[0].extra.get("server"), Some(&json!("a")));
    }

    #[test]
    fn untagged_descriptors_are_dropped() {
        let ingested = ingest(vec![batch(
            "a",
            json!([{"type": "vmess"}, {"tag": ""}, {"tag": "SG-1"}, null]),
        )]);
        assert_eq!(ingested.tags, vec!["SG-1"]);
    }
}
