use crate::error::ReconcileError;
use crate::outbound::node::tag_of;
use crate::source::producer::NodeProducer;
use crate::source::request::{SourceRef, SourceSelection};

use serde_json::Value;

/// Descriptors produced by one source.
#[derive(Debug, Clone)]
pub struct FetchedBatch {
    pub origin: SourceRef,
    pub nodes: Vec<Value>,
}

/// Call the producer once per source, strictly one after another, stopping
/// at the first failure or at a result with no tagged descriptor. Batches
/// come back in request order.
pub fn fetch_all(
    selection: &SourceSelection,
    producer: &dyn NodeProducer,
) -> Result<Vec<FetchedBatch>, ReconcileError> {
    let mut batches = Vec::new();
    for request in selection.requests() {
        let origin = request.origin();
        let nodes = producer
            .produce(&request)
            .map_err(|source| ReconcileError::Producer {
                origin: origin.clone(),
                source,
            })?;
        let usable = nodes.iter().filter(|n| tag_of(n).is_some()).count();
        if usable == 0 {
            return Err(ReconcileError::EmptyProducerResult { origin });
        }
        tracing::info!(source = %origin, nodes = nodes.len(), usable, "fetched nodes");
        batches.push(FetchedBatch { origin, nodes });
    }
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::producer::ProducerError;
    use crate::source::request::{ProduceRequest, SourceKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves canned node lists and records every call.
    #[derive(Default)]
    struct Canned {
        lists: HashMap<String, Vec<Value>>,
        calls: RefCell<Vec<String>>,
    }

    impl NodeProducer for Canned {
        fn produce(&self, request: &ProduceRequest) -> Result<Vec<Value>, ProducerError> {
            self.calls.borrow_mut().push(request.name.clone());
            self.lists
                .get(&request.name)
                .cloned()
                .ok_or_else(|| ProducerError::InvalidName(request.name.clone()))
        }
    }

    fn canned(lists: &[(&str, Value)]) -> Canned {
        Canned {
            lists: lists
                .iter()
                .map(|(name, v)| (name.to_string(), v.as_array().cloned().unwrap_or_default()))
                .collect(),
            calls: RefCell::new(Vec::new()),
        }
    }

    fn subs(names: &[&str]) -> SourceSelection {
        SourceSelection::Subscriptions(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn accumulates_in_request_order() {
        let producer = canned(&[("a", json!([{"tag": "A1"}])), ("b", json!([{"tag": "B1"}]))]);
        let batches = fetch_all(&subs(&["b", "a"]), &producer).unwrap();
        let origins: Vec<&str> = batches.iter().map(|b| b.origin.name.as_str()).collect();
        assert_eq!(origins, vec!["b", "a"]);
        assert_eq!(*producer.calls.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn empty_result_stops_the_run() {
        let producer = canned(&[
            ("a", json!([])),
            ("b", json!([{"tag": "B1"}])),
        ]);
        let err = fetch_all(&subs(&["a", "b"]), &producer).unwrap_err();
        match err {
            ReconcileError::EmptyProducerResult { origin } => {
                assert_eq!(origin.kind, SourceKind::Subscription);
                assert_eq!(origin.name, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*producer.calls.borrow(), vec!["a"]);
    }

    #[test]
    fn untagged_only_result_stops_the_run() {
        let producer = canned(&[("a", json!([{"type": "vmess"}, {"tag": ""}]))]);
        let err = fetch_all(&subs(&["a", "b"]), &producer).unwrap_err();
        match err {
            ReconcileError::EmptyProducerResult { origin } => assert_eq!(origin.name, "a"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*producer.calls.borrow(), vec!["a"]);
    }

    #[test]
    fn producer_failure_stops_the_run() {
        let producer = canned(&[("b", json!([{"tag": "B1"}]))]);
        let err = fetch_all(&SourceSelection::Collection("missing".into()), &producer).unwrap_err();
        assert!(matches!(err, ReconcileError::Producer { .. }));
        assert!(err.to_string().contains(r#"collection "missing""#));
    }
}
