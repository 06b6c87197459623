//! Terminal failures of a reconciliation run.
//!
//! Every variant aborts the run; nothing is retried and no partial document
//! is ever written.

use crate::source::{ProducerError, SourceRef};

#[derive(thiserror::Error, Debug)]
pub enum ReconcileError {
    #[error("no baseline document supplied: select a template JSON file")]
    MissingBaseline,

    #[error("baseline document is not valid JSON: {0}")]
    InvalidBaselineJson(String),

    #[error(
        "no collection or subscription configured: pass --coll or --names, or set sources in the policy file"
    )]
    NoSourceConfigured,

    #[error("{origin} produced no nodes")]
    EmptyProducerResult { origin: SourceRef },

    #[error("{origin} could not be produced: {source}")]
    Producer {
        origin: SourceRef,
        #[source]
        source: ProducerError,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[source] serde_json::Error),
}
