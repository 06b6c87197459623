//! Which collection or subscriptions to produce nodes from.

use crate::error::ReconcileError;
use crate::policy::FallbackSources;

use serde::Serialize;
use std::fmt;

pub const PLATFORM: &str = "sing-box";
pub const PRODUCE_MODE: &str = "internal";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Collection,
    Subscription,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Collection => "collection",
            SourceKind::Subscription => "subscription",
        }
    }
}

/// A named source, used to attribute failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub name: String,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind.as_str(), self.name)
    }
}

/// One call to the node producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProduceRequest {
    pub kind: SourceKind,
    pub name: String,
    pub platform: &'static str,
    pub mode: &'static str,
}

impl ProduceRequest {
    pub fn new(kind: SourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            platform: PLATFORM,
            mode: PRODUCE_MODE,
        }
    }

    pub fn origin(&self) -> SourceRef {
        SourceRef {
            kind: self.kind,
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Collection(String),
    Subscriptions(Vec<String>),
}

impl SourceSelection {
    /// Resolve command-line values against the policy's fallback sources.
    ///
    /// A collection always wins over subscriptions. A given `coll` (even an
    /// empty one) replaces the fallback collection; `names` only replaces the
    /// fallback list when it names at least one subscription.
    pub fn resolve(
        coll: Option<&str>,
        names: Option<&str>,
        fallback: &FallbackSources,
    ) -> Result<Self, ReconcileError> {
        let collection = coll.unwrap_or(&fallback.collection).trim();
        if !collection.is_empty() {
            return Ok(SourceSelection::Collection(collection.to_string()));
        }

        let mut subscriptions = split_names(names.unwrap_or(""));
        if subscriptions.is_empty() {
            subscriptions = fallback
                .subscriptions
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if subscriptions.is_empty() {
            return Err(ReconcileError::NoSourceConfigured);
        }
        Ok(SourceSelection::Subscriptions(subscriptions))
    }

    /// Producer calls in the order they must be made.
    pub fn requests(&self) -> Vec<ProduceRequest> {
        match self {
            SourceSelection::Collection(name) => {
                vec![ProduceRequest::new(SourceKind::Collection, name.as_str())]
            }
            SourceSelection::Subscriptions(names) => names
                .iter()
                .map(|n| ProduceRequest::new(SourceKind::Subscription, n.as_str()))
                .collect(),
        }
    }
}

/// Split a comma-separated name list, trimming and dropping empty entries.
pub fn split_names(arg: &str) -> Vec<String> {
    arg.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
