//! Reconciliation pipeline.
//!
//! ingest -> scaffold -> merge -> region -> business -> heal
//!
//! `reconcile` is the pure part over an already-loaded configuration;
//! `run` adds baseline parsing, source resolution, fetching and output.

pub mod business;
pub mod heal;
pub mod ingest;
pub mod merge;
pub mod region;
pub mod scaffold;

pub use heal::HealReport;
pub use ingest::{IngestedNodes, ingest};

use crate::error::ReconcileError;
use crate::outbound::RoutingConfiguration;
use crate::policy::Policy;
use crate::source::{NodeProducer, SourceSelection, fetch_all};

/// Counters from one pass, for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub scaffolded: usize,
    pub appended: usize,
    pub regions_filled: usize,
    pub regions_coerced: usize,
    pub business_rewritten: usize,
    pub heal: HealReport,
}

/// Command-line inputs of a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunInput<'a> {
    pub baseline: &'a str,
    pub coll: Option<&'a str>,
    pub names: Option<&'a str>,
}

/// Apply every pass to `config` in place.
pub fn reconcile(
    config: &mut RoutingConfiguration,
    ingested: &IngestedNodes,
    policy: &Policy,
) -> Summary {
    let scaffolded = scaffold::ensure_scaffold(config, policy).len();
    let appended = merge::merge_leaves(config, ingested, policy);
    let outcomes = region::classify(config, ingested, policy);
    let regions_filled = outcomes.iter().filter(|o| o.matched > 0).count();
    let regions_coerced = outcomes.iter().filter(|o| o.coerced).count();
    let business_rewritten = business::prune_business_groups(config, policy).len();
    let heal = heal::enforce_invariants(config, policy);

    Summary {
        scaffolded,
        appended,
        regions_filled,
        regions_coerced,
        business_rewritten,
        heal,
    }
}

/// One full run: returns the pretty-printed configuration, or the reason
/// nothing was produced.
pub fn run(
    input: RunInput<'_>,
    producer: &dyn NodeProducer,
    policy: &Policy,
) -> Result<String, ReconcileError> {
    let mut config = RoutingConfiguration::from_json(input.baseline)?;
    let selection = SourceSelection::resolve(input.coll, input.names, &policy.fallback_sources)?;
    tracing::info!(?selection, baseline_outbounds = config.len(), "starting reconciliation");

    let batches = fetch_all(&selection, producer)?;
    let ingested = ingest(batches);
    let summary = reconcile(&mut config, &ingested, policy);
    tracing::info!(?summary, outbounds = config.len(), "reconciliation finished");

    config.to_json_pretty().map_err(ReconcileError::Serialize)
}

#[cfg(test)]
pub(crate) fn test_policy() -> Policy {
    let file: crate::policy::PolicyFile = serde_json::from_str(
        r#"{
            "tags": {
                "direct": "🔄 direct",
                "default": "🐋 default",
                "manual": "⚙️ manual",
                "auto": "🎚️ auto",
                "extra_anti_flatten": ["🚀 node-select"]
            },
            "probe": {"url": "https://www.gstatic.com/generate_204", "interval": "3m"},
            "regions": [
                {"tag": "🇭🇰 HK-region", "pattern": "香港|HK|Hong\\s*Kong"},
                {"tag": "🇯🇵 JP-region", "pattern": "日本|JP|Japan"},
                {"tag": "🇺🇸 US-region", "pattern": "美国|US|United\\s*States"}
            ],
            "business": [
                {"tag": "📺 video", "regions": ["🇭🇰 HK-region"]},
                {"tag": "🤖 ai", "regions": ["🇺🇸 US-region", "🇯🇵 JP-region"]},
                {"tag": "🎮 games", "regions": ["🇯🇵 JP-region"]}
            ]
        }"#,
    )
    .unwrap();
    file.validate_and_build().unwrap()
}
