//! Policy layer: the immutable configuration a reconciliation run is driven by.
//!
//! This module owns:
//! - the policy file schema and its validation (`file`)
//! - region buckets with compiled patterns (`region`)
//! - the built-in policy shipped with the binary

pub mod file;
pub mod region;

pub use file::PolicyFile;
pub use region::RegionBucket;

use crate::Result;

use anyhow::Context;
use std::collections::BTreeSet;
use std::fs;

const BUILTIN_POLICY: &str = include_str!("builtin.json");

/// Tags of the aggregators every configuration must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldTags {
    pub direct: String,
    pub default: String,
    pub manual: String,
    pub auto: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeParams {
    pub url: String,
    pub interval: String,
}

/// A business-routing selector and the region selectors it may keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessRule {
    pub tag: String,
    pub allowed_regions: Vec<String>,
}

/// Sources used when the command line names neither a collection nor
/// subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackSources {
    pub collection: String,
    pub subscriptions: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Policy {
    pub tags: ScaffoldTags,
    pub probe: ProbeParams,
    pub regions: Vec<RegionBucket>,
    pub business: Vec<BusinessRule>,
    /// Selectors spanning every leaf; never allowed inside a business group.
    pub anti_flatten: BTreeSet<String>,
    pub fallback_sources: FallbackSources,
}

impl Policy {
    pub fn builtin() -> Result<Self> {
        builtin_file()?.validate_and_build()
    }

    /// Tags every business group keeps, in output order.
    pub fn mandatory(&self) -> [&str; 2] {
        [self.tags.direct.as_str(), self.tags.default.as_str()]
    }

    pub fn is_mandatory(&self, tag: &str) -> bool {
        self.mandatory().contains(&tag)
    }

    pub fn is_anti_flatten(&self, tag: &str) -> bool {
        self.anti_flatten.contains(tag)
    }

    /// Fallback members for an aggregator that would otherwise be empty.
    pub fn fallback_pair(&self) -> [&str; 2] {
        [self.tags.default.as_str(), self.tags.direct.as_str()]
    }
}

fn builtin_file() -> Result<PolicyFile> {
    serde_json::from_str(BUILTIN_POLICY).context("parse built-in policy")
}

/// Load a policy file layered over the built-in policy, or the built-in
/// policy alone when no path is given.
pub fn load_policy(path: Option<&str>) -> Result<Policy> {
    let policy = match path {
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("read policy file {}", path))?;
            let user: PolicyFile =
                serde_json::from_str(&text).with_context(|| format!("parse policy file {}", path))?;
            user.overlay(builtin_file()?)
                .validate_and_build()
                .with_context(|| format!("invalid policy file {}", path))?
        }
        None => Policy::builtin()?,
    };
    tracing::debug!(
        regions = policy.regions.len(),
        business = policy.business.len(),
        "policy loaded"
    );
    Ok(policy)
}
