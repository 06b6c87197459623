//! Policy file (policy.json): scaffold tags, probe parameters, region
//! patterns, the business allow-list table and fallback sources.
//!
//! JSON shape:
//! {
//!   "tags": {
//!     "direct": "🔄 直连入口",          // mandatory in every business group
//!     "default": "🐋 默认节点",         // mandatory in every business group
//!     "manual": "⚙️ 手动切换",          // selector over all leaves
//!     "auto": "🎚️ 自动选择",            // urltest over all leaves
//!     "extra_anti_flatten": ["🚀 节点选择"]
//!   },
//!   "probe": { "url": "https://www.gstatic.com/generate_204", "interval": "3m" },
//!   "regions": [ { "tag": "🇭🇰 香港节点", "pattern": "香港|HK", "case_insensitive": true } ],
//!   "business": [ { "tag": "📺 哔哩哔哩", "regions": ["🇭🇰 香港节点"] } ],
//!   "sources": { "collection": "", "subscriptions": [] }
//! }
//!
//! Every section is optional; a missing section falls back to the built-in
//! policy's section as a whole.

use crate::policy::region::RegionBucket;
use crate::policy::{BusinessRule, FallbackSources, Policy, ProbeParams, ScaffoldTags};

use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyFile {
    #[serde(default)]
    pub tags: Option<RawTags>,

    #[serde(default)]
    pub probe: Option<RawProbe>,

    #[serde(default)]
    pub regions: Option<Vec<RawRegion>>,

    #[serde(default)]
    pub business: Option<Vec<RawBusinessGroup>>,

    #[serde(default)]
    pub sources: Option<RawSources>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTags {
    pub direct: String,
    pub default: String,
    pub manual: String,
    pub auto: String,

    /// Other all-node selectors to keep out of business groups.
    #[serde(default)]
    pub extra_anti_flatten: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProbe {
    pub url: String,
    pub interval: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRegion {
    pub tag: String,
    pub pattern: String,

    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBusinessGroup {
    pub tag: String,

    /// Region selector tags this group may keep, in output order.
    #[serde(default)]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSources {
    #[serde(default)]
    pub collection: String,

    #[serde(default)]
    pub subscriptions: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl PolicyFile {
    /// Fill every section this file leaves out from `base`.
    pub fn overlay(self, base: PolicyFile) -> PolicyFile {
        PolicyFile {
            tags: self.tags.or(base.tags),
            probe: self.probe.or(base.probe),
            regions: self.regions.or(base.regions),
            business: self.business.or(base.business),
            sources: self.sources.or(base.sources),
        }
    }

    /// Validate and build a Policy:
    /// - scaffold tags are non-empty and distinct
    /// - region patterns compile, region tags are unique and don't shadow scaffold tags
    /// - business tags are unique and don't shadow scaffold or region tags
    /// - allow-lists never name an all-node selector
    pub fn validate_and_build(&self) -> anyhow::Result<Policy> {
        use anyhow::{anyhow, bail};

        // 1) Scaffold tags.
        let raw_tags = self
            .tags
            .as_ref()
            .ok_or_else(|| anyhow!("policy has no tags section"))?;
        let tags = ScaffoldTags {
            direct: raw_tags.direct.trim().to_string(),
            default: raw_tags.default.trim().to_string(),
            manual: raw_tags.manual.trim().to_string(),
            auto: raw_tags.auto.trim().to_string(),
        };
        let scaffold = [
            ("direct", &tags.direct),
            ("default", &tags.default),
            ("manual", &tags.manual),
            ("auto", &tags.auto),
        ];
        let mut scaffold_seen = HashSet::new();
        for (role, tag) in scaffold {
            if tag.is_empty() {
                bail!("policy tags.{} must not be empty", role);
            }
            if !scaffold_seen.insert(tag.as_str()) {
                bail!("policy tags.{} reuses tag {:?}", role, tag);
            }
        }

        let mut anti_flatten = BTreeSet::from([tags.manual.clone(), tags.auto.clone()]);
        for extra in &raw_tags.extra_anti_flatten {
            let extra = extra.trim();
            if extra.is_empty() {
                continue;
            }
            if extra == tags.direct || extra == tags.default {
                bail!("mandatory tag {:?} cannot be listed in extra_anti_flatten", extra);
            }
            anti_flatten.insert(extra.to_string());
        }

        // 2) Probe parameters.
        let probe = self
            .probe
            .as_ref()
            .map(|p| ProbeParams {
                url: p.url.clone(),
                interval: p.interval.clone(),
            })
            .ok_or_else(|| anyhow!("policy has no probe section"))?;

        // 3) Regions.
        let mut regions = Vec::new();
        let mut region_tags = HashSet::new();
        for raw in self.regions.as_deref().unwrap_or_default() {
            let tag = raw.tag.trim();
            if tag.is_empty() {
                bail!("region with pattern {:?} has an empty tag", raw.pattern);
            }
            if scaffold_seen.contains(tag) || anti_flatten.contains(tag) {
                bail!("region tag {:?} collides with a scaffold tag", tag);
            }
            if !region_tags.insert(tag.to_string()) {
                bail!("duplicate region tag in policy: {}", tag);
            }
            regions.push(RegionBucket::new(tag, &raw.pattern, raw.case_insensitive)?);
        }

        // 4) Business groups.
        let mut business = Vec::new();
        let mut business_tags = HashSet::new();
        for raw in self.business.as_deref().unwrap_or_default() {
            let tag = raw.tag.as_str();
            if tag.trim().is_empty() {
                bail!("business group with an empty tag");
            }
            if scaffold_seen.contains(tag) || anti_flatten.contains(tag) {
                bail!("business group {:?} collides with a scaffold tag", tag);
            }
            if region_tags.contains(tag) {
                bail!("business group {:?} collides with a region tag", tag);
            }
            if !business_tags.insert(tag.to_string()) {
                bail!("duplicate business group in policy: {}", tag);
            }
            let mut allowed_regions: Vec<String> = Vec::new();
            for region in &raw.regions {
                if anti_flatten.contains(region) {
                    bail!(
                        "business group {} allows all-node selector {}",
                        tag,
                        region
                    );
                }
                if !region_tags.contains(region) {
                    tracing::warn!(
                        group = %tag,
                        region = %region,
                        "business group allows a tag that is not a configured region"
                    );
                }
                if !allowed_regions.contains(region) {
                    allowed_regions.push(region.clone());
                }
            }
            business.push(BusinessRule {
                tag: tag.to_string(),
                allowed_regions,
            });
        }

        // 5) Fallback sources.
        let sources = self.sources.clone().unwrap_or_default();
        let fallback_sources = FallbackSources {
            collection: sources.collection.trim().to_string(),
            subscriptions: sources
                .subscriptions
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        Ok(Policy {
            tags,
            probe,
            regions,
            business,
            anti_flatten,
            fallback_sources,
        })
    }
}
