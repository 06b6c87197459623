//! Region buckets: a selector tag plus the pattern that claims node tags.

use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
pub struct RegionBucket {
    pub tag: String,
    pub pattern: Regex,
}

impl RegionBucket {
    pub fn new(tag: impl Into<String>, pattern: &str, case_insensitive: bool) -> anyhow::Result<Self> {
        let tag: String = tag.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| anyhow::anyhow!("region {}: bad pattern: {}", tag, e))?;
        Ok(Self { tag, pattern })
    }

    pub fn matches(&self, node_tag: &str) -> bool {
        self.pattern.is_match(node_tag)
    }

    /// Node tags claimed by this bucket, in input order.
    pub fn select<'a>(&self, node_tags: &'a [String]) -> Vec<&'a str> {
        node_tags
            .iter()
            .map(String::as_str)
            .filter(|t| self.matches(t))
            .collect()
    }
}
