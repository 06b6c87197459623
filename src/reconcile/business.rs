//! Business policy pruner.
//!
//! Each business-routing selector is rewritten to:
//!   [direct, default, <allowed regions it already referenced, in allow-list order>]
//! All-node selectors are always stripped; anything outside the mandatory
//! pair and the group's allow-list is dropped.

use crate::outbound::{NodeKind, RoutingConfiguration};
use crate::policy::{BusinessRule, Policy};

use std::collections::HashSet;

/// Returns the tags of the business groups that were rewritten.
pub fn prune_business_groups(config: &mut RoutingConfiguration, policy: &Policy) -> Vec<String> {
    let mut rewritten = Vec::new();
    for rule in &policy.business {
        let Some(node) = config.get_mut(&rule.tag) else {
            tracing::debug!(group = %rule.tag, "business group not in configuration");
            continue;
        };
        let NodeKind::Selector { members } = &mut node.kind else {
            tracing::debug!(group = %rule.tag, "business group is not a selector; leaving it alone");
            continue;
        };

        let next = scoped_members(members, rule, policy);
        if *members != next {
            tracing::debug!(group = %rule.tag, before = ?members, after = ?next, "pruned business group");
        }
        *members = next;
        rewritten.push(rule.tag.clone());
    }
    tracing::info!(groups = rewritten.len(), "applied business region policy");
    rewritten
}

fn scoped_members(current: &[String], rule: &BusinessRule, policy: &Policy) -> Vec<String> {
    // 1) + 2) strip all-node selectors, keep only mandatory and allowed tags.
    let survivors: HashSet<&str> = current
        .iter()
        .map(String::as_str)
        .filter(|m| !policy.is_anti_flatten(m))
        .filter(|m| policy.is_mandatory(m) || rule.allowed_regions.iter().any(|r| r.as_str() == *m))
        .collect();

    // 3) mandatory pair first, then survivors in allow-list order.
    let mut next: Vec<String> = policy.mandatory().iter().map(|t| t.to_string()).collect();
    for region in &rule.allowed_regions {
        if survivors.contains(region.as_str()) && !next.contains(region) {
            next.push(region.clone());
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::test_policy;
    use pretty_assertions::assert_eq;

    fn members(config: &RoutingConfiguration, tag: &str) -> Vec<String> {
        config.get(tag).unwrap().members().unwrap().to_vec()
    }

    #[test]
    fn strips_anti_flatten_and_injects_mandatory() {
        let policy = test_policy();
        let mut config = RoutingConfiguration::from_json(
            r#"{"outbounds": [{"tag": "📺 video", "type": "selector",
                "outbounds": ["⚙️ manual", "🚀 node-select", "🇭🇰 HK-region"]}]}"#,
        )
        .unwrap();
        let rewritten = prune_business_groups(&mut config, &policy);
        assert_eq!(rewritten, vec!["📺 video"]);
        assert_eq!(
            members(&config, "📺 video"),
            vec!["🔄 direct", "🐋 default", "🇭🇰 HK-region"]
        );
    }

    #[test]
    fn orders_regions_by_allow_list_and_drops_the_rest() {
        let policy = test_policy();
        let mut config = RoutingConfiguration::from_json(
            r#"{"outbounds": [{"tag": "🤖 ai", "type": "selector",
                "outbounds": ["🇭🇰 HK-region", "🇯🇵 JP-region", "🐋 default", "US-1",
                              "🇺🇸 US-region", "🎚️ auto", "🔄 direct"]}]}"#,
        )
        .unwrap();
        prune_business_groups(&mut config, &policy);
        assert_eq!(
            members(&config, "🤖 ai"),
            vec!["🔄 direct", "🐋 default", "🇺🇸 US-region", "🇯🇵 JP-region"]
        );
    }

    #[test]
    fn allowed_region_not_referenced_is_not_added() {
        let policy = test_policy();
        let mut config = RoutingConfiguration::from_json(
            r#"{"outbounds": [{"tag": "🤖 ai", "type": "selector", "outbounds": []}]}"#,
        )
        .unwrap();
        prune_business_groups(&mut config, &policy);
        assert_eq!(members(&config, "🤖 ai"), vec!["🔄 direct", "🐋 default"]);
    }

    #[test]
    fn missing_or_wrong_typed_groups_are_no_ops() {
        let policy = test_policy();
        let mut config = RoutingConfiguration::from_json(
            r#"{"outbounds": [{"tag": "📺 video", "type": "urltest", "outbounds": ["⚙️ manual"]}]}"#,
        )
        .unwrap();
        let rewritten = prune_business_groups(&mut config, &policy);
        assert!(rewritten.is_empty());
        assert_eq!(members(&config, "📺 video"), vec!["⚙️ manual"]);
    }
}
