//! Invariant enforcer: the last pass before serialization.
//!
//! After it runs, tags are unique and every selector/urltest has at least
//! one member, none of them empty, duplicated, dangling or self-referencing.
//! Running it twice changes nothing.

use crate::outbound::RoutingConfiguration;
use crate::policy::Policy;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealReport {
    pub dropped_malformed: usize,
    pub dropped_duplicates: usize,
    pub removed_members: usize,
    pub refilled: usize,
}

pub fn enforce_invariants(config: &mut RoutingConfiguration, policy: &Policy) -> HealReport {
    let dropped = config.retain_well_formed();
    let mut report = HealReport {
        dropped_malformed: dropped.malformed,
        dropped_duplicates: dropped.duplicates,
        ..HealReport::default()
    };
    if dropped.malformed > 0 || dropped.duplicates > 0 {
        tracing::warn!(
            malformed = dropped.malformed,
            duplicates = dropped.duplicates,
            "dropped malformed outbounds"
        );
    }

    let known = config.tags();
    for node in config.nodes_mut() {
        let tag = node.tag.clone();
        let Some(members) = node.members_mut() else {
            continue;
        };

        let before = members.len();
        let mut seen = std::collections::HashSet::new();
        members.retain(|m| {
            !m.is_empty() && *m != tag && known.contains(m) && seen.insert(m.clone())
        });
        report.removed_members += before - members.len();

        if members.is_empty() {
            members.extend(
                policy
                    .fallback_pair()
                    .iter()
                    .filter(|t| **t != tag && known.contains(**t))
                    .map(|t| t.to_string()),
            );
            report.refilled += 1;
            tracing::warn!(tag = %tag, members = ?members, "aggregator was empty; filled with fallback");
        }
    }
    tracing::debug!(?report, "enforced invariants");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::scaffold::ensure_scaffold;
    use crate::reconcile::test_policy;
    use pretty_assertions::assert_eq;

    fn members(config: &RoutingConfiguration, tag: &str) -> Vec<String> {
        config.get(tag).unwrap().members().unwrap().to_vec()
    }

    fn healed(text: &str) -> (RoutingConfiguration, HealReport) {
        let policy = test_policy();
        let mut config = RoutingConfiguration::from_json(text).unwrap();
        ensure_scaffold(&mut config, &policy);
        let report = enforce_invariants(&mut config, &policy);
        (config, report)
    }

    #[test]
    fn drops_untagged_and_duplicate_nodes() {
        let (config, report) = healed(
            r#"{"outbounds": [
                {"type": "vmess"},
                {"tag": "", "type": "selector"},
                {"tag": "a", "type": "trojan"},
                {"tag": "a", "type": "vless"}
            ]}"#,
        );
        assert_eq!(report.dropped_malformed, 2);
        assert_eq!(report.dropped_duplicates, 1);
        assert_eq!(config.get("a").unwrap().type_name(), "trojan");
    }

    #[test]
    fn filters_bad_members() {
        let (config, report) = healed(
            r#"{"outbounds": [
                {"tag": "a", "type": "trojan"},
                {"tag": "grp", "type": "selector", "outbounds": ["", "a", "gone", "grp", "a"]}
            ]}"#,
        );
        assert_eq!(members(&config, "grp"), vec!["a"]);
        assert_eq!(report.removed_members, 4);
    }

    #[test]
    fn endpoint_members_are_kept() {
        let (config, report) = healed(
            r#"{"endpoints": [{"type": "wireguard", "tag": "wg-home"}],
                "outbounds": [
                {"tag": "HK-1", "type": "trojan"},
                {"tag": "🏠 home", "type": "selector", "outbounds": ["wg-home", "HK-1"]}
            ]}"#,
        );
        assert_eq!(members(&config, "🏠 home"), vec!["wg-home", "HK-1"]);
        assert_eq!(report.removed_members, 0);
    }

    #[test]
    fn empty_aggregators_get_the_fallback_pair() {
        let (config, _) = healed(
            r#"{"outbounds": [
                {"tag": "grp", "type": "urltest", "outbounds": ["", "gone"]},
                {"tag": "🐋 default", "type": "selector", "outbounds": []}
            ]}"#,
        );
        assert_eq!(members(&config, "grp"), vec!["🐋 default", "🔄 direct"]);
        // Never points at itself.
        assert_eq!(members(&config, "🐋 default"), vec!["🔄 direct"]);
        // Synthesized-but-unfilled scaffold selectors are healed too.
        assert_eq!(members(&config, "⚙️ manual"), vec!["🐋 default", "🔄 direct"]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let policy = test_policy();
        let (mut config, _) = healed(
            r#"{"outbounds": [{"type": "x"}, {"tag": "grp", "type": "selector", "outbounds": ["nope"]}]}"#,
        );
        let first = config.to_json_pretty().unwrap();
        let report = enforce_invariants(&mut config, &policy);
        assert_eq!(report, HealReport::default());
        assert_eq!(config.to_json_pretty().unwrap(), first);
    }
}
