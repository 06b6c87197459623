//! A single entry of the `outbounds` array.
//!
//! JSON shape (sing-box):
//! {
//!   "tag": "🇭🇰 香港节点",     // primary key within a configuration
//!   "type": "selector",       // direct | selector | urltest | <proxy protocol>
//!   "outbounds": ["HK-1"],    // aggregators only: member tags
//!   "url": "...",             // urltest only
//!   "interval": "3m",         // urltest only
//!   ...                       // anything else is kept verbatim
//! }
//!
//! Aggregator member lists are only reachable through the `Selector` and
//! `Probe` variants of `NodeKind`. Leaves are written back verbatim; the
//! other kinds are written with the fields above first.

use serde_json::{Map, Value};

pub const TYPE_DIRECT: &str = "direct";
pub const TYPE_SELECTOR: &str = "selector";
pub const TYPE_URLTEST: &str = "urltest";

/// Fields a selector cannot carry once a urltest is turned into one.
const PROBE_ONLY_FIELDS: &[&str] = &["tolerance", "idle_timeout"];

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Concrete proxy endpoint. Its `type` stays in `extra` untouched.
    Leaf,
    Direct,
    Selector {
        members: Vec<String>,
    },
    Probe {
        members: Vec<String>,
        url: Option<Value>,
        interval: Option<Value>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundNode {
    pub tag: String,
    pub kind: NodeKind,
    /// Remaining fields, in document order. A leaf keeps its `tag` here as
    /// well, so it is written back exactly as it was read.
    pub extra: Map<String, Value>,
}

impl OutboundNode {
    pub fn direct(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: NodeKind::Direct,
            extra: Map::new(),
        }
    }

    pub fn selector(tag: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            kind: NodeKind::Selector { members },
            extra: Map::new(),
        }
    }

    pub fn probe(
        tag: impl Into<String>,
        members: Vec<String>,
        url: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            kind: NodeKind::Probe {
                members,
                url: Some(Value::String(url.into())),
                interval: Some(Value::String(interval.into())),
            },
            extra: Map::new(),
        }
    }

    /// Interpret a baseline entry. Entries without a usable tag are handed
    /// back unchanged.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        let Some(tag) = tag_of(&value).map(str::to_string) else {
            return Err(value);
        };
        let mut extra = match value {
            Value::Object(map) => map,
            other => return Err(other),
        };

        let type_name = extra
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let kind = match type_name.as_str() {
            TYPE_DIRECT => {
                extra.shift_remove("type");
                NodeKind::Direct
            }
            TYPE_SELECTOR => {
                extra.shift_remove("type");
                NodeKind::Selector {
                    members: take_members(&mut extra),
                }
            }
            TYPE_URLTEST => {
                extra.shift_remove("type");
                NodeKind::Probe {
                    members: take_members(&mut extra),
                    url: extra.shift_remove("url"),
                    interval: extra.shift_remove("interval"),
                }
            }
            _ => NodeKind::Leaf,
        };
        if kind != NodeKind::Leaf {
            extra.shift_remove("tag");
        }

        Ok(Self { tag, kind, extra })
    }

    /// Interpret a producer descriptor as an opaque leaf.
    pub fn leaf_from_value(value: Value) -> Option<Self> {
        let tag = tag_of(&value)?.to_string();
        let Value::Object(extra) = value else {
            return None;
        };
        Some(Self {
            tag,
            kind: NodeKind::Leaf,
            extra,
        })
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            NodeKind::Leaf => self
                .extra
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
            NodeKind::Direct => TYPE_DIRECT,
            NodeKind::Selector { .. } => TYPE_SELECTOR,
            NodeKind::Probe { .. } => TYPE_URLTEST,
        }
    }

    pub fn is_selector(&self) -> bool {
        matches!(self.kind, NodeKind::Selector { .. })
    }

    pub fn is_probe(&self) -> bool {
        matches!(self.kind, NodeKind::Probe { .. })
    }

    pub fn members(&self) -> Option<&[String]> {
        match &self.kind {
            NodeKind::Selector { members } | NodeKind::Probe { members, .. } => Some(members),
            NodeKind::Leaf | NodeKind::Direct => None,
        }
    }

    pub fn members_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.kind {
            NodeKind::Selector { members } | NodeKind::Probe { members, .. } => Some(members),
            NodeKind::Leaf | NodeKind::Direct => None,
        }
    }

    /// Turn a urltest aggregator into a selector over the same members.
    /// Returns false when the node is not a urltest.
    pub fn coerce_to_selector(&mut self) -> bool {
        let NodeKind::Probe { members, .. } = &mut self.kind else {
            return false;
        };
        let members = std::mem::take(members);
        self.kind = NodeKind::Selector { members };
        for field in PROBE_ONLY_FIELDS {
            self.extra.shift_remove(*field);
        }
        true
    }

    pub fn to_value(&self) -> Value {
        if self.kind == NodeKind::Leaf {
            return Value::Object(self.extra.clone());
        }
        let mut out = Map::new();
        out.insert("tag".to_string(), Value::String(self.tag.clone()));
        match &self.kind {
            NodeKind::Leaf => {}
            NodeKind::Direct => {
                out.insert("type".to_string(), TYPE_DIRECT.into());
            }
            NodeKind::Selector { members } => {
                out.insert("type".to_string(), TYPE_SELECTOR.into());
                out.insert("outbounds".to_string(), members_value(members));
            }
            NodeKind::Probe {
                members,
                url,
                interval,
            } => {
                out.insert("type".to_string(), TYPE_URLTEST.into());
                out.insert("outbounds".to_string(), members_value(members));
                if let Some(url) = url {
                    out.insert("url".to_string(), url.clone());
                }
                if let Some(interval) = interval {
                    out.insert("interval".to_string(), interval.clone());
                }
            }
        }
        for (key, value) in &self.extra {
            out.insert(key.clone(), value.clone());
        }
        Value::Object(out)
    }
}

/// The tag of a raw entry, if it has a non-empty string one.
pub fn tag_of(value: &Value) -> Option<&str> {
    value
        .get("tag")
        .and_then(Value::as_str)
        .filter(|tag| !tag.is_empty())
}

/// Pull `outbounds` out of an aggregator object. Non-string entries are
/// dropped here; empty strings survive until the invariant pass.
fn take_members(extra: &mut Map<String, Value>) -> Vec<String> {
    match extra.shift_remove("outbounds") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn members_value(members: &[String]) -> Value {
    Value::Array(members.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_aggregator_kinds() {
        let sel = OutboundNode::from_value(json!({
            "type": "selector", "tag": "sel", "outbounds": ["a", 3, "", "b"], "default": "a"
        }))
        .unwrap();
        assert_eq!(
            sel.kind,
            NodeKind::Selector {
                members: vec!["a".into(), "".into(), "b".into()]
            }
        );
        assert_eq!(sel.extra.get("default"), Some(&json!("a")));

        let probe = OutboundNode::from_value(json!({
            "type": "urltest", "tag": "auto", "url": "http://x", "interval": "1m"
        }))
        .unwrap();
        assert!(probe.is_probe());
        assert_eq!(probe.members(), Some(&[][..]));

        let direct = OutboundNode::from_value(json!({"type": "direct", "tag": "d"})).unwrap();
        assert_eq!(direct.kind, NodeKind::Direct);
        assert_eq!(direct.members(), None);
    }

    #[test]
    fn unknown_types_are_opaque_leaves() {
        let raw = json!({"type": "vmess", "tag": "HK-1", "server": "1.2.3.4", "server_port": 443});
        let node = OutboundNode::from_value(raw.clone()).unwrap();
        assert_eq!(node.kind, NodeKind::Leaf);
        assert_eq!(node.type_name(), "vmess");
        assert_eq!(node.to_value(), raw);
    }

    #[test]
    fn leaves_keep_their_key_order() {
        let text = r#"{"type":"trojan","server":"hk.example","tag":"HK-1","server_port":443}"#;
        let node = OutboundNode::from_value(serde_json::from_str(text).unwrap()).unwrap();
        assert_eq!(serde_json::to_string(&node.to_value()).unwrap(), text);

        let fresh = OutboundNode::leaf_from_value(serde_json::from_str(text).unwrap()).unwrap();
        assert_eq!(fresh.tag, "HK-1");
        assert_eq!(serde_json::to_string(&fresh.to_value()).unwrap(), text);
    }

    #[test]
    fn untagged_entries_are_rejected() {
        assert!(OutboundNode::from_value(json!({"type": "direct"})).is_err());
        assert!(OutboundNode::from_value(json!({"type": "direct", "tag": ""})).is_err());
        assert!(OutboundNode::from_value(json!("direct")).is_err());
        assert!(OutboundNode::leaf_from_value(json!({"tag": 7})).is_none());
    }

    #[test]
    fn serializes_tag_and_type_first() {
        let node = OutboundNode::from_value(json!({
            "interrupt_exist_connections": true,
            "outbounds": ["a"],
            "type": "selector",
            "tag": "sel"
        }))
        .unwrap();
        let text = serde_json::to_string(&node.to_value()).unwrap();
        assert_eq!(
            text,
            r#"{"tag":"sel","type":"selector","outbounds":["a"],"interrupt_exist_connections":true}"#
        );
    }

    #[test]
    fn coercion_drops_probe_fields() {
        let mut node = OutboundNode::from_value(json!({
            "type": "urltest", "tag": "hk", "outbounds": ["HK-1"],
            "url": "http://x", "interval": "3m", "tolerance": 50, "idle_timeout": "30m",
            "interrupt_exist_connections": false
        }))
        .unwrap();
        assert!(node.coerce_to_selector());
        assert_eq!(
            node.to_value(),
            json!({"tag": "hk", "type": "selector", "outbounds": ["HK-1"],
                   "interrupt_exist_connections": false})
        );
        assert!(!node.coerce_to_selector());
    }
}
