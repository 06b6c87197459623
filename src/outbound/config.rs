//! The routing configuration document: every top-level field kept in order,
//! plus the `outbounds` array held as an ordered node list with a tag index.
//!
//! The index always maps a tag to the position of its first occurrence.
//! Entries of the top-level `endpoints` array are kept verbatim, but their
//! tags count as valid aggregator members.

use crate::error::ReconcileError;
use crate::outbound::node::{OutboundNode, tag_of};

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
pub enum Entry {
    Node(OutboundNode),
    /// A baseline entry without a usable tag, carried until the invariant pass.
    Malformed(Value),
}

#[derive(Debug, Clone)]
pub struct RoutingConfiguration {
    document: Map<String, Value>,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

/// What `retain_well_formed` removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dropped {
    pub malformed: usize,
    pub duplicates: usize,
}

impl RoutingConfiguration {
    /// Parse a baseline document. A missing or non-array `outbounds` is
    /// treated as empty.
    pub fn from_json(text: &str) -> Result<Self, ReconcileError> {
        if text.trim().is_empty() {
            return Err(ReconcileError::MissingBaseline);
        }
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ReconcileError::InvalidBaselineJson(e.to_string()))?;
        let mut document = match value {
            Value::Object(map) => map,
            other => {
                return Err(ReconcileError::InvalidBaselineJson(format!(
                    "expected an object at the top level, found {}",
                    json_kind(&other)
                )));
            }
        };

        // `take` leaves a placeholder so the key keeps its position.
        let raw = document.get_mut("outbounds").map(Value::take);
        let items = match raw {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };

        let mut config = Self {
            document,
            entries: Vec::with_capacity(items.len()),
            index: HashMap::new(),
        };
        for item in items {
            match OutboundNode::from_value(item) {
                Ok(node) => {
                    let pos = config.entries.len();
                    config.index.entry(node.tag.clone()).or_insert(pos);
                    config.entries.push(Entry::Node(node));
                }
                Err(raw) => config.entries.push(Entry::Malformed(raw)),
            }
        }
        Ok(config)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn get(&self, tag: &str) -> Option<&OutboundNode> {
        match self.entries.get(*self.index.get(tag)?)? {
            Entry::Node(node) => Some(node),
            Entry::Malformed(_) => None,
        }
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut OutboundNode> {
        let pos = *self.index.get(tag)?;
        match self.entries.get_mut(pos)? {
            Entry::Node(node) => Some(node),
            Entry::Malformed(_) => None,
        }
    }

    /// Append a node unless its tag is already taken. The existing node
    /// always wins.
    pub fn push(&mut self, node: OutboundNode) -> bool {
        if self.index.contains_key(&node.tag) {
            return false;
        }
        self.index.insert(node.tag.clone(), self.entries.len());
        self.entries.push(Entry::Node(node));
        true
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut OutboundNode> {
        self.entries.iter_mut().filter_map(|e| match e {
            Entry::Node(node) => Some(node),
            Entry::Malformed(_) => None,
        })
    }

    /// Every tag a member may name: outbound tags plus `endpoints` tags.
    pub fn tags(&self) -> HashSet<String> {
        let mut tags: HashSet<String> = self.index.keys().cloned().collect();
        tags.extend(self.endpoint_tags().map(str::to_string));
        tags
    }

    fn endpoint_tags(&self) -> impl Iterator<Item = &str> {
        self.document
            .get("endpoints")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(tag_of)
    }

    /// Drop untagged entries and any node repeating an earlier tag, then
    /// rebuild the index.
    pub fn retain_well_formed(&mut self) -> Dropped {
        let mut dropped = Dropped::default();
        let mut seen = HashSet::new();
        self.entries.retain(|e| match e {
            Entry::Malformed(_) => {
                dropped.malformed += 1;
                false
            }
            Entry::Node(node) => {
                let first = seen.insert(node.tag.clone());
                if !first {
                    dropped.duplicates += 1;
                }
                first
            }
        });
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(pos, e)| match e {
                Entry::Node(node) => Some((node.tag.clone(), pos)),
                Entry::Malformed(_) => None,
            })
            .collect();
        dropped
    }

    pub fn to_value(&self) -> Value {
        let outbounds = self
            .entries
            .iter()
            .map(|e| match e {
                Entry::Node(node) => node.to_value(),
                Entry::Malformed(raw) => raw.clone(),
            })
            .collect();
        let mut document = self.document.clone();
        document.insert("outbounds".to_string(), Value::Array(outbounds));
        Value::Object(document)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
