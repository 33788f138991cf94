// SPDX-License-Identifier: PMPL-1.0-or-later
//! Filter input: `topic.condition = value` triples as produced by the HTTP
//! layer.
//!
//! The HTTP layer URL-decodes the query string and resolves user-dependent
//! identifiers before handing pairs to [`FilterSet::from_query_pairs`] or a
//! JSON filter object to [`FilterSet::from_json`]. Keys that do not follow
//! the `topic.condition` grammar are dropped here, unrecognized topics and
//! conditions are dropped later by the dispatch table.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::ScopeError;

/// `topic.condition` with an optional trailing `[]`.
static KEY_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9]*)\.([A-Za-z]+)(\[\])?$").expect("key grammar is a valid regex")
});

/// The `topic.condition` half of a triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FilterKey {
    pub topic: String,
    pub condition: String,
}

impl FilterKey {
    pub fn new(topic: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            condition: condition.into(),
        }
    }

    /// Parse `topic.condition`, accepting a trailing `[]` on the condition.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = KEY_GRAMMAR.captures(raw.trim())?;
        Some(Self::new(&caps[1], &caps[2]))
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.topic, self.condition)
    }
}

/// A filter comparand: one string or a list of strings.
///
/// A list expresses set membership inside a single predicate; it is never
/// split into several triples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Many(Vec<String>),
}

impl FilterValue {
    /// Every entry of the value, in input order.
    pub fn entries(&self) -> Vec<&str> {
        match self {
            FilterValue::Single(s) => vec![s.as_str()],
            FilterValue::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FilterValue::Single(s) => s.is_empty(),
            FilterValue::Many(v) => v.is_empty(),
        }
    }

    fn push(&mut self, entry: String) {
        match self {
            FilterValue::Single(first) => {
                *self = FilterValue::Many(vec![std::mem::take(first), entry]);
            }
            FilterValue::Many(v) => v.push(entry),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Single(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Single(s)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(v: Vec<&str>) -> Self {
        FilterValue::Many(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(v: Vec<String>) -> Self {
        FilterValue::Many(v)
    }
}

fn scalar_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    /// Accepts a string, number or boolean, or an array of those; scalars are
    /// coerced to their string form so `[1, 4]` and `["1", "4"]` compile alike.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    scalar_to_string(item)
                        .ok_or_else(|| D::Error::custom("filter list entries must be scalars"))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FilterValue::Many),
            other => scalar_to_string(other)
                .map(FilterValue::Single)
                .ok_or_else(|| D::Error::custom("filter value must be a scalar or a list")),
        }
    }
}

/// One `(topic, condition, value)` filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTriple {
    pub topic: String,
    pub condition: String,
    pub value: FilterValue,
}

impl FilterTriple {
    pub fn new(
        topic: impl Into<String>,
        condition: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            topic: topic.into(),
            condition: condition.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> FilterKey {
        FilterKey::new(&self.topic, &self.condition)
    }
}

/// The filters of one request, keyed by `topic.condition`.
///
/// Inserting a key that is already present replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSet {
    entries: BTreeMap<FilterKey, FilterValue>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triples<I>(triples: I) -> Self
    where
        I: IntoIterator<Item = FilterTriple>,
    {
        let mut set = Self::new();
        for triple in triples {
            set.insert(triple);
        }
        set
    }

    /// Build from decoded query-string pairs; a key repeated in the query
    /// string accumulates into a list value.
    pub fn from_query_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entries: BTreeMap<FilterKey, FilterValue> = BTreeMap::new();
        for (raw_key, raw_value) in pairs {
            let Some(key) = FilterKey::parse(raw_key) else {
                debug!(key = raw_key, "Dropping malformed filter key");
                continue;
            };
            match entries.entry(key) {
                btree_map::Entry::Occupied(mut e) => e.get_mut().push(raw_value.to_string()),
                btree_map::Entry::Vacant(e) => {
                    // `region.in[]=1` always denotes a list, even with one entry.
                    let value = if raw_key.trim_end().ends_with("[]") {
                        FilterValue::Many(vec![raw_value.to_string()])
                    } else {
                        FilterValue::Single(raw_value.to_string())
                    };
                    e.insert(value);
                }
            }
        }
        Self { entries }
    }

    /// Build from a JSON object such as `{"region.in": [1, 4], "goalName.ctn": "_pig"}`.
    pub fn from_json(json: &str) -> Result<Self, ScopeError> {
        let raw: BTreeMap<String, FilterValue> = serde_json::from_str(json)?;
        let mut set = Self::new();
        for (raw_key, value) in raw {
            match FilterKey::parse(&raw_key) {
                Some(key) => {
                    set.entries.insert(key, value);
                }
                None => debug!(key = raw_key.as_str(), "Dropping malformed filter key"),
            }
        }
        Ok(set)
    }

    /// Insert a triple, returning the value it replaced.
    pub fn insert(&mut self, triple: FilterTriple) -> Option<FilterValue> {
        let key = triple.key();
        self.entries.insert(key, triple.value)
    }

    pub fn remove(&mut self, key: &FilterKey) -> Option<FilterValue> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &FilterKey) -> Option<&FilterValue> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FilterKey, &FilterValue)> {
        self.entries.iter()
    }

    pub fn triples(&self) -> Vec<FilterTriple> {
        self.entries
            .iter()
            .map(|(k, v)| FilterTriple::new(&k.topic, &k.condition, v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<FilterTriple> for FilterSet {
    fn from_iter<I: IntoIterator<Item = FilterTriple>>(iter: I) -> Self {
        Self::from_triples(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_parse() {
        let key = FilterKey::parse("goalName.ctn").unwrap();
        assert_eq!(key.topic, "goalName");
        assert_eq!(key.condition, "ctn");
        assert_eq!(key.to_string(), "goalName.ctn");
    }

    #[test]
    fn test_key_grammar_accepts_every_wire_topic() {
        for topic in crate::dispatch::Topic::ALL {
            for condition in crate::dispatch::Condition::ALL {
                let raw = format!("{}.{}", topic, condition);
                assert_eq!(
                    FilterKey::parse(&raw),
                    Some(FilterKey::new(topic.name(), condition.name())),
                    "{} did not parse",
                    raw
                );
            }
        }
    }

    #[test]
    fn test_key_parse_strips_array_suffix() {
        assert_eq!(
            FilterKey::parse("region.in[]").unwrap(),
            FilterKey::new("region", "in")
        );
    }

    #[test]
    fn test_key_parse_rejects_malformed() {
        assert!(FilterKey::parse("region").is_none());
        assert!(FilterKey::parse("region.in.extra").is_none());
        assert!(FilterKey::parse("re gion.in").is_none());
        assert!(FilterKey::parse("region.in; DROP TABLE").is_none());
        assert!(FilterKey::parse("").is_none());
    }

    #[test]
    fn test_later_triple_overwrites_earlier() {
        let set = FilterSet::from_triples(vec![
            FilterTriple::new("region", "in", vec!["1"]),
            FilterTriple::new("region", "in", vec!["4"]),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get(&FilterKey::new("region", "in")),
            Some(&FilterValue::Many(vec!["4".to_string()]))
        );
    }

    #[test]
    fn test_query_pairs_accumulate_repeated_keys() {
        let set = FilterSet::from_query_pairs(vec![
            ("region.in[]", "1"),
            ("goalName.ctn", "pig"),
            ("region.in[]", "4"),
            ("bogus", "x"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(&FilterKey::new("region", "in")).unwrap().entries(),
            vec!["1", "4"]
        );
        assert_eq!(
            set.get(&FilterKey::new("goalName", "ctn")),
            Some(&FilterValue::Single("pig".to_string()))
        );
    }

    #[test]
    fn test_from_json_coerces_scalars() {
        let set = FilterSet::from_json(r#"{"region.in": [1, 4], "goalName.ctn": "_pig", "x": 1}"#)
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.get(&FilterKey::new("region", "in")).unwrap().entries(),
            vec!["1", "4"]
        );
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        assert!(FilterSet::from_json(r#"{"region.in": [[1]]}"#).is_err());
        assert!(FilterSet::from_json(r#"["region.in"]"#).is_err());
    }

    #[test]
    fn test_triples_roundtrip_through_set() {
        let triples = vec![
            FilterTriple::new("goalName", "ctn", "_pig"),
            FilterTriple::new("region", "in", vec!["1", "4"]),
        ];
        let set: FilterSet = triples.clone().into_iter().collect();
        let mut back = set.triples();
        back.sort_by(|a, b| a.topic.cmp(&b.topic));
        assert_eq!(back, triples);
    }
}
