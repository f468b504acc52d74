//! Key/value tag handling shared by every tagged AWS service

pub mod s3;

use std::collections::{BTreeMap, BTreeSet};
use tfplug::types::Dynamic;

/// Tag keys reserved by AWS
pub const AWS_TAG_KEY_PREFIX: &str = "aws:";

/// An ordered set of key/value tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValueTags(BTreeMap<String, String>);

impl KeyValueTags {
    pub fn new<I, K, V>(tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            tags.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Tags from a Terraform map value; null or unknown yield no tags
    pub fn from_dynamic(value: &Dynamic) -> Self {
        Self(value.to_string_map())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Drop every key that appears in `other`, whatever its value
    pub fn ignore(&self, other: &KeyValueTags) -> Self {
        self.retain(|k, _| !other.0.contains_key(k))
    }

    /// Drop tags whose key starts with `aws:`
    pub fn ignore_aws(&self) -> Self {
        self.retain(|k, _| !k.starts_with(AWS_TAG_KEY_PREFIX))
    }

    /// Drop tags matched by the provider's `ignore_tags` configuration
    pub fn ignore_config(&self, config: &IgnoreTagsConfig) -> Self {
        self.retain(|k, _| !config.matches(k))
    }

    /// Union of both sets; values from `other` win on conflicts
    pub fn merge(&self, other: &KeyValueTags) -> Self {
        let mut merged = self.0.clone();
        merged.extend(other.0.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self(merged)
    }

    /// Every tag of `other` is present here with the same value
    pub fn contains_all(&self, other: &KeyValueTags) -> bool {
        other
            .0
            .iter()
            .all(|(k, v)| self.0.get(k).is_some_and(|own| own == v))
    }

    pub fn map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }

    /// Terraform map value, an empty map rather than null when there are no tags
    pub fn to_dynamic(&self) -> Dynamic {
        Dynamic::string_map(self.0.iter().map(|(k, v)| (k.clone(), v.clone())))
    }

    fn retain(&self, keep: impl Fn(&String, &String) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, v)| keep(k, v))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for KeyValueTags {
    fn from(tags: BTreeMap<String, String>) -> Self {
        Self(tags)
    }
}

/// Provider-level `ignore_tags` settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IgnoreTagsConfig {
    pub keys: BTreeSet<String>,
    pub key_prefixes: BTreeSet<String>,
}

impl IgnoreTagsConfig {
    pub fn matches(&self, key: &str) -> bool {
        self.keys.contains(key) || self.key_prefixes.iter().any(|p| key.starts_with(p.as_str()))
    }
}
