//! The `provider "aws" {}` block

use crate::flex;
use crate::tags::IgnoreTagsConfig;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tfplug::DynamicValue;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("decoding provider configuration: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("region is required (set it in the provider block or via AWS_REGION / AWS_DEFAULT_REGION)")]
    MissingRegion,

    #[error("access_key and secret_key must be set together")]
    PartialCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, deserialize_with = "non_empty")]
    pub region: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub profile: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub access_key: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub secret_key: Option<String>,

    #[serde(default, deserialize_with = "first_block")]
    pub endpoints: Endpoints,

    #[serde(default)]
    pub s3_use_path_style: Option<bool>,

    #[serde(default, deserialize_with = "first_block")]
    pub ignore_tags: IgnoreTags,
}

/// Per-service endpoint overrides, mostly for LocalStack-style testing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Endpoints {
    #[serde(default, deserialize_with = "non_empty")]
    pub sagemaker: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub s3: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub efs: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct IgnoreTags {
    #[serde(default)]
    pub keys: Option<Vec<String>>,
    #[serde(default)]
    pub key_prefixes: Option<Vec<String>>,
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// Single nested blocks arrive as a list of at most one object
fn first_block<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let blocks: Option<Vec<T>> = Option::deserialize(deserializer)?;
    Ok(blocks
        .and_then(|b| b.into_iter().next())
        .unwrap_or_default())
}

impl ProviderConfig {
    /// Decode the provider block. Values still unknown at configure time
    /// count as unset, so they fall back to the environment.
    pub fn from_dynamic(config: &DynamicValue) -> Result<Self, ConfigError> {
        if config.is_null() || config.value.is_unknown() {
            return Ok(Self::default());
        }
        let json = serde_json::to_value(flex::unknown_as_null(&config.value))?;
        Ok(serde_json::from_value(json)?)
    }

    /// Fill unset values from the standard AWS environment variables
    pub fn with_env_fallbacks(mut self) -> Self {
        if self.region.is_none() {
            self.region = env_var("AWS_REGION").or_else(|| env_var("AWS_DEFAULT_REGION"));
        }
        if self.profile.is_none() {
            self.profile = env_var("AWS_PROFILE");
        }
        self
    }

    pub fn validate(&self) -> Result<&str, ConfigError> {
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(ConfigError::PartialCredentials);
        }
        self.region.as_deref().ok_or(ConfigError::MissingRegion)
    }

    pub fn ignore_tags_config(&self) -> IgnoreTagsConfig {
        IgnoreTagsConfig {
            keys: self
                .ignore_tags
                .keys
                .iter()
                .flatten()
                .cloned()
                .collect(),
            key_prefixes: self
                .ignore_tags
                .key_prefixes
                .iter()
                .flatten()
                .cloned()
                .collect(),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
