use super::{owned, ApiError};
use async_trait::async_trait;
use aws_sdk_efs::types as sdk;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileSystem {
    pub file_system_id: String,
    pub arn: Option<String>,
    pub availability_zone_id: Option<String>,
    pub availability_zone_name: Option<String>,
    pub creation_token: String,
    pub encrypted: Option<bool>,
    pub kms_key_id: Option<String>,
    pub name: Option<String>,
    pub performance_mode: Option<String>,
    pub provisioned_throughput_in_mibps: Option<f64>,
    pub size_in_bytes: Option<i64>,
    pub throughput_mode: Option<String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecyclePolicy {
    pub transition_to_ia: Option<String>,
    pub transition_to_primary_storage_class: Option<String>,
    pub transition_to_archive: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescribeFileSystemsInput {
    pub file_system_id: Option<String>,
    pub creation_token: Option<String>,
}

#[async_trait]
pub trait EfsApi: Send + Sync {
    /// All pages of DescribeFileSystems
    async fn describe_file_systems(
        &self,
        input: &DescribeFileSystemsInput,
    ) -> Result<Vec<FileSystem>, ApiError>;

    async fn describe_lifecycle_configuration(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<LifecyclePolicy>, ApiError>;
}

/// EfsApi backed by the AWS SDK
pub struct EfsClient {
    client: aws_sdk_efs::Client,
}

impl EfsClient {
    pub fn new(client: aws_sdk_efs::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EfsApi for EfsClient {
    async fn describe_file_systems(
        &self,
        input: &DescribeFileSystemsInput,
    ) -> Result<Vec<FileSystem>, ApiError> {
        let mut pages = self
            .client
            .describe_file_systems()
            .set_file_system_id(input.file_system_id.clone())
            .set_creation_token(input.creation_token.clone())
            .into_paginator()
            .send();

        let mut file_systems = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(ApiError::from_sdk)?;
            file_systems.extend(page.file_systems().iter().map(from_sdk_file_system));
        }
        Ok(file_systems)
    }

    async fn describe_lifecycle_configuration(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<LifecyclePolicy>, ApiError> {
        let out = self
            .client
            .describe_lifecycle_configuration()
            .file_system_id(file_system_id)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        Ok(out
            .lifecycle_policies()
            .iter()
            .map(|p| LifecyclePolicy {
                transition_to_ia: p.transition_to_ia().map(|t| t.as_str().to_string()),
                transition_to_primary_storage_class: p
                    .transition_to_primary_storage_class()
                    .map(|t| t.as_str().to_string()),
                transition_to_archive: p.transition_to_archive().map(|t| t.as_str().to_string()),
            })
            .collect())
    }
}

fn from_sdk_file_system(fs: &sdk::FileSystemDescription) -> FileSystem {
    let performance_mode: Option<&sdk::PerformanceMode> = fs.performance_mode().into();
    let size: Option<&sdk::FileSystemSize> = fs.size_in_bytes().into();

    FileSystem {
        file_system_id: owned(fs.file_system_id()).unwrap_or_default(),
        arn: owned(fs.file_system_arn()),
        availability_zone_id: owned(fs.availability_zone_id()),
        availability_zone_name: owned(fs.availability_zone_name()),
        creation_token: owned(fs.creation_token()).unwrap_or_default(),
        encrypted: fs.encrypted(),
        kms_key_id: owned(fs.kms_key_id()),
        name: owned(fs.name()),
        performance_mode: performance_mode.map(|m| m.as_str().to_string()),
        provisioned_throughput_in_mibps: fs.provisioned_throughput_in_mibps(),
        size_in_bytes: size.and_then(|s| s.value().into()),
        throughput_mode: fs.throughput_mode().map(|m| m.as_str().to_string()),
        tags: fs
            .tags()
            .iter()
            .filter_map(|t| Some((owned(t.key())?, owned(t.value()).unwrap_or_default())))
            .collect(),
    }
}
