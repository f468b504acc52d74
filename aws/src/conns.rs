//! Configured AWS clients shared by every resource and data source

use crate::api::efs::{EfsApi, EfsClient};
use crate::api::s3::{S3Api, S3Client};
use crate::api::sagemaker::{SageMakerApi, SageMakerClient};
use crate::config::{ConfigError, ProviderConfig};
use crate::tags::IgnoreTagsConfig;
use aws_config::{BehaviorVersion, Region};
use std::any::Any;
use std::sync::Arc;

const CREDENTIALS_PROVIDER_NAME: &str = "terraform-provider-aws";

/// Provider data handed to resources and data sources on configure
#[derive(Clone)]
pub struct AwsClient {
    region: String,
    ignore_tags: IgnoreTagsConfig,
    sagemaker: Arc<dyn SageMakerApi>,
    s3: Arc<dyn S3Api>,
    efs: Arc<dyn EfsApi>,
}

impl AwsClient {
    pub fn new(
        region: impl Into<String>,
        ignore_tags: IgnoreTagsConfig,
        sagemaker: Arc<dyn SageMakerApi>,
        s3: Arc<dyn S3Api>,
        efs: Arc<dyn EfsApi>,
    ) -> Self {
        Self {
            region: region.into(),
            ignore_tags,
            sagemaker,
            s3,
            efs,
        }
    }

    /// Build SDK clients from the provider block. Credentials come from the
    /// static keys when given, otherwise from the SDK's default chain
    /// (env, profile, IMDS...).
    pub async fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let region = config.validate()?.to_string();

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }
        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }
        let sdk_config = loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.s3_use_path_style.unwrap_or(false));
        if let Some(endpoint) = &config.endpoints.s3 {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        let mut sagemaker_config = aws_sdk_sagemaker::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoints.sagemaker {
            sagemaker_config = sagemaker_config.endpoint_url(endpoint);
        }

        let mut efs_config = aws_sdk_efs::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.endpoints.efs {
            efs_config = efs_config.endpoint_url(endpoint);
        }

        tracing::debug!(
            region = %region,
            profile = ?config.profile,
            static_credentials = config.access_key.is_some(),
            "configured AWS clients"
        );

        Ok(Self::new(
            region,
            config.ignore_tags_config(),
            Arc::new(SageMakerClient::new(aws_sdk_sagemaker::Client::from_conf(
                sagemaker_config.build(),
            ))),
            Arc::new(S3Client::new(aws_sdk_s3::Client::from_conf(s3_config.build()))),
            Arc::new(EfsClient::new(aws_sdk_efs::Client::from_conf(efs_config.build()))),
        ))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ignore_tags(&self) -> &IgnoreTagsConfig {
        &self.ignore_tags
    }

    pub fn sagemaker(&self) -> &dyn SageMakerApi {
        self.sagemaker.as_ref()
    }

    pub fn s3(&self) -> &dyn S3Api {
        self.s3.as_ref()
    }

    pub fn efs(&self) -> &dyn EfsApi {
        self.efs.as_ref()
    }

    /// DNS suffix of the partition the region belongs to
    pub fn dns_suffix(&self) -> &'static str {
        if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        }
    }

    /// `<prefix>.<region>.<dns suffix>`
    pub fn regional_hostname(&self, prefix: &str) -> String {
        format!("{}.{}.{}", prefix, self.region, self.dns_suffix())
    }

    /// Recover the client from the type-erased provider data
    pub fn from_provider_data(data: Option<&Arc<dyn Any + Send + Sync>>) -> Option<Arc<Self>> {
        data.and_then(|d| d.clone().downcast::<AwsClient>().ok())
    }
}
