use super::{owned, ApiError};
use async_trait::async_trait;
use aws_sdk_sagemaker::types as sdk;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CognitoConfig {
    pub client_id: String,
    pub user_pool: String,
}

/// OIDC settings sent on create/update. The client secret is write-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OidcConfig {
    pub authorization_endpoint: String,
    pub client_id: String,
    pub client_secret: String,
    pub issuer: String,
    pub jwks_uri: String,
    pub logout_endpoint: String,
    pub token_endpoint: String,
    pub user_info_endpoint: String,
}

/// OIDC settings as returned by DescribeWorkforce, without the secret
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OidcConfigForResponse {
    pub authorization_endpoint: Option<String>,
    pub client_id: Option<String>,
    pub issuer: Option<String>,
    pub jwks_uri: Option<String>,
    pub logout_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub user_info_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceIpConfig {
    pub cidrs: Vec<String>,
}

/// An all-empty request clears the VPC configuration of a workforce
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkforceVpcConfigRequest {
    pub security_group_ids: Vec<String>,
    pub subnets: Vec<String>,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkforceVpcConfigResponse {
    pub security_group_ids: Vec<String>,
    pub subnets: Vec<String>,
    pub vpc_endpoint_id: Option<String>,
    pub vpc_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workforce {
    pub workforce_name: String,
    pub workforce_arn: Option<String>,
    pub subdomain: Option<String>,
    pub status: Option<String>,
    pub failure_reason: Option<String>,
    pub cognito_config: Option<CognitoConfig>,
    pub oidc_config: Option<OidcConfigForResponse>,
    pub source_ip_config: Option<SourceIpConfig>,
    pub workforce_vpc_config: Option<WorkforceVpcConfigResponse>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateWorkforceInput {
    pub workforce_name: String,
    pub cognito_config: Option<CognitoConfig>,
    pub oidc_config: Option<OidcConfig>,
    pub source_ip_config: Option<SourceIpConfig>,
    pub workforce_vpc_config: Option<WorkforceVpcConfigRequest>,
}

/// Only the blocks that are `Some` are changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateWorkforceInput {
    pub workforce_name: String,
    pub oidc_config: Option<OidcConfig>,
    pub source_ip_config: Option<SourceIpConfig>,
    pub workforce_vpc_config: Option<WorkforceVpcConfigRequest>,
}

#[async_trait]
pub trait SageMakerApi: Send + Sync {
    async fn create_workforce(&self, input: CreateWorkforceInput) -> Result<(), ApiError>;

    /// `Ok(None)` when the service answers without a workforce
    async fn describe_workforce(&self, name: &str) -> Result<Option<Workforce>, ApiError>;

    async fn update_workforce(&self, input: UpdateWorkforceInput) -> Result<(), ApiError>;

    async fn delete_workforce(&self, name: &str) -> Result<(), ApiError>;
}

/// SageMakerApi backed by the AWS SDK
pub struct SageMakerClient {
    client: aws_sdk_sagemaker::Client,
}

impl SageMakerClient {
    pub fn new(client: aws_sdk_sagemaker::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SageMakerApi for SageMakerClient {
    async fn create_workforce(&self, input: CreateWorkforceInput) -> Result<(), ApiError> {
        self.client
            .create_workforce()
            .workforce_name(input.workforce_name)
            .set_cognito_config(input.cognito_config.map(to_sdk_cognito))
            .set_oidc_config(input.oidc_config.map(to_sdk_oidc))
            .set_source_ip_config(input.source_ip_config.map(to_sdk_source_ip))
            .set_workforce_vpc_config(input.workforce_vpc_config.map(to_sdk_vpc))
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }

    async fn describe_workforce(&self, name: &str) -> Result<Option<Workforce>, ApiError> {
        let output = self
            .client
            .describe_workforce()
            .workforce_name(name)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let workforce: Option<&sdk::Workforce> = output.workforce().into();
        Ok(workforce.map(from_sdk_workforce))
    }

    async fn update_workforce(&self, input: UpdateWorkforceInput) -> Result<(), ApiError> {
        self.client
            .update_workforce()
            .workforce_name(input.workforce_name)
            .set_oidc_config(input.oidc_config.map(to_sdk_oidc))
            .set_source_ip_config(input.source_ip_config.map(to_sdk_source_ip))
            .set_workforce_vpc_config(input.workforce_vpc_config.map(to_sdk_vpc))
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }

    async fn delete_workforce(&self, name: &str) -> Result<(), ApiError> {
        self.client
            .delete_workforce()
            .workforce_name(name)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }
}

fn to_sdk_cognito(config: CognitoConfig) -> sdk::CognitoConfig {
    sdk::CognitoConfig::builder()
        .client_id(config.client_id)
        .user_pool(config.user_pool)
        .build()
}

fn to_sdk_oidc(config: OidcConfig) -> sdk::OidcConfig {
    sdk::OidcConfig::builder()
        .authorization_endpoint(config.authorization_endpoint)
        .client_id(config.client_id)
        .client_secret(config.client_secret)
        .issuer(config.issuer)
        .jwks_uri(config.jwks_uri)
        .logout_endpoint(config.logout_endpoint)
        .token_endpoint(config.token_endpoint)
        .user_info_endpoint(config.user_info_endpoint)
        .build()
}

fn to_sdk_source_ip(config: SourceIpConfig) -> sdk::SourceIpConfig {
    sdk::SourceIpConfig::builder()
        .set_cidrs(Some(config.cidrs))
        .build()
}

fn to_sdk_vpc(config: WorkforceVpcConfigRequest) -> sdk::WorkforceVpcConfigRequest {
    sdk::WorkforceVpcConfigRequest::builder()
        .set_security_group_ids(Some(config.security_group_ids))
        .set_subnets(Some(config.subnets))
        .set_vpc_id(config.vpc_id)
        .build()
}

fn from_sdk_workforce(wf: &sdk::Workforce) -> Workforce {
    Workforce {
        workforce_name: owned(wf.workforce_name()).unwrap_or_default(),
        workforce_arn: owned(wf.workforce_arn()),
        subdomain: owned(wf.sub_domain()),
        status: wf.status().map(|s| s.as_str().to_string()),
        failure_reason: owned(wf.failure_reason()),
        cognito_config: wf.cognito_config().map(|c| CognitoConfig {
            client_id: owned(c.client_id()).unwrap_or_default(),
            user_pool: owned(c.user_pool()).unwrap_or_default(),
        }),
        oidc_config: wf.oidc_config().map(|c| OidcConfigForResponse {
            authorization_endpoint: owned(c.authorization_endpoint()),
            client_id: owned(c.client_id()),
            issuer: owned(c.issuer()),
            jwks_uri: owned(c.jwks_uri()),
            logout_endpoint: owned(c.logout_endpoint()),
            token_endpoint: owned(c.token_endpoint()),
            user_info_endpoint: owned(c.user_info_endpoint()),
        }),
        source_ip_config: wf.source_ip_config().map(|c| SourceIpConfig {
            cidrs: c.cidrs().to_vec(),
        }),
        workforce_vpc_config: wf.workforce_vpc_config().map(|c| WorkforceVpcConfigResponse {
            security_group_ids: c.security_group_ids().to_vec(),
            subnets: c.subnets().to_vec(),
            vpc_endpoint_id: owned(c.vpc_endpoint_id()),
            vpc_id: owned(c.vpc_id()),
        }),
    }
}
