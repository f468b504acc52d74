//! Terraform provider for AWS: SageMaker workforces, S3 objects and EFS file
//! systems.

pub mod api;
pub mod config;
pub mod conns;
pub mod data_sources;
pub mod flex;
pub mod logging;
pub mod resources;
pub mod tags;

use async_trait::async_trait;
use config::ProviderConfig;
use conns::AwsClient;
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, ProviderMetadataRequest,
    ProviderMetadataResponse, ProviderSchemaRequest, ProviderSchemaResponse,
    ValidateProviderConfigRequest, ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::validate_config;
use tfplug::{
    AttributeBuilder, AttributeType, Context, DataSourceFactory, Diagnostic, NestedBlockBuilder,
    Provider, ResourceFactory, Schema, SchemaBuilder,
};

pub const PROVIDER_TYPE_NAME: &str = "aws";

#[derive(Default)]
pub struct AwsProvider {
    client: Option<Arc<AwsClient>>,
}

impl AwsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configured client, once `configure` has succeeded
    pub fn client(&self) -> Option<&Arc<AwsClient>> {
        self.client.as_ref()
    }

    pub fn schema_static() -> Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(provider_schema).clone()
    }
}

fn provider_schema() -> Schema {
    let optional_string = |name: &str, description: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .optional()
            .description(description)
            .build()
    };
    let string_set = || AttributeType::Set(Box::new(AttributeType::String));

    SchemaBuilder::new()
        .version(0)
        .description("Interact with AWS SageMaker workforces, S3 objects and EFS file systems.")
        .attribute(optional_string(
            "region",
            "The region where AWS operations will take place. Falls back to AWS_REGION / AWS_DEFAULT_REGION.",
        ))
        .attribute(optional_string(
            "profile",
            "The profile for API operations. Falls back to AWS_PROFILE.",
        ))
        .attribute(
            AttributeBuilder::new("access_key", AttributeType::String)
                .optional()
                .sensitive()
                .description("The access key for API operations.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("secret_key", AttributeType::String)
                .optional()
                .sensitive()
                .description("The secret key for API operations.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("s3_use_path_style", AttributeType::Bool)
                .optional()
                .description("Use path-style addressing for S3 (https://s3.amazonaws.com/BUCKET/KEY).")
                .build(),
        )
        .block(
            NestedBlockBuilder::new("endpoints")
                .max_items(1)
                .description("Custom endpoints per service.")
                .attribute(optional_string("efs", "Endpoint override for EFS."))
                .attribute(optional_string("s3", "Endpoint override for S3."))
                .attribute(optional_string("sagemaker", "Endpoint override for SageMaker."))
                .build(),
        )
        .block(
            NestedBlockBuilder::new("ignore_tags")
                .max_items(1)
                .description("Tag keys the provider never reports or removes.")
                .attribute(
                    AttributeBuilder::new("keys", string_set())
                        .optional()
                        .description("Resource tag keys to ignore.")
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("key_prefixes", string_set())
                        .optional()
                        .description("Resource tag key prefixes to ignore.")
                        .build(),
                )
                .build(),
        )
        .build()
}

#[async_trait]
impl Provider for AwsProvider {
    fn type_name(&self) -> &str {
        PROVIDER_TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: PROVIDER_TYPE_NAME.to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ProviderSchemaRequest) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        let mut diagnostics = validate_config(&Self::schema_static(), &request.config);
        if let Err(e) = ProviderConfig::from_dynamic(&request.config) {
            diagnostics.push(Diagnostic::error("Invalid provider configuration", e.to_string()));
        }
        ValidateProviderConfigResponse { diagnostics }
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();
        tracing::info!(
            terraform_version = %request.terraform_version,
            "configuring AWS provider"
        );

        let config = match ProviderConfig::from_dynamic(&request.config) {
            Ok(config) => config.with_env_fallbacks(),
            Err(e) => {
                return ConfigureProviderResponse {
                    diagnostics: vec![Diagnostic::error(
                        "Invalid provider configuration",
                        e.to_string(),
                    )],
                    provider_data: None,
                }
            }
        };

        match AwsClient::from_config(&config).await {
            Ok(client) => {
                let client = Arc::new(client);
                self.client = Some(client.clone());
                let provider_data: Arc<dyn Any + Send + Sync> = client;
                ConfigureProviderResponse {
                    diagnostics: vec![],
                    provider_data: Some(provider_data),
                }
            }
            Err(e) => ConfigureProviderResponse {
                diagnostics: vec![Diagnostic::error(
                    "Failed to configure AWS provider",
                    e.to_string(),
                )],
                provider_data: None,
            },
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            resources::sagemaker::resource_workforce::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(resources::WorkforceResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            data_sources::s3::data_source_object::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::ObjectDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            data_sources::efs::data_source_file_system::TYPE_NAME.to_string(),
            Box::new(|| {
                Box::new(data_sources::FileSystemDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}
