//! `aws_efs_file_system` data source
//!
//! Looks a file system up by id, creation token and/or tags. The lookup must
//! narrow down to exactly one file system.

use crate::api::efs::{DescribeFileSystemsInput, FileSystem, LifecyclePolicy};
use crate::conns::AwsClient;
use crate::flex;
use crate::tags::KeyValueTags;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfplug::schema::validate_config;
use tfplug::validator::StringLenBetween;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, DataSource, DataSourceWithConfigure,
    Diagnostic, Dynamic, DynamicValue, NestedBlockBuilder, Schema, SchemaBuilder, TfplugError,
};

pub const TYPE_NAME: &str = "aws_efs_file_system";

#[derive(Default)]
pub struct FileSystemDataSource {
    client: Option<Arc<AwsClient>>,
}

impl FileSystemDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Arc<AwsClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    pub fn schema_static() -> Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(file_system_schema).clone()
    }
}

fn file_system_schema() -> Schema {
    let computed = |name: &str, type_: AttributeType| {
        AttributeBuilder::new(name, type_).computed().build()
    };

    SchemaBuilder::new()
        .version(0)
        .description("Provides information about an Elastic File System (EFS) File System.")
        .attribute(computed("id", AttributeType::String))
        .attribute(
            AttributeBuilder::new("file_system_id", AttributeType::String)
                .optional()
                .computed()
                .description("ID that identifies the file system (e.g., fs-ccfc0d65).")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("creation_token", AttributeType::String)
                .optional()
                .computed()
                .validator(StringLenBetween::create(0, 64))
                .description("Restricts the list to the file system with this creation token.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                .optional()
                .computed()
                .description("Restricts the list to file systems carrying all of these tags.")
                .build(),
        )
        .attribute(computed("arn", AttributeType::String))
        .attribute(computed("availability_zone_id", AttributeType::String))
        .attribute(computed("availability_zone_name", AttributeType::String))
        .attribute(computed("dns_name", AttributeType::String))
        .attribute(computed("encrypted", AttributeType::Bool))
        .attribute(computed("kms_key_id", AttributeType::String))
        .attribute(computed("name", AttributeType::String))
        .attribute(computed("performance_mode", AttributeType::String))
        .attribute(computed("provisioned_throughput_in_mibps", AttributeType::Number))
        .attribute(computed("size_in_bytes", AttributeType::Number))
        .attribute(computed("throughput_mode", AttributeType::String))
        .block(
            NestedBlockBuilder::new("lifecycle_policy")
                .computed()
                .attribute(computed("transition_to_archive", AttributeType::String))
                .attribute(computed("transition_to_ia", AttributeType::String))
                .attribute(computed(
                    "transition_to_primary_storage_class",
                    AttributeType::String,
                ))
                .build(),
        )
        .build()
}

fn flatten_lifecycle_policies(policies: &[LifecyclePolicy]) -> Dynamic {
    let text = |v: &Option<String>| Dynamic::string(v.as_deref().unwrap_or_default());
    Dynamic::List(
        policies
            .iter()
            .map(|policy| {
                Dynamic::Map(flex::block([
                    ("transition_to_archive", text(&policy.transition_to_archive)),
                    ("transition_to_ia", text(&policy.transition_to_ia)),
                    (
                        "transition_to_primary_storage_class",
                        text(&policy.transition_to_primary_storage_class),
                    ),
                ]))
            })
            .collect(),
    )
}

fn search_result_error(count: usize) -> Diagnostic {
    Diagnostic::error(
        format!(
            "Search returned {} results, please revise so only one is returned",
            count
        ),
        "",
    )
}

impl FileSystemDataSource {
    async fn read_file_system(
        &self,
        client: &AwsClient,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let input = DescribeFileSystemsInput {
            file_system_id: config.get_ok_string(&AttributePath::new("file_system_id")),
            creation_token: config.get_ok_string(&AttributePath::new("creation_token")),
        };
        let tags_to_match = KeyValueTags::from_dynamic(&config.get_or_null(&AttributePath::new("tags")))
            .ignore_aws()
            .ignore_config(client.ignore_tags());

        tracing::debug!(?input, "Reading EFS File System");
        let file_systems = client
            .efs()
            .describe_file_systems(&input)
            .await
            .map_err(|e| Diagnostic::error("reading EFS file systems", e.to_string()))?;

        let mut matches: Vec<FileSystem> = file_systems
            .into_iter()
            .filter(|fs| KeyValueTags::from(fs.tags.clone()).contains_all(&tags_to_match))
            .collect();
        if matches.len() != 1 {
            return Err(search_result_error(matches.len()));
        }
        let fs = matches.remove(0);
        let id = fs.file_system_id.clone();

        let policies = client
            .efs()
            .describe_lifecycle_configuration(&id)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("reading EFS File System ({}) lifecycle configuration", id),
                    e.to_string(),
                )
            })?;

        let tags = KeyValueTags::from(fs.tags.clone())
            .ignore_aws()
            .ignore_config(client.ignore_tags());

        let mut state = config.clone();
        let values = [
            ("id", Dynamic::string(&id)),
            ("file_system_id", Dynamic::string(&id)),
            ("arn", Dynamic::opt_string(fs.arn.as_ref())),
            ("availability_zone_id", Dynamic::opt_string(fs.availability_zone_id.as_ref())),
            ("availability_zone_name", Dynamic::opt_string(fs.availability_zone_name.as_ref())),
            ("creation_token", Dynamic::string(&fs.creation_token)),
            ("dns_name", Dynamic::string(client.regional_hostname(&format!("{}.efs", id)))),
            ("encrypted", Dynamic::opt_bool(fs.encrypted)),
            ("kms_key_id", Dynamic::opt_string(fs.kms_key_id.as_ref())),
            ("name", Dynamic::opt_string(fs.name.as_ref())),
            ("performance_mode", Dynamic::opt_string(fs.performance_mode.as_ref())),
            (
                "provisioned_throughput_in_mibps",
                Dynamic::opt_number(fs.provisioned_throughput_in_mibps),
            ),
            ("size_in_bytes", Dynamic::opt_number(fs.size_in_bytes.map(|s| s as f64))),
            ("throughput_mode", Dynamic::opt_string(fs.throughput_mode.as_ref())),
            ("tags", tags.to_dynamic()),
            ("lifecycle_policy", flatten_lifecycle_policies(&policies)),
        ];
        for (name, value) in values {
            let path = AttributePath::new(name);
            state.set(&path, value).map_err(|e| {
                Diagnostic::error(format!("setting {}", name), e.to_string()).with_attribute(path)
            })?;
        }

        Ok(state)
    }
}

#[async_trait]
impl DataSource for FileSystemDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: TYPE_NAME.to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(client) = self.client.as_deref() else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![Diagnostic::error(
                    TfplugError::ProviderNotConfigured.to_string(),
                    "Provider data was not properly configured",
                )],
            };
        };

        match self.read_file_system(client, &request.config).await {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(diag) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![diag],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FileSystemDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        match AwsClient::from_provider_data(request.provider_data.as_ref()) {
            Some(client) => self.client = Some(client),
            None if request.provider_data.is_some() => diagnostics.push(Diagnostic::error(
                "Unexpected Data Source Configure Type",
                "Expected the AWS provider client as provider data.",
            )),
            None => {}
        }
        ConfigureDataSourceResponse { diagnostics }
    }
}
