//! `aws_s3_object` data source

use crate::api::s3::{ObjectHead, ObjectRequest};
use crate::api::ApiError;
use crate::conns::AwsClient;
use crate::tags::s3::object_list_tags;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::RegexSet;
use std::sync::{Arc, OnceLock};
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    ReadDataSourceRequest, ReadDataSourceResponse, ValidateDataSourceConfigRequest,
    ValidateDataSourceConfigResponse,
};
use tfplug::schema::validate_config;
use tfplug::{
    AttributeBuilder, AttributePath, AttributeType, Context, DataSource, DataSourceWithConfigure,
    Diagnostic, Dynamic, DynamicValue, Schema, SchemaBuilder, TfplugError,
};

pub const TYPE_NAME: &str = "aws_s3_object";

const STORAGE_CLASS_STANDARD: &str = "STANDARD";

/// Content types whose body is safe to expose as a string attribute
const ALLOWED_CONTENT_TYPES: &[&str] = &[
    r"^application/atom\+xml$",
    r"^application/json$",
    r"^application/ld\+json$",
    r"^application/x-csh$",
    r"^application/x-httpd-php$",
    r"^application/x-sh$",
    r"^application/xhtml\+xml$",
    r"^application/xml$",
    r"^text/.+",
];

#[derive(Default)]
pub struct ObjectDataSource {
    client: Option<Arc<AwsClient>>,
}

impl ObjectDataSource {
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
        SCHEMA.get_or_init(object_schema).clone()
    }
}

fn object_schema() -> Schema {
    let computed = |name: &str, type_: AttributeType| {
        AttributeBuilder::new(name, type_).computed().build()
    };

    SchemaBuilder::new()
        .version(0)
        .description("Provides metadata and optionally content of an S3 object.")
        .attribute(computed("id", AttributeType::String))
        .attribute(
            AttributeBuilder::new("bucket", AttributeType::String)
                .required()
                .description("Name of the bucket to read the object from.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("key", AttributeType::String)
                .required()
                .description("Full path to the object inside the bucket.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("range", AttributeType::String)
                .optional()
                .description("Range of bytes to read, e.g. `bytes=0-9`.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("version_id", AttributeType::String)
                .optional()
                .computed()
                .description("Specific version ID of the object returned (defaults to latest version).")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("body", AttributeType::String)
                .computed()
                .description("Object data, only populated for human-readable content types.")
                .build(),
        )
        .attribute(computed("bucket_key_enabled", AttributeType::Bool))
        .attribute(computed("cache_control", AttributeType::String))
        .attribute(computed("content_disposition", AttributeType::String))
        .attribute(computed("content_encoding", AttributeType::String))
        .attribute(computed("content_language", AttributeType::String))
        .attribute(computed("content_length", AttributeType::Number))
        .attribute(computed("content_type", AttributeType::String))
        .attribute(computed("etag", AttributeType::String))
        .attribute(computed("expiration", AttributeType::String))
        .attribute(computed("expires", AttributeType::String))
        .attribute(computed("last_modified", AttributeType::String))
        .attribute(computed(
            "metadata",
            AttributeType::Map(Box::new(AttributeType::String)),
        ))
        .attribute(computed("object_lock_legal_hold_status", AttributeType::String))
        .attribute(computed("object_lock_mode", AttributeType::String))
        .attribute(computed("object_lock_retain_until_date", AttributeType::String))
        .attribute(computed("server_side_encryption", AttributeType::String))
        .attribute(computed("sse_kms_key_id", AttributeType::String))
        .attribute(computed("storage_class", AttributeType::String))
        .attribute(computed("website_redirect_location", AttributeType::String))
        .attribute(computed(
            "tags",
            AttributeType::Map(Box::new(AttributeType::String)),
        ))
        .build()
}

/// Binary content would not survive as a string attribute, so only a few
/// text-like content types get their body downloaded
pub fn is_content_type_allowed(content_type: Option<&str>) -> bool {
    static ALLOWED: OnceLock<Option<RegexSet>> = OnceLock::new();
    let Some(content_type) = content_type else {
        return false;
    };
    ALLOWED
        .get_or_init(|| RegexSet::new(ALLOWED_CONTENT_TYPES).ok())
        .as_ref()
        .is_some_and(|set| set.is_match(content_type))
}

/// Go's `time.RFC1123` layout, which is what Terraform users see elsewhere
fn format_rfc1123(value: &DateTime<Utc>) -> String {
    value.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

fn format_rfc3339(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn object_id(bucket: &str, key: &str, version_id: Option<&str>) -> String {
    match version_id {
        Some(version) => format!("{}/{}@{}", bucket, key, version),
        None => format!("{}/{}", bucket, key),
    }
}

fn set_head_attributes(state: &mut DynamicValue, head: &ObjectHead) -> Result<(), TfplugError> {
    let set = |state: &mut DynamicValue, name: &str, value: Dynamic| {
        state.set(&AttributePath::new(name), value)
    };

    set(state, "bucket_key_enabled", Dynamic::opt_bool(head.bucket_key_enabled))?;
    set(state, "cache_control", Dynamic::opt_string(head.cache_control.as_ref()))?;
    set(state, "content_disposition", Dynamic::opt_string(head.content_disposition.as_ref()))?;
    set(state, "content_encoding", Dynamic::opt_string(head.content_encoding.as_ref()))?;
    set(state, "content_language", Dynamic::opt_string(head.content_language.as_ref()))?;
    set(state, "content_length", Dynamic::opt_number(head.content_length.map(|l| l as f64)))?;
    set(state, "content_type", Dynamic::opt_string(head.content_type.as_ref()))?;
    set(
        state,
        "etag",
        Dynamic::string(head.etag.as_deref().unwrap_or_default().trim_matches('"')),
    )?;
    set(state, "expiration", Dynamic::opt_string(head.expiration.as_ref()))?;
    set(state, "expires", Dynamic::opt_string(head.expires.as_ref()))?;
    set(
        state,
        "last_modified",
        Dynamic::string(head.last_modified.as_ref().map(format_rfc1123).unwrap_or_default()),
    )?;
    set(state, "metadata", Dynamic::string_map(head.metadata.clone()))?;
    set(
        state,
        "object_lock_legal_hold_status",
        Dynamic::opt_string(head.object_lock_legal_hold_status.as_ref()),
    )?;
    set(state, "object_lock_mode", Dynamic::opt_string(head.object_lock_mode.as_ref()))?;
    set(
        state,
        "object_lock_retain_until_date",
        Dynamic::string(
            head.object_lock_retain_until_date
                .as_ref()
                .map(format_rfc3339)
                .unwrap_or_default(),
        ),
    )?;
    set(
        state,
        "server_side_encryption",
        Dynamic::opt_string(head.server_side_encryption.as_ref()),
    )?;
    set(state, "sse_kms_key_id", Dynamic::opt_string(head.sse_kms_key_id.as_ref()))?;
    set(state, "version_id", Dynamic::opt_string(head.version_id.as_ref()))?;
    set(
        state,
        "website_redirect_location",
        Dynamic::opt_string(head.website_redirect_location.as_ref()),
    )?;
    // S3 leaves the default storage class out of the response
    set(
        state,
        "storage_class",
        Dynamic::string(head.storage_class.as_deref().unwrap_or(STORAGE_CLASS_STANDARD)),
    )?;
    Ok(())
}

impl ObjectDataSource {
    async fn read_object(
        &self,
        ctx: &Context,
        client: &AwsClient,
        config: &DynamicValue,
    ) -> Result<DynamicValue, Diagnostic> {
        let bucket = config
            .get_ok_string(&AttributePath::new("bucket"))
            .unwrap_or_default();
        let key = config
            .get_ok_string(&AttributePath::new("key"))
            .unwrap_or_default();
        let range = config.get_ok_string(&AttributePath::new("range"));
        let version_id = config.get_ok_string(&AttributePath::new("version_id"));

        let id = object_id(&bucket, &key, version_id.as_deref());
        let version_text = version_id
            .as_ref()
            .map(|v| format!(" of version {:?}", v))
            .unwrap_or_default();

        let request = ObjectRequest {
            bucket: bucket.clone(),
            key: key.clone(),
            range: range.clone(),
            version_id,
        };
        tracing::debug!(?request, "Reading S3 Object");

        let head = client.s3().head_object(&request).await.map_err(|e| {
            Diagnostic::error(
                format!("getting S3 Bucket ({}) Object ({})", bucket, key),
                e.to_string(),
            )
        })?;
        if head.delete_marker == Some(true) {
            return Err(Diagnostic::error(
                format!(
                    "Requested S3 object \"{}{}\"{} has been deleted",
                    bucket, key, version_text
                ),
                "",
            ));
        }
        tracing::debug!(?head, "Received S3 object");

        let mut state = config.clone();
        let setting = |e: TfplugError| Diagnostic::error("setting S3 object attributes", e.to_string());
        state
            .set(&AttributePath::new("id"), Dynamic::string(&id))
            .map_err(setting)?;
        set_head_attributes(&mut state, &head).map_err(setting)?;

        let body = if is_content_type_allowed(head.content_type.as_deref()) {
            let body_request = ObjectRequest {
                bucket: bucket.clone(),
                key: key.clone(),
                range,
                version_id: head.version_id.clone(),
            };
            let bytes = match client.s3().get_object_body(&body_request).await {
                Ok(bytes) => bytes,
                Err(e @ ApiError::Body(_)) => {
                    return Err(Diagnostic::error(
                        format!("Failed reading content of S3 object ({})", id),
                        e.to_string(),
                    ))
                }
                Err(e) => {
                    return Err(Diagnostic::error("Failed getting S3 object", e.to_string()))
                }
            };
            tracing::info!("Saving {} bytes from S3 object {}", bytes.len(), id);
            Dynamic::string(String::from_utf8_lossy(&bytes))
        } else {
            tracing::info!(
                "Ignoring body of S3 object {} with Content-Type {:?}",
                id,
                head.content_type.as_deref().unwrap_or("<EMPTY>")
            );
            Dynamic::Null
        };
        state
            .set(&AttributePath::new("body"), body)
            .map_err(setting)?;

        let tags = object_list_tags(ctx, client.s3(), &bucket, &key)
            .await
            .map_err(|e| {
                Diagnostic::error(
                    format!("listing tags for S3 Bucket ({}) Object ({})", bucket, key),
                    e.to_string(),
                )
            })?;
        let tags = tags.ignore_aws().ignore_config(client.ignore_tags());
        state
            .set(&AttributePath::new("tags"), tags.to_dynamic())
            .map_err(|e| Diagnostic::error("setting tags", e.to_string()))?;

        Ok(state)
    }
}

#[async_trait]
impl DataSource for ObjectDataSource {
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

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let Some(client) = self.client.as_deref() else {
            return ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![Diagnostic::error(
                    TfplugError::ProviderNotConfigured.to_string(),
                    "Provider data was not properly configured",
                )],
            };
        };

        match self.read_object(&ctx, client, &request.config).await {
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
impl DataSourceWithConfigure for ObjectDataSource {
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
