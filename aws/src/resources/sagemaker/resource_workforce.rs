//! `aws_sagemaker_workforce`
//!
//! A workforce is identified by its name. Creation and updates are
//! asynchronous on the AWS side, so every mutating call is followed by a wait
//! for the `Active` status before the state is read back.

use super::find::find_workforce_by_name;
use super::wait::{wait_workforce_active, wait_workforce_deleted, WaitOptions};
use crate::api::sagemaker::{
    CognitoConfig, CreateWorkforceInput, OidcConfig, OidcConfigForResponse, SourceIpConfig,
    UpdateWorkforceInput, WorkforceVpcConfigRequest, WorkforceVpcConfigResponse,
};
use crate::conns::AwsClient;
use crate::flex::{self, first_block, opt_string_field, string_field, string_set_field};
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ModifyPlanRequest,
    ModifyPlanResponse, ReadResourceRequest, ReadResourceResponse, ResourceMetadataRequest,
    ResourceMetadataResponse, ResourceSchemaRequest, ResourceSchemaResponse,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{plan_change, validate_config};
use tfplug::validator::{IsCidr, IsUrlWithHttps, SetSizeAtMost, StringLenBetween, StringMatch};
use tfplug::{
    import_state_passthrough_id, AttributeBuilder, AttributePath, AttributeType, Context,
    Diagnostic, Dynamic, DynamicValue, NestedBlockBuilder, Resource, ResourceWithConfigure,
    ResourceWithImportState, ResourceWithModifyPlan, Schema, SchemaBuilder, TfplugError,
};

pub const TYPE_NAME: &str = "aws_sagemaker_workforce";

const WORKFORCE_NAME_PATTERN: &str = r"^[a-zA-Z0-9]([a-zA-Z0-9\-])*$";

pub struct WorkforceResource {
    client: Option<Arc<AwsClient>>,
    wait: WaitOptions,
}

impl Default for WorkforceResource {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkforceResource {
    pub fn new() -> Self {
        Self {
            client: None,
            wait: WaitOptions::default(),
        }
    }

    pub fn with_client(client: Arc<AwsClient>) -> Self {
        Self {
            client: Some(client),
            wait: WaitOptions::default(),
        }
    }

    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn schema_static() -> Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(workforce_schema).clone()
    }

    fn client(&self) -> Result<&AwsClient, Diagnostic> {
        self.client.as_deref().ok_or_else(|| {
            Diagnostic::error(
                TfplugError::ProviderNotConfigured.to_string(),
                "The provider must be configured before SageMaker workforces can be managed.",
            )
        })
    }

    /// Read the workforce into a state derived from `prior`. `Ok(None)` means
    /// the workforce is gone and should leave the state.
    async fn read_workforce(
        &self,
        client: &AwsClient,
        name: &str,
        prior: &DynamicValue,
        new_resource: bool,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let workforce = match find_workforce_by_name(client.sagemaker(), name).await {
            Ok(workforce) => workforce,
            Err(e) if !new_resource && e.is_not_found() => {
                tracing::warn!("SageMaker Workforce ({}) not found, removing from state", name);
                return Ok(None);
            }
            Err(e) => {
                return Err(error_diagnostic(
                    format!("reading SageMaker Workforce ({})", name),
                    e,
                ))
            }
        };

        let mut state = DynamicValue::new(flex::unknown_as_null(&prior.value));
        if state.is_null() {
            state = DynamicValue::object();
        }

        let client_secret = prior
            .get_or_null(&oidc_client_secret_path())
            .as_str()
            .unwrap_or_default()
            .to_string();

        set_attr(&mut state, "id", Dynamic::string(name))?;
        set_attr(&mut state, "arn", Dynamic::opt_string(workforce.workforce_arn.as_ref()))?;
        set_attr(&mut state, "subdomain", Dynamic::opt_string(workforce.subdomain.as_ref()))?;
        set_attr(&mut state, "workforce_name", Dynamic::string(&workforce.workforce_name))?;
        set_attr(
            &mut state,
            "cognito_config",
            flatten_cognito_config(workforce.cognito_config.as_ref()),
        )?;
        if let Some(oidc) = &workforce.oidc_config {
            set_attr(&mut state, "oidc_config", flatten_oidc_config(oidc, &client_secret))?;
        }
        set_attr(
            &mut state,
            "source_ip_config",
            flatten_source_ip_config(workforce.source_ip_config.as_ref()),
        )?;
        set_attr(
            &mut state,
            "workforce_vpc_config",
            flatten_vpc_config(workforce.workforce_vpc_config.as_ref()),
        )?;

        Ok(Some(state))
    }
}

fn workforce_schema() -> Schema {
    let endpoint = |name: &str, description: &str| {
        AttributeBuilder::new(name, AttributeType::String)
            .required()
            .validator(StringLenBetween::create(1, 500))
            .validator(IsUrlWithHttps::create())
            .description(description)
            .build()
    };
    let string_set = || AttributeType::Set(Box::new(AttributeType::String));

    let mut workforce_name = AttributeBuilder::new("workforce_name", AttributeType::String)
        .required()
        .validator(StringLenBetween::create(1, 63));
    if let Ok(pattern) = Regex::new(WORKFORCE_NAME_PATTERN) {
        workforce_name = workforce_name.validator(StringMatch::create(
            pattern,
            "Valid characters are a-z, A-Z, 0-9, and - (hyphen).",
        ));
    }

    SchemaBuilder::new()
        .version(0)
        .description("Provides a SageMaker Workforce resource.")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .build(),
        )
        .attribute(
            AttributeBuilder::new("arn", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .description("The Amazon Resource Name (ARN) assigned by AWS to this Workforce.")
                .build(),
        )
        .attribute(
            AttributeBuilder::new("subdomain", AttributeType::String)
                .computed()
                .plan_modifier(UseStateForUnknown::create())
                .description("The subdomain for your OIDC Identity Provider.")
                .build(),
        )
        .attribute(
            workforce_name
                .plan_modifier(RequiresReplace::create())
                .description("The name of the Workforce (must be unique).")
                .build(),
        )
        .block(
            NestedBlockBuilder::new("cognito_config")
                .max_items(1)
                .plan_modifier(RequiresReplace::create())
                .description("Use this parameter to configure an Amazon Cognito private workforce.")
                .attribute(
                    AttributeBuilder::new("client_id", AttributeType::String)
                        .required()
                        .description("The client ID for your Amazon Cognito user pool.")
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("user_pool", AttributeType::String)
                        .required()
                        .description("ID for your Amazon Cognito user pool.")
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("oidc_config")
                .max_items(1)
                .description("Use this parameter to configure a private workforce using your own OIDC Identity Provider.")
                .attribute(endpoint("authorization_endpoint", "The OIDC IdP authorization endpoint used to configure your private workforce."))
                .attribute(
                    AttributeBuilder::new("client_id", AttributeType::String)
                        .required()
                        .validator(StringLenBetween::create(1, 1024))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("client_secret", AttributeType::String)
                        .required()
                        .sensitive()
                        .validator(StringLenBetween::create(1, 1024))
                        .build(),
                )
                .attribute(endpoint("issuer", "The OIDC IdP issuer used to configure your private workforce."))
                .attribute(endpoint("jwks_uri", "The OIDC IdP JSON Web Key Set (Jwks) URI used to configure your private workforce."))
                .attribute(endpoint("logout_endpoint", "The OIDC IdP logout endpoint used to configure your private workforce."))
                .attribute(endpoint("token_endpoint", "The OIDC IdP token endpoint used to configure your private workforce."))
                .attribute(endpoint("user_info_endpoint", "The OIDC IdP user information endpoint used to configure your private workforce."))
                .build(),
        )
        .block(
            NestedBlockBuilder::new("source_ip_config")
                .max_items(1)
                .computed()
                .description("A list of IP address ranges used to create an allow list of IP addresses for a private workforce.")
                .attribute(
                    AttributeBuilder::new("cidrs", string_set())
                        .required()
                        .validator(SetSizeAtMost::create(10))
                        .element_validator(IsCidr::create())
                        .build(),
                )
                .build(),
        )
        .block(
            NestedBlockBuilder::new("workforce_vpc_config")
                .max_items(1)
                .description("Configure a workforce using VPC.")
                .attribute(
                    AttributeBuilder::new("security_group_ids", string_set())
                        .optional()
                        .validator(SetSizeAtMost::create(5))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("subnets", string_set())
                        .optional()
                        .validator(SetSizeAtMost::create(16))
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("vpc_endpoint_id", AttributeType::String)
                        .computed()
                        .build(),
                )
                .attribute(
                    AttributeBuilder::new("vpc_id", AttributeType::String)
                        .optional()
                        .build(),
                )
                .build(),
        )
        .exactly_one_of(&["cognito_config", "oidc_config"])
        .build()
}

fn oidc_client_secret_path() -> AttributePath {
    AttributePath::new("oidc_config")
        .index(0)
        .attribute("client_secret")
}

fn vpc_id_path() -> AttributePath {
    AttributePath::new("workforce_vpc_config")
        .index(0)
        .attribute("vpc_id")
}

fn error_diagnostic(summary: String, err: impl std::fmt::Display) -> Diagnostic {
    Diagnostic::error(summary, err.to_string())
}

fn set_attr(state: &mut DynamicValue, name: &str, value: Dynamic) -> Result<(), Diagnostic> {
    let path = AttributePath::new(name);
    state.set(&path, value).map_err(|e| {
        Diagnostic::error(format!("setting {}", name), e.to_string()).with_attribute(path)
    })
}

fn workforce_id(state: &DynamicValue) -> Option<String> {
    state
        .get_ok_string(&AttributePath::new("id"))
        .or_else(|| state.get_ok_string(&AttributePath::new("workforce_name")))
}

pub(crate) fn expand_cognito_config(value: &Dynamic) -> Option<CognitoConfig> {
    let block = first_block(value)?;
    Some(CognitoConfig {
        client_id: string_field(block, "client_id"),
        user_pool: string_field(block, "user_pool"),
    })
}

pub(crate) fn flatten_cognito_config(config: Option<&CognitoConfig>) -> Dynamic {
    let Some(config) = config else {
        return Dynamic::empty_list();
    };
    Dynamic::block(flex::block([
        ("client_id", Dynamic::string(&config.client_id)),
        ("user_pool", Dynamic::string(&config.user_pool)),
    ]))
}

pub(crate) fn expand_oidc_config(value: &Dynamic) -> Option<OidcConfig> {
    let block = first_block(value)?;
    Some(OidcConfig {
        authorization_endpoint: string_field(block, "authorization_endpoint"),
        client_id: string_field(block, "client_id"),
        client_secret: string_field(block, "client_secret"),
        issuer: string_field(block, "issuer"),
        jwks_uri: string_field(block, "jwks_uri"),
        logout_endpoint: string_field(block, "logout_endpoint"),
        token_endpoint: string_field(block, "token_endpoint"),
        user_info_endpoint: string_field(block, "user_info_endpoint"),
    })
}

/// The API never returns the client secret, so it is carried over from state
pub(crate) fn flatten_oidc_config(config: &OidcConfigForResponse, client_secret: &str) -> Dynamic {
    let text = |v: &Option<String>| Dynamic::string(v.as_deref().unwrap_or_default());
    Dynamic::block(flex::block([
        ("authorization_endpoint", text(&config.authorization_endpoint)),
        ("client_id", text(&config.client_id)),
        ("client_secret", Dynamic::string(client_secret)),
        ("issuer", text(&config.issuer)),
        ("jwks_uri", text(&config.jwks_uri)),
        ("logout_endpoint", text(&config.logout_endpoint)),
        ("token_endpoint", text(&config.token_endpoint)),
        ("user_info_endpoint", text(&config.user_info_endpoint)),
    ]))
}

pub(crate) fn expand_source_ip_config(value: &Dynamic) -> Option<SourceIpConfig> {
    let block = first_block(value)?;
    Some(SourceIpConfig {
        cidrs: string_set_field(block, "cidrs"),
    })
}

pub(crate) fn flatten_source_ip_config(config: Option<&SourceIpConfig>) -> Dynamic {
    let Some(config) = config else {
        return Dynamic::empty_list();
    };
    Dynamic::block(flex::block([(
        "cidrs",
        Dynamic::string_set(config.cidrs.iter().cloned()),
    )]))
}

/// An absent block expands to an empty request, which removes the VPC
/// configuration from the workforce
pub(crate) fn expand_vpc_config(value: &Dynamic) -> WorkforceVpcConfigRequest {
    let Some(block) = first_block(value) else {
        return WorkforceVpcConfigRequest::default();
    };
    WorkforceVpcConfigRequest {
        security_group_ids: string_set_field(block, "security_group_ids"),
        subnets: string_set_field(block, "subnets"),
        vpc_id: opt_string_field(block, "vpc_id"),
    }
}

pub(crate) fn flatten_vpc_config(config: Option<&WorkforceVpcConfigResponse>) -> Dynamic {
    let Some(config) = config else {
        return Dynamic::empty_list();
    };
    Dynamic::block(flex::block([
        (
            "security_group_ids",
            Dynamic::string_set(config.security_group_ids.iter().cloned()),
        ),
        ("subnets", Dynamic::string_set(config.subnets.iter().cloned())),
        ("vpc_endpoint_id", Dynamic::opt_string(config.vpc_endpoint_id.as_ref())),
        ("vpc_id", Dynamic::opt_string(config.vpc_id.as_ref())),
    ]))
}

#[async_trait]
impl Resource for WorkforceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: TYPE_NAME.to_string(),
        }
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&Self::schema_static(), &request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let planned = request.planned_state;
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return CreateResourceResponse {
                    new_state: planned,
                    diagnostics: vec![diag],
                }
            }
        };

        let name = planned
            .get_ok_string(&AttributePath::new("workforce_name"))
            .unwrap_or_default();
        let workforce_vpc_config = planned.get_or_null(&AttributePath::new("workforce_vpc_config"));

        let input = CreateWorkforceInput {
            workforce_name: name.clone(),
            cognito_config: expand_cognito_config(
                &planned.get_or_null(&AttributePath::new("cognito_config")),
            ),
            oidc_config: expand_oidc_config(&planned.get_or_null(&AttributePath::new("oidc_config"))),
            source_ip_config: expand_source_ip_config(
                &planned.get_or_null(&AttributePath::new("source_ip_config")),
            ),
            workforce_vpc_config: first_block(&workforce_vpc_config)
                .map(|_| expand_vpc_config(&workforce_vpc_config)),
        };

        tracing::debug!(workforce_name = %name, "creating SageMaker Workforce");
        if let Err(e) = client.sagemaker().create_workforce(input).await {
            return CreateResourceResponse {
                new_state: planned,
                diagnostics: vec![error_diagnostic(
                    format!("creating SageMaker Workforce ({})", name),
                    e,
                )],
            };
        }

        let mut created = DynamicValue::new(flex::unknown_as_null(&planned.value));
        let mut diagnostics = Vec::new();
        if let Err(diag) = set_attr(&mut created, "id", Dynamic::string(&name)) {
            diagnostics.push(diag);
        }

        if let Err(e) = wait_workforce_active(&ctx, client.sagemaker(), &name, self.wait).await {
            diagnostics.push(error_diagnostic(
                format!("waiting for SageMaker Workforce ({}) create", name),
                e,
            ));
            return CreateResourceResponse {
                new_state: created,
                diagnostics,
            };
        }

        match self.read_workforce(client, &name, &planned, true).await {
            Ok(Some(state)) => CreateResourceResponse {
                new_state: state,
                diagnostics,
            },
            Ok(None) => CreateResourceResponse {
                new_state: created,
                diagnostics,
            },
            Err(diag) => {
                diagnostics.push(diag);
                CreateResourceResponse {
                    new_state: created,
                    diagnostics,
                }
            }
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let current = request.current_state;
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return ReadResourceResponse {
                    new_state: Some(current),
                    diagnostics: vec![diag],
                }
            }
        };

        let Some(name) = workforce_id(&current) else {
            return ReadResourceResponse {
                new_state: None,
                diagnostics: vec![],
            };
        };

        match self.read_workforce(client, &name, &current, false).await {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(diag) => ReadResourceResponse {
                new_state: Some(current),
                diagnostics: vec![diag],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let prior = request.prior_state;
        let planned = request.planned_state;
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return UpdateResourceResponse {
                    new_state: prior,
                    diagnostics: vec![diag],
                }
            }
        };

        let name = workforce_id(&prior).unwrap_or_default();
        let mut input = UpdateWorkforceInput {
            workforce_name: name.clone(),
            ..Default::default()
        };

        let source_ip_path = AttributePath::new("source_ip_config");
        if planned.has_change(&prior, &source_ip_path) {
            input.source_ip_config = expand_source_ip_config(&planned.get_or_null(&source_ip_path));
        }

        let oidc_path = AttributePath::new("oidc_config");
        if planned.has_change(&prior, &oidc_path) {
            input.oidc_config = expand_oidc_config(&planned.get_or_null(&oidc_path));
        }

        let vpc_path = AttributePath::new("workforce_vpc_config");
        if planned.has_change(&prior, &vpc_path) {
            input.workforce_vpc_config = Some(expand_vpc_config(&planned.get_or_null(&vpc_path)));
        }

        tracing::debug!(workforce_name = %name, "updating SageMaker Workforce");
        if let Err(e) = client.sagemaker().update_workforce(input).await {
            return UpdateResourceResponse {
                new_state: prior,
                diagnostics: vec![error_diagnostic(
                    format!("updating SageMaker Workforce ({})", name),
                    e,
                )],
            };
        }

        if let Err(e) = wait_workforce_active(&ctx, client.sagemaker(), &name, self.wait).await {
            return UpdateResourceResponse {
                new_state: DynamicValue::new(flex::unknown_as_null(&planned.value)),
                diagnostics: vec![error_diagnostic(
                    format!("waiting for SageMaker Workforce ({}) update", name),
                    e,
                )],
            };
        }

        match self.read_workforce(client, &name, &planned, true).await {
            Ok(Some(state)) => UpdateResourceResponse {
                new_state: state,
                diagnostics: vec![],
            },
            Ok(None) => UpdateResourceResponse {
                new_state: DynamicValue::new(flex::unknown_as_null(&planned.value)),
                diagnostics: vec![],
            },
            Err(diag) => UpdateResourceResponse {
                new_state: DynamicValue::new(flex::unknown_as_null(&planned.value)),
                diagnostics: vec![diag],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let client = match self.client() {
            Ok(client) => client,
            Err(diag) => {
                return DeleteResourceResponse {
                    diagnostics: vec![diag],
                }
            }
        };
        let Some(name) = workforce_id(&request.prior_state) else {
            return DeleteResourceResponse {
                diagnostics: vec![],
            };
        };

        tracing::debug!("Deleting SageMaker Workforce: {}", name);
        match client.sagemaker().delete_workforce(&name).await {
            Ok(()) => {}
            Err(e) if e.message_contains("ValidationException", "No workforce") => {
                return DeleteResourceResponse {
                    diagnostics: vec![],
                }
            }
            Err(e) => {
                return DeleteResourceResponse {
                    diagnostics: vec![error_diagnostic(
                        format!("deleting SageMaker Workforce ({})", name),
                        e,
                    )],
                }
            }
        }

        let mut diagnostics = vec![];
        if let Err(e) = wait_workforce_deleted(&ctx, client.sagemaker(), &name, self.wait).await {
            diagnostics.push(error_diagnostic(
                format!("waiting for SageMaker Workforce ({}) delete", name),
                e,
            ));
        }
        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for WorkforceResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        match AwsClient::from_provider_data(request.provider_data.as_ref()) {
            Some(client) => self.client = Some(client),
            None if request.provider_data.is_some() => diagnostics.push(Diagnostic::error(
                "Unexpected Resource Configure Type",
                "Expected the AWS provider client as provider data.",
            )),
            None => {}
        }
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithModifyPlan for WorkforceResource {
    async fn modify_plan(&self, _ctx: Context, request: ModifyPlanRequest) -> ModifyPlanResponse {
        let change = plan_change(
            &Self::schema_static(),
            &request.prior_state,
            &request.proposed_new_state,
            &request.config,
        );
        let mut planned_state = change.planned_state;
        let mut diagnostics = change.diagnostics;

        // the endpoint is created with the VPC, so it is only known after apply
        let creating = request.prior_state.is_null();
        let vpc_path = AttributePath::new("workforce_vpc_config");
        if !planned_state.is_null()
            && first_block(&planned_state.get_or_null(&vpc_path)).is_some()
            && (creating
                || request.prior_state.get_or_null(&vpc_id_path())
                    != planned_state.get_or_null(&vpc_id_path()))
        {
            let endpoint_path = vpc_path.index(0).attribute("vpc_endpoint_id");
            if let Err(e) = planned_state.mark_unknown(&endpoint_path) {
                diagnostics.push(
                    Diagnostic::error("Failed to build plan", e.to_string())
                        .with_attribute(endpoint_path),
                );
            }
        }

        ModifyPlanResponse {
            planned_state,
            requires_replace: change.requires_replace,
            diagnostics,
        }
    }
}

#[async_trait]
impl ResourceWithImportState for WorkforceResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse {
            imported_resources: vec![],
            diagnostics: vec![],
        };
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}
