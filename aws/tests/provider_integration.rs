//! End-to-end runs of the provider against in-memory AWS services.

#![allow(clippy::disallowed_methods)]

use async_trait::async_trait;
use aws::api::efs::{DescribeFileSystemsInput, EfsApi, FileSystem, LifecyclePolicy};
use aws::api::s3::{ObjectHead, ObjectRequest, S3Api};
use aws::api::sagemaker::{
    CreateWorkforceInput, SageMakerApi, UpdateWorkforceInput, Workforce, WorkforceVpcConfigResponse,
};
use aws::api::ApiError;
use aws::conns::AwsClient;
use aws::tags::s3::{bucket_list_tags, bucket_update_tags, object_update_tags};
use aws::tags::{IgnoreTagsConfig, KeyValueTags};
use aws::AwsProvider;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest,
    ImportResourceStateRequest, ModifyPlanRequest, ReadResourceRequest, UpdateResourceRequest,
};
use tfplug::{
    AttributePath, Context, Dynamic, DynamicValue, Provider, Resource, ResourceWithImportState,
    ResourceWithModifyPlan,
};

/// Workforces become Active as soon as they are created or updated
#[derive(Default)]
struct InstantSageMaker {
    workforces: Mutex<HashMap<String, Workforce>>,
}

#[async_trait]
impl SageMakerApi for InstantSageMaker {
    async fn create_workforce(&self, input: CreateWorkforceInput) -> Result<(), ApiError> {
        let name = input.workforce_name.clone();
        let vpc = input.workforce_vpc_config.map(|vpc| WorkforceVpcConfigResponse {
            vpc_endpoint_id: Some("vpce-0123".to_string()),
            security_group_ids: vpc.security_group_ids,
            subnets: vpc.subnets,
            vpc_id: vpc.vpc_id,
        });
        self.workforces.lock().unwrap().insert(
            name.clone(),
            Workforce {
                workforce_name: name.clone(),
                workforce_arn: Some(format!("arn:aws:sagemaker:eu-west-1:111122223333:workforce/{}", name)),
                subdomain: Some(format!("{}.labeling.eu-west-1.sagemaker.aws", name)),
                status: Some("Active".to_string()),
                cognito_config: input.cognito_config,
                source_ip_config: Some(input.source_ip_config.unwrap_or_default()),
                workforce_vpc_config: vpc,
                ..Default::default()
            },
        );
        Ok(())
    }

    async fn describe_workforce(&self, name: &str) -> Result<Option<Workforce>, ApiError> {
        self.workforces
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .map(Some)
            .ok_or_else(|| {
                ApiError::service(
                    "ValidationException",
                    format!("No workforce found with name {}", name),
                )
            })
    }

    async fn update_workforce(&self, input: UpdateWorkforceInput) -> Result<(), ApiError> {
        let mut workforces = self.workforces.lock().unwrap();
        let workforce = workforces
            .get_mut(&input.workforce_name)
            .ok_or_else(|| ApiError::service("ValidationException", "No workforce found"))?;
        if let Some(source_ip) = input.source_ip_config {
            workforce.source_ip_config = Some(source_ip);
        }
        Ok(())
    }

    async fn delete_workforce(&self, name: &str) -> Result<(), ApiError> {
        match self.workforces.lock().unwrap().remove(name) {
            Some(_) => Ok(()),
            None => Err(ApiError::service(
                "ValidationException",
                format!("No workforce found with name {}", name),
            )),
        }
    }
}

#[derive(Default)]
struct MemoryS3 {
    objects: Mutex<HashMap<String, (ObjectHead, Vec<u8>)>>,
    bucket_tags: Mutex<HashMap<String, BTreeMap<String, String>>>,
    object_tags: Mutex<HashMap<String, BTreeMap<String, String>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl MemoryS3 {
    fn no_tag_set() -> ApiError {
        ApiError::service("NoSuchTagSet", "The TagSet does not exist")
    }

    fn object_key(bucket: &str, key: &str) -> String {
        format!("{}/{}", bucket, key)
    }
}

#[async_trait]
impl S3Api for MemoryS3 {
    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead, ApiError> {
        self.objects
            .lock()
            .unwrap()
            .get(&Self::object_key(&request.bucket, &request.key))
            .map(|(head, _)| head.clone())
            .ok_or_else(|| ApiError::service("NotFound", "Not Found"))
    }

    async fn get_object_body(&self, request: &ObjectRequest) -> Result<Vec<u8>, ApiError> {
        self.objects
            .lock()
            .unwrap()
            .get(&Self::object_key(&request.bucket, &request.key))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| ApiError::service("NoSuchKey", "The specified key does not exist."))
    }

    async fn get_bucket_tagging(&self, bucket: &str) -> Result<BTreeMap<String, String>, ApiError> {
        self.bucket_tags
            .lock()
            .unwrap()
            .get(bucket)
            .cloned()
            .ok_or_else(Self::no_tag_set)
    }

    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push("put_bucket_tagging");
        self.bucket_tags
            .lock()
            .unwrap()
            .insert(bucket.to_string(), tags.clone());
        Ok(())
    }

    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push("delete_bucket_tagging");
        self.bucket_tags.lock().unwrap().remove(bucket);
        Ok(())
    }

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        self.object_tags
            .lock()
            .unwrap()
            .get(&Self::object_key(bucket, key))
            .cloned()
            .ok_or_else(Self::no_tag_set)
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push("put_object_tagging");
        self.object_tags
            .lock()
            .unwrap()
            .insert(Self::object_key(bucket, key), tags.clone());
        Ok(())
    }

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push("delete_object_tagging");
        self.object_tags
            .lock()
            .unwrap()
            .remove(&Self::object_key(bucket, key));
        Ok(())
    }
}

#[derive(Default)]
struct MemoryEfs {
    file_systems: Vec<FileSystem>,
}

#[async_trait]
impl EfsApi for MemoryEfs {
    async fn describe_file_systems(
        &self,
        input: &DescribeFileSystemsInput,
    ) -> Result<Vec<FileSystem>, ApiError> {
        Ok(self
            .file_systems
            .iter()
            .filter(|fs| {
                input
                    .creation_token
                    .as_ref()
                    .map_or(true, |token| &fs.creation_token == token)
            })
            .cloned()
            .collect())
    }

    async fn describe_lifecycle_configuration(
        &self,
        _file_system_id: &str,
    ) -> Result<Vec<LifecyclePolicy>, ApiError> {
        Ok(vec![LifecyclePolicy {
            transition_to_ia: Some("AFTER_7_DAYS".to_string()),
            ..Default::default()
        }])
    }
}

fn object(fields: Vec<(&str, Dynamic)>) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    ))
}

fn block(fields: Vec<(&str, Dynamic)>) -> Dynamic {
    Dynamic::block(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

fn client(s3: Arc<MemoryS3>, efs: MemoryEfs) -> Arc<AwsClient> {
    Arc::new(AwsClient::new(
        "eu-west-1",
        IgnoreTagsConfig::default(),
        Arc::new(InstantSageMaker::default()),
        s3,
        Arc::new(efs),
    ))
}

fn workforce_config(cidrs: &[&str]) -> DynamicValue {
    object(vec![
        ("id", Dynamic::Null),
        ("arn", Dynamic::Null),
        ("subdomain", Dynamic::Null),
        ("workforce_name", Dynamic::string("labelers")),
        (
            "cognito_config",
            block(vec![
                ("client_id", Dynamic::string("client")),
                ("user_pool", Dynamic::string("eu-west-1_pool")),
            ]),
        ),
        ("oidc_config", Dynamic::empty_list()),
        (
            "source_ip_config",
            block(vec![("cidrs", Dynamic::string_set(cidrs.iter().copied()))]),
        ),
        (
            "workforce_vpc_config",
            block(vec![
                ("security_group_ids", Dynamic::string_set(["sg-1"])),
                ("subnets", Dynamic::string_set(["subnet-1"])),
                ("vpc_endpoint_id", Dynamic::Null),
                ("vpc_id", Dynamic::string("vpc-1")),
            ]),
        ),
    ])
}

#[tokio::test]
async fn workforce_lifecycle() {
    let client = client(Arc::new(MemoryS3::default()), MemoryEfs::default());
    let resource = aws::resources::WorkforceResource::with_client(client);

    let config = workforce_config(&["10.0.0.0/16"]);
    let plan = resource
        .modify_plan(
            Context::new(),
            ModifyPlanRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                config: config.clone(),
                prior_state: DynamicValue::null(),
                proposed_new_state: config.clone(),
            },
        )
        .await;
    assert!(plan.diagnostics.is_empty(), "{:?}", plan.diagnostics);
    let endpoint_path = AttributePath::new("workforce_vpc_config")
        .index(0)
        .attribute("vpc_endpoint_id");
    assert!(plan.planned_state.get_or_null(&endpoint_path).is_unknown());

    let created = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                planned_state: plan.planned_state,
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    let state = created.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "labelers");
    assert_eq!(state.get_string(&endpoint_path).unwrap(), "vpce-0123");

    let refreshed = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                current_state: state.clone(),
            },
        )
        .await
        .new_state
        .unwrap();
    for path in [AttributePath::new("arn"), AttributePath::new("subdomain"), endpoint_path.clone()] {
        assert_eq!(refreshed.get_or_null(&path), state.get_or_null(&path));
    }

    let mut planned = state.clone();
    planned
        .set(
            &AttributePath::new("source_ip_config"),
            block(vec![(
                "cidrs",
                Dynamic::string_set(["10.0.0.0/16", "192.168.0.0/24"]),
            )]),
        )
        .unwrap();
    let updated = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                prior_state: state.clone(),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;
    assert!(updated.diagnostics.is_empty(), "{:?}", updated.diagnostics);
    let cidrs = updated.new_state.get_or_null(
        &AttributePath::new("source_ip_config")
            .index(0)
            .attribute("cidrs"),
    );
    assert_eq!(cidrs.to_string_set(), vec!["10.0.0.0/16", "192.168.0.0/24"]);

    let imported = resource
        .import_state(
            Context::new(),
            ImportResourceStateRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                id: "labelers".to_string(),
            },
        )
        .await;
    let from_import = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                current_state: imported.imported_resources[0].state.clone(),
            },
        )
        .await
        .new_state
        .unwrap();
    assert_eq!(
        from_import.get_string(&AttributePath::new("workforce_name")).unwrap(),
        "labelers"
    );

    for _ in 0..2 {
        let deleted = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "aws_sagemaker_workforce".to_string(),
                    prior_state: updated.new_state.clone(),
                },
            )
            .await;
        assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    }

    let gone = resource
        .read(
            Context::new(),
            ReadResourceRequest {
                type_name: "aws_sagemaker_workforce".to_string(),
                current_state: updated.new_state,
            },
        )
        .await;
    assert!(gone.new_state.is_none());
}

#[tokio::test]
async fn data_sources_through_provider_factories() {
    let s3 = Arc::new(MemoryS3::default());
    s3.objects.lock().unwrap().insert(
        "assets/config.json".to_string(),
        (
            ObjectHead {
                content_type: Some("application/json".to_string()),
                content_length: Some(15),
                ..Default::default()
            },
            br#"{"debug":true}"#.to_vec(),
        ),
    );
    let efs = MemoryEfs {
        file_systems: vec![FileSystem {
            file_system_id: "fs-abc".to_string(),
            creation_token: "shared".to_string(),
            ..Default::default()
        }],
    };
    let provider_data: Arc<dyn Any + Send + Sync> = client(s3, efs);
    let provider = AwsProvider::new();
    let factories = provider.data_sources();

    let mut object_source = factories["aws_s3_object"]();
    object_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider_data.clone()),
            },
        )
        .await;
    let object_read = object_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "aws_s3_object".to_string(),
                config: object(vec![
                    ("bucket", Dynamic::string("assets")),
                    ("key", Dynamic::string("config.json")),
                ]),
            },
        )
        .await;
    assert!(object_read.diagnostics.is_empty(), "{:?}", object_read.diagnostics);
    assert_eq!(
        object_read.state.get_string(&AttributePath::new("body")).unwrap(),
        r#"{"debug":true}"#
    );

    let mut fs_source = factories["aws_efs_file_system"]();
    fs_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(provider_data),
            },
        )
        .await;
    let fs_read = fs_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "aws_efs_file_system".to_string(),
                config: object(vec![("creation_token", Dynamic::string("shared"))]),
            },
        )
        .await;
    assert!(fs_read.diagnostics.is_empty(), "{:?}", fs_read.diagnostics);
    assert_eq!(
        fs_read.state.get_string(&AttributePath::new("dns_name")).unwrap(),
        "fs-abc.efs.eu-west-1.amazonaws.com"
    );
}

#[tokio::test]
async fn resources_reject_foreign_provider_data() {
    let provider = AwsProvider::new();
    let mut resource = provider.resources()["aws_sagemaker_workforce"]();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(Arc::new("not a client".to_string())),
            },
        )
        .await;
    assert_eq!(response.diagnostics.len(), 1);
}

#[tokio::test]
async fn tag_updates_keep_tags_managed_elsewhere() {
    let s3 = Arc::new(MemoryS3::default());
    s3.bucket_tags.lock().unwrap().insert(
        "logs".to_string(),
        BTreeMap::from([
            ("Name".to_string(), "logs".to_string()),
            ("CostCenter".to_string(), "1234".to_string()),
        ]),
    );

    let old = KeyValueTags::new([("Name", "logs")]);
    let new = KeyValueTags::new([("Name", "logs-v2"), ("Env", "prod")]);
    bucket_update_tags(s3.as_ref(), "logs", &old, &new)
        .await
        .unwrap();

    let tags = bucket_list_tags(s3.as_ref(), "logs").await.unwrap();
    assert_eq!(tags.get("Name"), Some("logs-v2"));
    assert_eq!(tags.get("Env"), Some("prod"));
    assert_eq!(tags.get("CostCenter"), Some("1234"));

    // removing every managed tag from an object without foreign tags deletes the set
    s3.object_tags.lock().unwrap().insert(
        "logs/2024/app.log".to_string(),
        BTreeMap::from([("Retention".to_string(), "30d".to_string())]),
    );
    object_update_tags(
        &Context::new(),
        s3.as_ref(),
        "logs",
        "2024/app.log",
        &KeyValueTags::new([("Retention", "30d")]),
        &KeyValueTags::default(),
    )
    .await
    .unwrap();
    assert!(s3.object_tags.lock().unwrap().is_empty());
    assert_eq!(
        s3.calls.lock().unwrap().clone(),
        vec!["put_bucket_tagging", "delete_object_tagging"]
    );
}
