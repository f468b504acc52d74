//! In-memory fakes of the AWS API traits for unit tests

use super::efs::{DescribeFileSystemsInput, EfsApi, FileSystem, LifecyclePolicy};
use super::s3::{ObjectHead, ObjectRequest, S3Api};
use super::sagemaker::{
    CreateWorkforceInput, OidcConfigForResponse, SageMakerApi, SourceIpConfig,
    UpdateWorkforceInput, Workforce, WorkforceVpcConfigResponse,
};
use super::ApiError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

/// Queued failures per operation name, shared by the fakes
#[derive(Default)]
struct Failures(Mutex<HashMap<&'static str, VecDeque<ApiError>>>);

impl Failures {
    fn push(&self, op: &'static str, err: ApiError) {
        self.0.lock().unwrap().entry(op).or_default().push_back(err);
    }

    fn take(&self, op: &'static str) -> Result<(), ApiError> {
        match self.0.lock().unwrap().get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn pairs(tags: &[(&str, &str)]) -> BTreeMap<String, String> {
    tags.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Workforces move `Initializing`/`Updating` -> `Active` and `Deleting` ->
/// gone one describe after the mutating call
#[derive(Default)]
pub struct FakeSageMaker {
    workforces: Mutex<HashMap<String, Workforce>>,
    failures: Failures,
    calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<CreateWorkforceInput>>,
    pub updated: Mutex<Vec<UpdateWorkforceInput>>,
    /// Status a workforce settles in after creation, `Active` when unset
    pub settle_status: Mutex<Option<(String, String)>>,
}

impl FakeSageMaker {
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.push(op, err);
    }

    pub fn insert(&self, workforce: Workforce) {
        self.workforces
            .lock()
            .unwrap()
            .insert(workforce.workforce_name.clone(), workforce);
    }

    pub fn get(&self, name: &str) -> Option<Workforce> {
        self.workforces.lock().unwrap().get(name).cloned()
    }

    /// Make creations end in `status` with `reason` instead of `Active`
    pub fn settle_in(&self, status: &str, reason: &str) {
        *self.settle_status.lock().unwrap() = Some((status.to_string(), reason.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }

    fn no_workforce(name: &str) -> ApiError {
        ApiError::service(
            "ValidationException",
            format!("No workforce found with name {}", name),
        )
    }
}

fn vpc_response(
    request: &super::sagemaker::WorkforceVpcConfigRequest,
) -> Option<WorkforceVpcConfigResponse> {
    let vpc_id = request.vpc_id.clone()?;
    Some(WorkforceVpcConfigResponse {
        security_group_ids: request.security_group_ids.clone(),
        subnets: request.subnets.clone(),
        vpc_endpoint_id: Some(format!("vpce-{}", vpc_id.trim_start_matches("vpc-"))),
        vpc_id: Some(vpc_id),
    })
}

fn oidc_response(config: &super::sagemaker::OidcConfig) -> OidcConfigForResponse {
    OidcConfigForResponse {
        authorization_endpoint: Some(config.authorization_endpoint.clone()),
        client_id: Some(config.client_id.clone()),
        issuer: Some(config.issuer.clone()),
        jwks_uri: Some(config.jwks_uri.clone()),
        logout_endpoint: Some(config.logout_endpoint.clone()),
        token_endpoint: Some(config.token_endpoint.clone()),
        user_info_endpoint: Some(config.user_info_endpoint.clone()),
    }
}

#[async_trait]
impl SageMakerApi for FakeSageMaker {
    async fn create_workforce(&self, input: CreateWorkforceInput) -> Result<(), ApiError> {
        self.record("create_workforce");
        self.failures.take("create_workforce")?;

        let name = input.workforce_name.clone();
        let workforce = Workforce {
            workforce_name: name.clone(),
            workforce_arn: Some(format!(
                "arn:aws:sagemaker:us-west-2:123456789012:workforce/{}",
                name
            )),
            subdomain: Some(format!("{}.labeling.us-west-2.sagemaker.aws", name)),
            status: Some("Initializing".to_string()),
            failure_reason: None,
            cognito_config: input.cognito_config.clone(),
            oidc_config: input.oidc_config.as_ref().map(oidc_response),
            source_ip_config: Some(input.source_ip_config.clone().unwrap_or_default()),
            workforce_vpc_config: input.workforce_vpc_config.as_ref().and_then(vpc_response),
        };
        self.insert(workforce);
        self.created.lock().unwrap().push(input);
        Ok(())
    }

    async fn describe_workforce(&self, name: &str) -> Result<Option<Workforce>, ApiError> {
        self.record("describe_workforce");
        self.failures.take("describe_workforce")?;

        let mut workforces = self.workforces.lock().unwrap();
        let Some(current) = workforces.get(name).cloned() else {
            return Err(Self::no_workforce(name));
        };

        match current.status.as_deref() {
            Some("Initializing") | Some("Updating") => {
                let settled = self.settle_status.lock().unwrap().clone();
                if let Some(wf) = workforces.get_mut(name) {
                    match settled {
                        Some((status, reason)) => {
                            wf.status = Some(status);
                            wf.failure_reason = Some(reason);
                        }
                        None => wf.status = Some("Active".to_string()),
                    }
                }
            }
            Some("Deleting") => {
                workforces.remove(name);
            }
            _ => {}
        }

        Ok(Some(current))
    }

    async fn update_workforce(&self, input: UpdateWorkforceInput) -> Result<(), ApiError> {
        self.record("update_workforce");
        self.failures.take("update_workforce")?;

        let mut workforces = self.workforces.lock().unwrap();
        let wf = workforces
            .get_mut(&input.workforce_name)
            .ok_or_else(|| Self::no_workforce(&input.workforce_name))?;

        if let Some(oidc) = &input.oidc_config {
            wf.oidc_config = Some(oidc_response(oidc));
        }
        if let Some(source_ip) = &input.source_ip_config {
            wf.source_ip_config = Some(source_ip.clone());
        }
        if let Some(vpc) = &input.workforce_vpc_config {
            wf.workforce_vpc_config = vpc_response(vpc);
        }
        wf.status = Some("Updating".to_string());
        drop(workforces);

        self.updated.lock().unwrap().push(input);
        Ok(())
    }

    async fn delete_workforce(&self, name: &str) -> Result<(), ApiError> {
        self.record("delete_workforce");
        self.failures.take("delete_workforce")?;

        match self.workforces.lock().unwrap().get_mut(name) {
            Some(wf) => {
                wf.status = Some("Deleting".to_string());
                Ok(())
            }
            None => Err(Self::no_workforce(name)),
        }
    }
}

/// Objects, bucket tags and object tags kept in maps. Missing tag sets
/// answer `NoSuchTagSet` like the service does.
#[derive(Default)]
pub struct FakeS3 {
    objects: Mutex<HashMap<(String, String), (ObjectHead, Vec<u8>)>>,
    bucket_tags: Mutex<HashMap<String, BTreeMap<String, String>>>,
    object_tags: Mutex<HashMap<(String, String), BTreeMap<String, String>>>,
    failures: Failures,
    calls: Mutex<Vec<String>>,
    pub body_requests: Mutex<Vec<ObjectRequest>>,
}

impl FakeS3 {
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.push(op, err);
    }

    pub fn put_object(&self, bucket: &str, key: &str, head: ObjectHead, body: &[u8]) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            (head, body.to_vec()),
        );
    }

    pub fn set_bucket_tags(&self, bucket: &str, tags: &[(&str, &str)]) {
        self.bucket_tags
            .lock()
            .unwrap()
            .insert(bucket.to_string(), pairs(tags));
    }

    pub fn set_object_tags(&self, bucket: &str, key: &str, tags: &[(&str, &str)]) {
        self.object_tags
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), pairs(tags));
    }

    pub fn bucket_tags(&self, bucket: &str) -> Option<BTreeMap<String, String>> {
        self.bucket_tags.lock().unwrap().get(bucket).cloned()
    }

    pub fn object_tags(&self, bucket: &str, key: &str) -> Option<BTreeMap<String, String>> {
        self.object_tags
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(op.to_string());
        self.failures.take(op)
    }

    fn no_tag_set() -> ApiError {
        ApiError::service("NoSuchTagSet", "The TagSet does not exist")
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead, ApiError> {
        self.record("head_object")?;
        self.objects
            .lock()
            .unwrap()
            .get(&(request.bucket.clone(), request.key.clone()))
            .map(|(head, _)| head.clone())
            .ok_or_else(|| ApiError::service("NotFound", "Not Found"))
    }

    async fn get_object_body(&self, request: &ObjectRequest) -> Result<Vec<u8>, ApiError> {
        self.record("get_object")?;
        self.body_requests.lock().unwrap().push(request.clone());
        self.objects
            .lock()
            .unwrap()
            .get(&(request.bucket.clone(), request.key.clone()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| ApiError::service("NoSuchKey", "The specified key does not exist."))
    }

    async fn get_bucket_tagging(&self, bucket: &str) -> Result<BTreeMap<String, String>, ApiError> {
        self.record("get_bucket_tagging")?;
        self.bucket_tags(bucket).ok_or_else(Self::no_tag_set)
    }

    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.record("put_bucket_tagging")?;
        self.bucket_tags
            .lock()
            .unwrap()
            .insert(bucket.to_string(), tags.clone());
        Ok(())
    }

    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), ApiError> {
        self.record("delete_bucket_tagging")?;
        self.bucket_tags.lock().unwrap().remove(bucket);
        Ok(())
    }

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        self.record("get_object_tagging")?;
        self.object_tags(bucket, key).ok_or_else(Self::no_tag_set)
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.record("put_object_tagging")?;
        self.object_tags
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), tags.clone());
        Ok(())
    }

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), ApiError> {
        self.record("delete_object_tagging")?;
        self.object_tags
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEfs {
    file_systems: Mutex<Vec<FileSystem>>,
    lifecycle: Mutex<HashMap<String, Vec<LifecyclePolicy>>>,
    failures: Failures,
}

impl FakeEfs {
    pub fn fail_next(&self, op: &'static str, err: ApiError) {
        self.failures.push(op, err);
    }

    pub fn add(&self, file_system: FileSystem) {
        self.file_systems.lock().unwrap().push(file_system);
    }

    pub fn set_lifecycle(&self, file_system_id: &str, policies: Vec<LifecyclePolicy>) {
        self.lifecycle
            .lock()
            .unwrap()
            .insert(file_system_id.to_string(), policies);
    }
}

#[async_trait]
impl EfsApi for FakeEfs {
    async fn describe_file_systems(
        &self,
        input: &DescribeFileSystemsInput,
    ) -> Result<Vec<FileSystem>, ApiError> {
        self.failures.take("describe_file_systems")?;

        let matches: Vec<FileSystem> = self
            .file_systems
            .lock()
            .unwrap()
            .iter()
            .filter(|fs| {
                input
                    .file_system_id
                    .as_ref()
                    .map_or(true, |id| &fs.file_system_id == id)
                    && input
                        .creation_token
                        .as_ref()
                        .map_or(true, |token| &fs.creation_token == token)
            })
            .cloned()
            .collect();

        if let (Some(id), true) = (&input.file_system_id, matches.is_empty()) {
            return Err(ApiError::service(
                "FileSystemNotFound",
                format!("File system '{}' does not exist.", id),
            ));
        }
        Ok(matches)
    }

    async fn describe_lifecycle_configuration(
        &self,
        file_system_id: &str,
    ) -> Result<Vec<LifecyclePolicy>, ApiError> {
        self.failures.take("describe_lifecycle_configuration")?;
        Ok(self
            .lifecycle
            .lock()
            .unwrap()
            .get(file_system_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_sagemaker_settles_after_one_describe() {
        let fake = FakeSageMaker::default();
        tokio_test::block_on(async {
            fake.create_workforce(CreateWorkforceInput {
                workforce_name: "wf".to_string(),
                source_ip_config: Some(SourceIpConfig {
                    cidrs: vec!["10.0.0.0/16".to_string()],
                }),
                ..Default::default()
            })
            .await
            .unwrap();

            let first = fake.describe_workforce("wf").await.unwrap().unwrap();
            let second = fake.describe_workforce("wf").await.unwrap().unwrap();
            assert_eq!(first.status.as_deref(), Some("Initializing"));
            assert_eq!(second.status.as_deref(), Some("Active"));
        });
    }
}
