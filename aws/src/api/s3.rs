use super::{owned, to_utc, ApiError};
use async_trait::async_trait;
use aws_sdk_s3::types::{Tag, Tagging};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

/// Identifies an object, optionally a byte range of one version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectRequest {
    pub bucket: String,
    pub key: String,
    pub range: Option<String>,
    pub version_id: Option<String>,
}

/// Object metadata returned by HeadObject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectHead {
    pub bucket_key_enabled: Option<bool>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_length: Option<i64>,
    pub content_type: Option<String>,
    pub delete_marker: Option<bool>,
    pub etag: Option<String>,
    pub expiration: Option<String>,
    pub expires: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
    pub object_lock_legal_hold_status: Option<String>,
    pub object_lock_mode: Option<String>,
    pub object_lock_retain_until_date: Option<DateTime<Utc>>,
    pub server_side_encryption: Option<String>,
    pub sse_kms_key_id: Option<String>,
    pub storage_class: Option<String>,
    pub version_id: Option<String>,
    pub website_redirect_location: Option<String>,
}

#[async_trait]
pub trait S3Api: Send + Sync {
    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead, ApiError>;

    async fn get_object_body(&self, request: &ObjectRequest) -> Result<Vec<u8>, ApiError>;

    async fn get_bucket_tagging(&self, bucket: &str) -> Result<BTreeMap<String, String>, ApiError>;

    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError>;

    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), ApiError>;

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError>;

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError>;

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), ApiError>;
}

/// S3Api backed by the AWS SDK
pub struct S3Client {
    client: aws_sdk_s3::Client,
}

impl S3Client {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl S3Api for S3Client {
    async fn head_object(&self, request: &ObjectRequest) -> Result<ObjectHead, ApiError> {
        let out = self
            .client
            .head_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_range(request.range.clone())
            .set_version_id(request.version_id.clone())
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        Ok(ObjectHead {
            bucket_key_enabled: out.bucket_key_enabled(),
            cache_control: owned(out.cache_control()),
            content_disposition: owned(out.content_disposition()),
            content_encoding: owned(out.content_encoding()),
            content_language: owned(out.content_language()),
            content_length: out.content_length(),
            content_type: owned(out.content_type()),
            delete_marker: out.delete_marker(),
            etag: owned(out.e_tag()),
            expiration: owned(out.expiration()),
            expires: owned(out.expires_string()),
            last_modified: out.last_modified().and_then(to_utc),
            metadata: out.metadata().cloned().unwrap_or_default(),
            object_lock_legal_hold_status: out
                .object_lock_legal_hold_status()
                .map(|s| s.as_str().to_string()),
            object_lock_mode: out.object_lock_mode().map(|s| s.as_str().to_string()),
            object_lock_retain_until_date: out.object_lock_retain_until_date().and_then(to_utc),
            server_side_encryption: out.server_side_encryption().map(|s| s.as_str().to_string()),
            sse_kms_key_id: owned(out.ssekms_key_id()),
            storage_class: out.storage_class().map(|s| s.as_str().to_string()),
            version_id: owned(out.version_id()),
            website_redirect_location: owned(out.website_redirect_location()),
        })
    }

    async fn get_object_body(&self, request: &ObjectRequest) -> Result<Vec<u8>, ApiError> {
        let out = self
            .client
            .get_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .set_range(request.range.clone())
            .set_version_id(request.version_id.clone())
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let body = out
            .body
            .collect()
            .await
            .map_err(|e| ApiError::Body(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn get_bucket_tagging(&self, bucket: &str) -> Result<BTreeMap<String, String>, ApiError> {
        let out = self
            .client
            .get_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(from_tag_set(out.tag_set()))
    }

    async fn put_bucket_tagging(
        &self,
        bucket: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.client
            .put_bucket_tagging()
            .bucket(bucket)
            .tagging(to_tagging(tags)?)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }

    async fn delete_bucket_tagging(&self, bucket: &str) -> Result<(), ApiError> {
        self.client
            .delete_bucket_tagging()
            .bucket(bucket)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }

    async fn get_object_tagging(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<BTreeMap<String, String>, ApiError> {
        let out = self
            .client
            .get_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(from_tag_set(out.tag_set()))
    }

    async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &BTreeMap<String, String>,
    ) -> Result<(), ApiError> {
        self.client
            .put_object_tagging()
            .bucket(bucket)
            .key(key)
            .tagging(to_tagging(tags)?)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }

    async fn delete_object_tagging(&self, bucket: &str, key: &str) -> Result<(), ApiError> {
        self.client
            .delete_object_tagging()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;
        Ok(())
    }
}

fn from_tag_set(tags: &[Tag]) -> BTreeMap<String, String> {
    tags.iter()
        .filter_map(|t| Some((owned(t.key())?, owned(t.value()).unwrap_or_default())))
        .collect()
}

fn to_tagging(tags: &BTreeMap<String, String>) -> Result<Tagging, ApiError> {
    let tag_set = tags
        .iter()
        .map(|(k, v)| Tag::builder().key(k).value(v).build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::Build(e.to_string()))?;

    Tagging::builder()
        .set_tag_set(Some(tag_set))
        .build()
        .map_err(|e| ApiError::Build(e.to_string()))
}
