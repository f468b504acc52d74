//! S3 bucket and object tagging.
//!
//! S3 has no tag-resource API: tags are replaced wholesale with a Put or
//! removed with a Delete. Updates therefore list the current tags first so
//! tags managed outside Terraform (ignored tags) survive the replacement.

use super::KeyValueTags;
use crate::api::s3::S3Api;
use crate::api::ApiError;
use std::time::Duration;
use thiserror::Error;
use tfplug::retry::retry_when;
use tfplug::Context;

const ERR_CODE_NO_SUCH_TAG_SET: &str = "NoSuchTagSet";
const ERR_CODE_NO_SUCH_TAG_SET_ERROR: &str = "NoSuchTagSetError";
const ERR_CODE_NO_SUCH_KEY: &str = "NoSuchKey";

/// Objects can be briefly invisible right after they are written
const OBJECT_TAGS_NOT_FOUND_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum TagsError {
    #[error("listing resource tags ({id}): {source}")]
    List {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("setting resource tags ({id}): {source}")]
    Set {
        id: String,
        #[source]
        source: ApiError,
    },

    #[error("deleting resource tags ({id}): {source}")]
    Delete {
        id: String,
        #[source]
        source: ApiError,
    },
}

/// The AWS docs name the error NoSuchTagSetError while the service has
/// historically answered NoSuchTagSet; both mean "no tags"
fn no_tag_set(err: &ApiError) -> bool {
    err.code_equals(&[ERR_CODE_NO_SUCH_TAG_SET, ERR_CODE_NO_SUCH_TAG_SET_ERROR])
}

/// Tags of a bucket, empty when the bucket has none
pub async fn bucket_list_tags(conn: &dyn S3Api, bucket: &str) -> Result<KeyValueTags, ApiError> {
    match conn.get_bucket_tagging(bucket).await {
        Ok(tags) => Ok(tags.into()),
        Err(e) if no_tag_set(&e) => Ok(KeyValueTags::default()),
        Err(e) => Err(e),
    }
}

/// Move a bucket's tags from `old_tags` to `new_tags`, keeping tags that
/// neither set mentions
pub async fn bucket_update_tags(
    conn: &dyn S3Api,
    bucket: &str,
    old_tags: &KeyValueTags,
    new_tags: &KeyValueTags,
) -> Result<(), TagsError> {
    let all_tags = bucket_list_tags(conn, bucket)
        .await
        .map_err(|source| TagsError::List {
            id: bucket.to_string(),
            source,
        })?;

    match plan_tag_update(&all_tags, old_tags, new_tags) {
        TagUpdate::Put(tags) => conn
            .put_bucket_tagging(bucket, tags.map())
            .await
            .map_err(|source| TagsError::Set {
                id: bucket.to_string(),
                source,
            }),
        TagUpdate::Delete => conn
            .delete_bucket_tagging(bucket)
            .await
            .map_err(|source| TagsError::Delete {
                id: bucket.to_string(),
                source,
            }),
        TagUpdate::Nothing => Ok(()),
    }
}

/// Tags of an object, empty when it has none. `NoSuchKey` is retried for
/// up to a minute.
pub async fn object_list_tags(
    ctx: &Context,
    conn: &dyn S3Api,
    bucket: &str,
    key: &str,
) -> Result<KeyValueTags, ApiError> {
    let result = retry_when(
        ctx,
        OBJECT_TAGS_NOT_FOUND_TIMEOUT,
        || conn.get_object_tagging(bucket, key),
        |e: &ApiError| e.code_equals(&[ERR_CODE_NO_SUCH_KEY]),
    )
    .await;

    match result {
        Ok(tags) => Ok(tags.into()),
        Err(e) if no_tag_set(&e) => Ok(KeyValueTags::default()),
        Err(e) => Err(e),
    }
}

/// Object counterpart of [`bucket_update_tags`]
pub async fn object_update_tags(
    ctx: &Context,
    conn: &dyn S3Api,
    bucket: &str,
    key: &str,
    old_tags: &KeyValueTags,
    new_tags: &KeyValueTags,
) -> Result<(), TagsError> {
    let id = format!("{}/{}", bucket, key);
    let all_tags = object_list_tags(ctx, conn, bucket, key)
        .await
        .map_err(|source| TagsError::List {
            id: id.clone(),
            source,
        })?;

    match plan_tag_update(&all_tags, old_tags, new_tags) {
        TagUpdate::Put(tags) => conn
            .put_object_tagging(bucket, key, tags.map())
            .await
            .map_err(|source| TagsError::Set { id, source }),
        TagUpdate::Delete => conn
            .delete_object_tagging(bucket, key)
            .await
            .map_err(|source| TagsError::Delete { id, source }),
        TagUpdate::Nothing => Ok(()),
    }
}

#[derive(Debug, PartialEq)]
enum TagUpdate {
    Put(KeyValueTags),
    Delete,
    Nothing,
}

fn plan_tag_update(
    all_tags: &KeyValueTags,
    old_tags: &KeyValueTags,
    new_tags: &KeyValueTags,
) -> TagUpdate {
    let ignored = all_tags.ignore(old_tags).ignore(new_tags);

    if new_tags.len() + ignored.len() > 0 {
        TagUpdate::Put(new_tags.merge(&ignored))
    } else if !old_tags.is_empty() && ignored.is_empty() {
        TagUpdate::Delete
    } else {
        TagUpdate::Nothing
    }
}
