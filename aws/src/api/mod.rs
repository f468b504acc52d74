//! Thin adapters over the AWS SDK clients.
//!
//! Each service exposes a trait with just the calls the provider makes, a
//! plain-struct request/response model, and an implementation backed by the
//! SDK client. Resources only ever see the trait, which keeps them testable
//! with in-memory fakes.

pub mod efs;
pub mod error;
pub mod s3;
pub mod sagemaker;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use error::ApiError;

/// Owned copy of an SDK string getter. Required members come back as `&str`,
/// optional ones as `Option<&str>`; both convert.
pub(crate) fn owned<'a>(value: impl Into<Option<&'a str>>) -> Option<String> {
    value.into().map(str::to_string)
}

/// SDK timestamps as UTC datetimes
pub(crate) fn to_utc(value: &aws_sdk_s3::primitives::DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}
