use crate::api::sagemaker::{SageMakerApi, Workforce};
use crate::api::ApiError;

const ERR_CODE_VALIDATION_EXCEPTION: &str = "ValidationException";

/// Describe a workforce. A missing workforce is `ApiError::NotFound`, both
/// when the service rejects the name and when it answers without one.
pub async fn find_workforce_by_name(
    conn: &dyn SageMakerApi,
    name: &str,
) -> Result<Workforce, ApiError> {
    match conn.describe_workforce(name).await {
        Ok(Some(workforce)) => Ok(workforce),
        Ok(None) => Err(ApiError::NotFound(format!("SageMaker Workforce ({})", name))),
        Err(e) if e.message_contains(ERR_CODE_VALIDATION_EXCEPTION, "No workforce") => {
            Err(ApiError::NotFound(format!("SageMaker Workforce ({}): {}", name, e)))
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::FakeSageMaker;

    #[tokio::test]
    async fn missing_workforce_is_not_found() {
        let conn = FakeSageMaker::default();
        let err = find_workforce_by_name(&conn, "absent").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn other_errors_pass_through() {
        let conn = FakeSageMaker::default();
        conn.fail_next(
            "describe_workforce",
            ApiError::service("ThrottlingException", "Rate exceeded"),
        );
        let err = find_workforce_by_name(&conn, "wf").await.unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.code_equals(&["ThrottlingException"]));
    }

    #[tokio::test]
    async fn finds_existing_workforce() {
        let conn = FakeSageMaker::default();
        conn.insert(Workforce {
            workforce_name: "wf".to_string(),
            status: Some("Active".to_string()),
            ..Default::default()
        });
        let wf = find_workforce_by_name(&conn, "wf").await.unwrap();
        assert_eq!(wf.status.as_deref(), Some("Active"));
    }
}
