use super::status::status_workforce;
use crate::api::sagemaker::{SageMakerApi, Workforce};
use std::time::Duration;
use tfplug::retry::{StateChangeConf, WaitError};
use tfplug::Context;

const WORKFORCE_STATUS_ACTIVE: &str = "Active";
const WORKFORCE_STATUS_DELETING: &str = "Deleting";
const WORKFORCE_STATUS_INITIALIZING: &str = "Initializing";
const WORKFORCE_STATUS_UPDATING: &str = "Updating";

#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub active_timeout: Duration,
    pub deleted_timeout: Duration,
    /// Fixed interval between polls instead of the exponential back-off
    pub poll_interval: Option<Duration>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            active_timeout: Duration::from_secs(10 * 60),
            deleted_timeout: Duration::from_secs(10 * 60),
            poll_interval: None,
        }
    }
}

fn failure_reason(workforce: &Workforce) -> Option<String> {
    workforce.failure_reason.clone().filter(|r| !r.is_empty())
}

pub async fn wait_workforce_active(
    ctx: &Context,
    conn: &dyn SageMakerApi,
    name: &str,
    options: WaitOptions,
) -> Result<Workforce, WaitError> {
    let mut conf = StateChangeConf::new(
        &[WORKFORCE_STATUS_INITIALIZING, WORKFORCE_STATUS_UPDATING],
        &[WORKFORCE_STATUS_ACTIVE],
        options.active_timeout,
    )
    .last_error(failure_reason);
    if let Some(interval) = options.poll_interval {
        conf = conf.poll_interval(interval);
    }

    conf.wait(ctx, move || status_workforce(conn, name))
        .await?
        .ok_or(WaitError::NotFound { retries: 0 })
}

/// Resolves once DescribeWorkforce no longer finds the workforce
pub async fn wait_workforce_deleted(
    ctx: &Context,
    conn: &dyn SageMakerApi,
    name: &str,
    options: WaitOptions,
) -> Result<(), WaitError> {
    let mut conf: StateChangeConf<Workforce> = StateChangeConf::new(
        &[WORKFORCE_STATUS_DELETING],
        &[],
        options.deleted_timeout,
    )
    .last_error(failure_reason);
    if let Some(interval) = options.poll_interval {
        conf = conf.poll_interval(interval);
    }

    conf.wait(ctx, move || status_workforce(conn, name)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::sagemaker::CreateWorkforceInput;
    use crate::api::test_helpers::FakeSageMaker;

    fn fast() -> WaitOptions {
        WaitOptions {
            active_timeout: Duration::from_secs(5),
            deleted_timeout: Duration::from_secs(5),
            poll_interval: Some(Duration::from_millis(1)),
        }
    }

    async fn created(conn: &FakeSageMaker, name: &str) {
        conn.create_workforce(CreateWorkforceInput {
            workforce_name: name.to_string(),
            ..Default::default()
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn waits_until_active() {
        let conn = FakeSageMaker::default();
        created(&conn, "wf").await;

        let wf = wait_workforce_active(&Context::new(), &conn, "wf", fast())
            .await
            .unwrap();

        assert_eq!(wf.status.as_deref(), Some("Active"));
        assert_eq!(conn.calls().iter().filter(|c| *c == "describe_workforce").count(), 2);
    }

    #[tokio::test]
    async fn failed_status_reports_reason() {
        let conn = FakeSageMaker::default();
        conn.settle_in("Failed", "subnet-123 is not in the VPC");
        created(&conn, "wf").await;

        let err = wait_workforce_active(&Context::new(), &conn, "wf", fast())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::UnexpectedState { .. }));
        assert!(err.to_string().contains("subnet-123 is not in the VPC"));
    }

    #[tokio::test]
    async fn deleted_completes_when_gone() {
        let conn = FakeSageMaker::default();
        created(&conn, "wf").await;
        conn.delete_workforce("wf").await.unwrap();

        wait_workforce_deleted(&Context::new(), &conn, "wf", fast())
            .await
            .unwrap();
        assert!(conn.get("wf").is_none());
    }
}
