use super::find::find_workforce_by_name;
use crate::api::sagemaker::{SageMakerApi, Workforce};
use tfplug::retry::RefreshResult;

/// Refresh step for the workforce waiters: `None` once the workforce is gone
pub(super) async fn status_workforce(conn: &dyn SageMakerApi, name: &str) -> RefreshResult<Workforce> {
    match find_workforce_by_name(conn, name).await {
        Ok(workforce) => {
            let status = workforce.status.clone().unwrap_or_default();
            Ok(Some((workforce, status)))
        }
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
