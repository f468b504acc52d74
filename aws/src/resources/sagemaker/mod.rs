//! SageMaker resources

mod find;
mod status;
mod wait;

pub mod resource_workforce;

pub use find::find_workforce_by_name;
pub use resource_workforce::WorkforceResource;
pub use wait::{wait_workforce_active, wait_workforce_deleted, WaitOptions};
