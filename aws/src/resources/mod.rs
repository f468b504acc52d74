pub mod sagemaker;

pub use sagemaker::WorkforceResource;
