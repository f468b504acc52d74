pub mod efs;
pub mod s3;

pub use efs::FileSystemDataSource;
pub use s3::ObjectDataSource;
