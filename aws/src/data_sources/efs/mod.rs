pub mod data_source_file_system;

pub use data_source_file_system::FileSystemDataSource;
