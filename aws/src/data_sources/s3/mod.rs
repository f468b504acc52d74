pub mod data_source_object;

pub use data_source_object::ObjectDataSource;
