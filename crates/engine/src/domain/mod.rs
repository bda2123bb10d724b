pub mod error;
pub mod summary;
pub mod trust_writer;
pub mod types;
