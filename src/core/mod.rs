// Shared query/record vocabulary, error modeling, and sorted-file range search.
pub mod binsearch;
pub mod error;
pub mod query;
pub mod text_file;
