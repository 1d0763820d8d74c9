pub mod concepts;
pub mod summary;
