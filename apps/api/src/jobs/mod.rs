pub mod files;
pub mod handlers;
pub mod summary;
