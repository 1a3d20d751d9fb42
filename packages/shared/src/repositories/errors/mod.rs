pub mod repository_errors;
pub mod store_errors;
