pub mod auth;
pub mod preconditions;
