pub mod auth_service;
pub mod entity_service;
pub mod errors;
pub mod game_service;
pub mod user_service;
