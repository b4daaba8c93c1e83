pub mod expense;
pub mod habit;
pub mod refresh_token;
pub mod user;
pub mod user_auth_link;
