pub mod auth;
pub mod expense;
pub mod habit;
