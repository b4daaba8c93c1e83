pub mod analytics;
pub mod calendar;
pub mod insights;
pub mod models;
pub mod streak;
