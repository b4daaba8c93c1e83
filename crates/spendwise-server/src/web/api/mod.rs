pub mod auth;
pub mod error;
pub mod expenses;
pub mod habits;
pub mod insights;
pub mod middleware;
pub mod profile;
pub mod social;

use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub fn build_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/{provider}", post(social::social_login))
        // Profile and budget
        .route("/me", get(profile::me).put(profile::update_me))
        .route(
            "/user/budget",
            get(profile::get_budget).post(profile::set_budget),
        )
        // Expenses
        .route(
            "/expenses",
            get(expenses::list_expenses)
                .post(expenses::create_expense)
                .delete(expenses::clear_expenses),
        )
        .route("/expenses/breakdown", get(expenses::breakdown))
        .route(
            "/expenses/{id}",
            get(expenses::get_expense)
                .put(expenses::update_expense)
                .delete(expenses::delete_expense),
        )
        // Habits
        .route(
            "/habits",
            get(habits::list_habits).post(habits::create_habit),
        )
        .route("/habits/stats", get(habits::habit_stats))
        .route(
            "/habits/{id}",
            put(habits::rename_habit).delete(habits::delete_habit),
        )
        .route(
            "/habits/{id}/complete",
            post(habits::complete_habit).delete(habits::undo_complete_habit),
        )
        // Insights
        .route("/insights", get(insights::get_insights))
        .with_state(state)
}
