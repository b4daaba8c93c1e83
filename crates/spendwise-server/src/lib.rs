pub mod auth;
pub mod config;
pub mod social;
pub mod state;
pub mod token_sweeper;
pub mod web;
