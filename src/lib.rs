pub mod config;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sanitize;
pub mod state;
