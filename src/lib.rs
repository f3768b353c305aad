pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod models;
pub mod render;
pub mod scheduler;
pub mod server;
pub mod services;
