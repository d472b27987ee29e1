// src/lib.rs

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod quiz;
pub mod routes;
pub mod state;
pub mod store;

pub use routes::create_router;
