#![doc = "The `taskboard` library crate."]
#![doc = ""]
#![doc = "Domain models, authentication and authorization, routing configuration and"]
#![doc = "error handling for the Kanban board API. The binary (`main.rs`) and the"]
#![doc = "integration tests assemble the actix `App` from these pieces."]

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;

pub use crate::config::Config;
pub use crate::error::AppError;
