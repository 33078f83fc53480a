#![doc = "The `todo_api` library crate."]
#![doc = ""]
#![doc = "Domain models, the error taxonomy, authentication, persistence, application"]
#![doc = "services, the request pipeline and the route table of the task API. The"]
#![doc = "binary (`main.rs`) only reads configuration and serves [`app::build_app`]."]

pub mod app;
pub mod auth;
pub mod config;
pub mod docs;
pub mod error;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;

pub use app::{build_app, AppContext};
pub use config::Config;
pub use error::AppError;
