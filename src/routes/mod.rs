pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::{AppError, RouteNotFound};

/// Registers the routes mounted under `/api`.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(web::scope("/users").service(users::list_users));
}

/// Fallback for requests no route matches, by path or by method.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, AppError> {
    log::debug!("No route for {} {}", req.method(), req.path());
    Err(RouteNotFound::default().into())
}
