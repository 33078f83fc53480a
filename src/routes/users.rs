use actix_web::{get, web, HttpResponse, Responder};

use crate::{
    app::AppState,
    auth::AuthenticatedUser,
    error::{AppError, ErrorBody},
    models::User,
};

/// Lists every account. Administrators only.
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [User]),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 403, description = "Caller is not an administrator", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
#[get("")]
pub async fn list_users(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let users = state.users.list(user.role).await?;
    Ok(HttpResponse::Ok().json(users))
}
