//! OpenAPI document served at `/swagger/v1/swagger.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::ErrorBody;
use crate::models::{Task, TaskInput, TaskPriority, TaskStatus, User, UserRole};
use crate::routes::health::HealthStatus;

/// Registers the bearer token scheme referenced by the protected operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Todo API",
        description = "Task management with JWT authentication.",
        version = "v1"
    ),
    paths(
        crate::routes::health::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::tasks::get_tasks,
        crate::routes::tasks::create_task,
        crate::routes::tasks::get_task,
        crate::routes::tasks::update_task,
        crate::routes::tasks::delete_task,
        crate::routes::users::list_users,
    ),
    components(schemas(
        Task,
        TaskInput,
        TaskPriority,
        TaskStatus,
        User,
        UserRole,
        LoginRequest,
        RegisterRequest,
        AuthResponse,
        ErrorBody,
        HealthStatus
    )),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "auth", description = "Registration and login"),
        (name = "tasks", description = "Tasks owned by the caller"),
        (name = "users", description = "Account administration")
    )
)]
pub struct ApiDoc;
