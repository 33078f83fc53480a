//! Process wiring: services, shared keys and the request pipeline.
//!
//! [`AppContext`] is built once at startup and cloned into every worker;
//! [`build_app`] turns it into an actix `App` with the pipeline stages in
//! their required order.

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    middleware::Logger,
    web, App, Error,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::JwtKeys;
use crate::config::{Config, CorsPolicy, Environment};
use crate::docs::ApiDoc;
use crate::error::{AppError, Diagnostics};
use crate::middleware::{
    AccessPolicy, Authentication, Authorization, ErrorHandling, ForwardedHeaders, HttpsRedirect,
};
use crate::repository::{
    postgres, InMemoryTaskRepository, InMemoryUserRepository, PgTaskRepository, PgUserRepository,
    TaskRepository, UserRepository,
};
use crate::routes;
use crate::services::{AuthService, TaskService, UserService};

/// Services reachable from handlers through `web::Data<AppState>`.
pub struct AppState {
    pub tasks: TaskService,
    pub auth: AuthService,
    pub users: UserService,
}

/// Environment-dependent choices for the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub environment: Environment,
    pub cors: CorsPolicy,
    pub https_port: Option<u16>,
    pub access: AccessPolicy,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            environment: config.environment,
            cors: config.cors.clone(),
            https_port: config.https_port,
            access: AccessPolicy::api(),
        }
    }

    fn diagnostics(&self) -> Diagnostics {
        if self.environment.is_development() {
            Diagnostics::Verbose
        } else {
            Diagnostics::Redacted
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    state: web::Data<AppState>,
    keys: JwtKeys,
    settings: PipelineSettings,
}

impl AppContext {
    /// Wires services over the given repositories.
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        users: Arc<dyn UserRepository>,
        config: &Config,
    ) -> Self {
        let keys = JwtKeys::new(&config.jwt_secret, config.jwt_expiration_hours);
        let state = AppState {
            tasks: TaskService::new(tasks),
            auth: AuthService::new(Arc::clone(&users), keys.clone(), config.bcrypt_cost),
            users: UserService::new(users),
        };
        Self {
            state: web::Data::new(state),
            keys,
            settings: PipelineSettings::from_config(config),
        }
    }

    /// Connects to PostgreSQL (and migrates it) when a database URL is
    /// configured, otherwise falls back to the in-memory store.
    pub async fn from_config(config: &Config) -> Result<Self, AppError> {
        match config.database_url.as_deref() {
            Some(url) => {
                let pool = postgres::connect(url, config.database_connect_attempts).await?;
                postgres::run_migrations(&pool).await?;
                log::info!("Connected to database, migrations applied");
                Ok(Self::new(
                    Arc::new(PgTaskRepository::new(pool.clone())),
                    Arc::new(PgUserRepository::new(pool)),
                    config,
                ))
            }
            None => {
                log::warn!("No DATABASE_URL configured; data is kept in memory only");
                Ok(Self::new(
                    Arc::new(InMemoryTaskRepository::new()),
                    Arc::new(InMemoryUserRepository::new()),
                    config,
                ))
            }
        }
    }
}

fn cors(policy: &CorsPolicy) -> Cors {
    let cors = Cors::default()
        .allow_any_method()
        .allow_any_header()
        .max_age(3600);
    match policy {
        CorsPolicy::AllowAny => cors.allow_any_origin(),
        CorsPolicy::Origins(origins) => origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin)),
    }
}

/// Builds the application.
///
/// actix applies the last `wrap` first, so the app-level stages below read
/// innermost to outermost. At runtime a request passes forwarded-header
/// trust, request logging, the error boundary, CORS and the HTTPS redirect
/// (which leaves the API docs alone), is routed, and only then meets
/// authentication and authorization, which are scoped to `/api`. Unmatched
/// requests get a structured 404 from the default service.
pub fn build_app(
    context: &AppContext,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let settings = &context.settings;

    App::new()
        .app_data(context.state.clone())
        .wrap(HttpsRedirect::new(settings.https_port).exempt("/swagger"))
        .wrap(cors(&settings.cors))
        .wrap(ErrorHandling::new(settings.diagnostics()))
        .wrap(Logger::default())
        .wrap(ForwardedHeaders::new(settings.environment.is_production()))
        .service(
            SwaggerUi::new("/swagger/{_:.*}")
                .url("/swagger/v1/swagger.json", ApiDoc::openapi()),
        )
        .service(routes::health::health)
        .service(
            web::scope("/api")
                .wrap(Authorization::new(settings.access.clone()))
                .wrap(Authentication::new(context.keys.clone()))
                .configure(routes::config),
        )
        .default_service(web::route().to(routes::not_found))
}
