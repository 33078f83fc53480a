use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, FutureExt, LocalBoxFuture, Ready};
use std::rc::Rc;

use crate::auth::Claims;
use crate::error::{AppError, Forbidden, Unauthorized};
use crate::middleware::RejectedCredentials;
use crate::models::UserRole;

/// What a route demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anonymous,
    Authenticated,
    Admin,
}

/// Per-path access rules. Anything not listed requires an authenticated caller.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    anonymous: Vec<String>,
    admin: Vec<String>,
}

impl AccessPolicy {
    /// The rules for the routes registered under `/api`.
    pub fn api() -> Self {
        Self::default()
            .allow_anonymous("/api/auth/login")
            .allow_anonymous("/api/auth/register")
            .require_admin("/api/users")
    }

    /// Exact path reachable without credentials.
    pub fn allow_anonymous(mut self, path: impl Into<String>) -> Self {
        self.anonymous.push(path.into());
        self
    }

    /// Path prefix restricted to administrators.
    pub fn require_admin(mut self, prefix: impl Into<String>) -> Self {
        self.admin.push(prefix.into());
        self
    }

    pub fn requirement(&self, path: &str) -> Requirement {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        if self.anonymous.iter().any(|allowed| allowed == path) {
            return Requirement::Anonymous;
        }
        let admin_only = self.admin.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });
        if admin_only {
            Requirement::Admin
        } else {
            Requirement::Authenticated
        }
    }

    /// Checks `role` (the caller's, `None` when anonymous) against `path`.
    pub fn authorize(&self, path: &str, role: Option<UserRole>) -> Result<(), AppError> {
        match (self.requirement(path), role) {
            (Requirement::Anonymous, _) => Ok(()),
            (_, None) => Err(Unauthorized::default().into()),
            (Requirement::Admin, Some(role)) if role != UserRole::Admin => {
                Err(Forbidden::default().into())
            }
            _ => Ok(()),
        }
    }
}

/// Permission check against the identity resolved by `Authentication`.
///
/// Rules are matched against the percent-decoded path, the same one the
/// router dispatches on, so an encoded spelling of a protected path gets the
/// same verdict as the plain one.
pub struct Authorization {
    policy: Rc<AccessPolicy>,
}

impl Authorization {
    pub fn new(policy: AccessPolicy) -> Self {
        Self {
            policy: Rc::new(policy),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authorization
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthorizationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthorizationService {
            service,
            policy: Rc::clone(&self.policy),
        }))
    }
}

pub struct AuthorizationService<S> {
    service: S,
    policy: Rc<AccessPolicy>,
}

impl<S, B> Service<ServiceRequest> for AuthorizationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let (role, rejected) = {
            let extensions = req.extensions();
            (
                extensions.get::<Claims>().map(|claims| claims.role),
                extensions.get::<RejectedCredentials>().cloned(),
            )
        };
        let outcome = self
            .policy
            .authorize(req.match_info().as_str(), role)
            .map_err(|app_err| match rejected {
                Some(RejectedCredentials(reason)) if role.is_none() => {
                    Unauthorized::new(reason).into()
                }
                _ => app_err,
            });

        match outcome {
            Ok(()) => self
                .service
                .call(req)
                .map(|res| res.map(ServiceResponse::map_into_left_body))
                .boxed_local(),
            Err(app_err) => {
                log::debug!("Denied {} {}: {}", req.method(), req.path(), app_err);
                let res = req.error_response(app_err).map_into_right_body();
                Box::pin(ready(Ok(res)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::JwtKeys;
    use crate::error::{Diagnostics, ErrorBody};
    use crate::middleware::{Authentication, ErrorHandling};
    use crate::models::User;
    use actix_web::{
        http::{header, StatusCode},
        test, web, App, HttpResponse,
    };

    #[::core::prelude::v1::test]
    fn test_requirements() {
        let policy = AccessPolicy::api();
        assert_eq!(policy.requirement("/api/auth/login"), Requirement::Anonymous);
        assert_eq!(policy.requirement("/api/auth/register/"), Requirement::Anonymous);
        assert_eq!(policy.requirement("/api/tasks"), Requirement::Authenticated);
        assert_eq!(policy.requirement("/api/auth/logout"), Requirement::Authenticated);
        assert_eq!(policy.requirement("/api/users"), Requirement::Admin);
        assert_eq!(policy.requirement("/api/users/7"), Requirement::Admin);
        assert_eq!(policy.requirement("/api/usersettings"), Requirement::Authenticated);
    }

    #[::core::prelude::v1::test]
    fn test_authorize() {
        let policy = AccessPolicy::api();
        assert!(policy.authorize("/api/auth/login", None).is_ok());
        assert!(policy.authorize("/api/tasks", Some(UserRole::User)).is_ok());
        assert!(policy.authorize("/api/users", Some(UserRole::Admin)).is_ok());

        let status = |result: Result<(), AppError>| {
            use actix_web::ResponseError;
            result.unwrap_err().status_code()
        };
        assert_eq!(
            status(policy.authorize("/api/tasks", None)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(policy.authorize("/api/users", Some(UserRole::User))),
            StatusCode::FORBIDDEN
        );
    }

    #[actix_rt::test]
    async fn test_rejects_before_dispatch() {
        async fn tasks() -> HttpResponse {
            HttpResponse::Ok().finish()
        }

        let keys = JwtKeys::new("authorization_middleware_secret", 1);
        let app = test::init_service(
            App::new()
                .wrap(Authorization::new(AccessPolicy::api()))
                .wrap(Authentication::new(keys.clone()))
                .wrap(ErrorHandling::new(Diagnostics::Redacted))
                .route("/api/tasks", web::get().to(tasks))
                .route("/api/users", web::get().to(tasks)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/tasks").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.message, Unauthorized::DEFAULT_MESSAGE);

        let token = keys
            .generate_token(&User {
                id: 1,
                username: "member".to_string(),
                email: "member@example.com".to_string(),
                role: UserRole::User,
                created_at: chrono::Utc::now(),
            })
            .unwrap();
        let authorization = (header::AUTHORIZATION, format!("Bearer {}", token));

        let req = test::TestRequest::get()
            .uri("/api/tasks")
            .insert_header(authorization.clone())
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/users")
            .insert_header(authorization)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.message, Forbidden::DEFAULT_MESSAGE);
    }

    #[actix_rt::test]
    async fn test_encoded_paths_get_the_same_verdict() {
        async fn users() -> HttpResponse {
            HttpResponse::Ok().body("every account")
        }

        let keys = JwtKeys::new("authorization_middleware_secret", 1);
        let app = test::init_service(
            App::new()
                .wrap(Authorization::new(AccessPolicy::api()))
                .wrap(Authentication::new(keys.clone()))
                .wrap(ErrorHandling::new(Diagnostics::Redacted))
                .route("/api/users", web::get().to(users)),
        )
        .await;
        let token = keys
            .generate_token(&User {
                id: 2,
                username: "member".to_string(),
                email: "member@example.com".to_string(),
                role: UserRole::User,
                created_at: chrono::Utc::now(),
            })
            .unwrap();

        for uri in ["/api/%75sers", "/api/%75%73%65%72%73", "/api/users/"] {
            let req = test::TestRequest::get()
                .uri(uri)
                .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_ne!(resp.status(), StatusCode::OK, "{} reached the handler", uri);
        }

        let req = test::TestRequest::get()
            .uri("/api/%75sers")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_rejected_credentials_explain_the_denial() {
        async fn tasks() -> HttpResponse {
            HttpResponse::Ok().finish()
        }

        let app = test::init_service(
            App::new()
                .wrap(Authorization::new(AccessPolicy::api()))
                .wrap(Authentication::new(JwtKeys::new("secret", 1)))
                .wrap(ErrorHandling::new(Diagnostics::Redacted))
                .route("/api/tasks", web::get().to(tasks))
                .route("/api/auth/login", web::post().to(tasks)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/tasks")
            .insert_header((header::AUTHORIZATION, "Bearer garbage"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.message, "Invalid token");

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .insert_header((header::AUTHORIZATION, "Bearer garbage"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }
}
