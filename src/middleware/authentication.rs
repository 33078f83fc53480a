use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, Ready};

use crate::auth::JwtKeys;
use crate::error::{AppError, DomainError, Unauthorized};

/// Credentials that were presented but could not be verified.
///
/// Stored in the request extensions so the authorization stage can explain a
/// 401 on protected routes. Anonymous routes ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedCredentials(pub String);

/// Resolves the caller's identity from an `Authorization: Bearer` header.
///
/// A valid token stores its [`Claims`](crate::auth::Claims) in the request
/// extensions. This stage never halts a request: without the header, or with
/// an invalid token or another scheme, the request continues anonymously and
/// the authorization stage decides whether that is acceptable.
pub struct Authentication {
    keys: JwtKeys,
}

impl Authentication {
    pub fn new(keys: JwtKeys) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthenticationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationService {
            service,
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthenticationService<S> {
    service: S,
    keys: JwtKeys,
}

impl<S, B> Service<ServiceRequest> for AuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let credentials = req
            .headers()
            .get(header::AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default().to_string());

        if let Some(credentials) = credentials {
            match bearer_token(&credentials).and_then(|token| self.keys.verify_token(token)) {
                Ok(claims) => {
                    req.extensions_mut().insert(claims);
                }
                Err(app_err) => {
                    let message = match app_err.as_domain() {
                        Some(error) => error.message().to_string(),
                        None => Unauthorized::DEFAULT_MESSAGE.to_string(),
                    };
                    log::debug!("Ignoring credentials on {}: {}", req.path(), message);
                    req.extensions_mut().insert(RejectedCredentials(message));
                }
            }
        }

        self.service.call(req)
    }
}

fn bearer_token(value: &str) -> Result<&str, AppError> {
    match value.split_once(' ') {
        Some((scheme, token))
            if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() =>
        {
            Ok(token.trim())
        }
        _ => Err(Unauthorized::new("Unsupported authorization scheme").into()),
    }
}
