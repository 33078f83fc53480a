use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Claims;
use crate::error::{AppError, Unauthorized};
use crate::models::UserRole;

/// The caller identity resolved by the authentication stage.
///
/// Reads the [`Claims`] that the `Authentication` middleware stores in the
/// request extensions. Routes behind the authorization stage always have them;
/// elsewhere a missing identity is reported as [`Unauthorized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub role: UserRole,
}

impl From<&Claims> for AuthenticatedUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<Claims>().map(AuthenticatedUser::from);
        match user {
            Some(user) => ready(Ok(user)),
            None => {
                let err: AppError = Unauthorized::default().into();
                ready(Err(err.into()))
            }
        }
    }
}
