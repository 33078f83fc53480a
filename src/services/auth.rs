use std::sync::Arc;
use validator::Validate;

use crate::auth::{
    hash_password, verify_password, AuthResponse, JwtKeys, LoginRequest, RegisterRequest,
};
use crate::error::{AppError, DuplicateRecord, Unauthorized};
use crate::models::{NewUser, UserRole};
use crate::repository::UserRepository;

/// Registration and login.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys, bcrypt_cost: u32) -> Self {
        Self {
            users,
            keys,
            bcrypt_cost,
        }
    }

    /// Creates a regular account and signs the caller in.
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(DuplicateRecord::new("Email already registered").into());
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost)?;
        let user = self
            .users
            .insert(NewUser {
                username: request.username,
                email: request.email,
                password_hash,
                role: UserRole::User,
            })
            .await?;
        log::info!("Registered user {}", user.id);

        Ok(AuthResponse {
            token: self.keys.generate_token(&user)?,
            user_id: user.id,
        })
    }

    /// Unknown emails and wrong passwords are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let credentials = match self.users.find_by_email(&request.email).await? {
            Some(credentials) => credentials,
            None => return Err(Unauthorized::new("Invalid credentials").into()),
        };
        if !verify_password(&request.password, &credentials.password_hash)? {
            return Err(Unauthorized::new("Invalid credentials").into());
        }

        Ok(AuthResponse {
            token: self.keys.generate_token(&credentials.user)?,
            user_id: credentials.user.id,
        })
    }
}
