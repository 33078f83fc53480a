use std::sync::Arc;

use crate::error::{AppError, Forbidden};
use crate::models::{User, UserRole};
use crate::repository::UserRepository;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Lists every account. Only administrators may see the directory, even
    /// when a route reaches this without the pipeline's admin check.
    pub async fn list(&self, caller: UserRole) -> Result<Vec<User>, AppError> {
        if caller != UserRole::Admin {
            return Err(Forbidden::default().into());
        }
        self.users.list().await
    }
}
