//! Persistence ports.
//!
//! Services depend on these traits only; the process wires either the
//! PostgreSQL implementations or the in-memory ones at startup.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewUser, Task, TaskQuery, User, UserCredentials};

pub use memory::{InMemoryTaskRepository, InMemoryUserRepository};
pub use postgres::{PgTaskRepository, PgUserRepository};

#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks owned by `owner` matching `query`, newest first.
    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError>;

    async fn find(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    async fn insert(&self, task: &Task) -> Result<Task, AppError>;

    /// Persists the editable fields of `task`. `None` when the row is gone.
    async fn update(&self, task: &Task) -> Result<Option<Task>, AppError>;

    /// Removes the task if `owner` owns it. Returns whether a row was deleted.
    async fn delete(&self, id: Uuid, owner: i32) -> Result<bool, AppError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError>;

    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;
}
