#![allow(dead_code)]

use actix_http::Request;
use actix_web::{body::MessageBody, dev::Service, dev::ServiceResponse, test, Error};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use todo_api::auth::{hash_password, AuthResponse};
use todo_api::config::{Config, CorsPolicy, Environment};
use todo_api::models::{NewUser, Task, TaskQuery, UserRole};
use todo_api::repository::{
    InMemoryTaskRepository, InMemoryUserRepository, TaskRepository, UserRepository,
};
use todo_api::{AppContext, AppError};

pub const ALLOWED_ORIGIN: &str = "https://app.example";
pub const PASSWORD: &str = "Password123!";

pub fn config(environment: Environment) -> Config {
    Config {
        environment,
        database_url: None,
        database_connect_attempts: 1,
        server_port: 0,
        server_host: "127.0.0.1".to_string(),
        jwt_secret: "integration_test_secret".to_string(),
        jwt_expiration_hours: 1,
        bcrypt_cost: 4,
        cors: CorsPolicy::Origins(vec![ALLOWED_ORIGIN.to_string()]),
        https_port: None,
    }
}

pub fn context(environment: Environment) -> AppContext {
    context_with(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::new(InMemoryUserRepository::new()),
        environment,
    )
}

pub fn context_with(
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserRepository>,
    environment: Environment,
) -> AppContext {
    AppContext::new(tasks, users, &config(environment))
}

/// Stores an administrator directly, bypassing registration.
pub async fn seed_admin(users: &dyn UserRepository, email: &str) {
    users
        .insert(NewUser {
            username: "admin".to_string(),
            email: email.to_string(),
            password_hash: hash_password(PASSWORD, 4).unwrap(),
            role: UserRole::Admin,
        })
        .await
        .unwrap();
}

pub async fn register<S, B>(app: &S, username: &str, email: &str) -> AuthResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "username": username, "email": email, "password": PASSWORD }))
        .to_request();
    test::call_and_read_body_json(app, req).await
}

pub async fn login<S, B>(app: &S, email: &str) -> AuthResponse
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": PASSWORD }))
        .to_request();
    test::call_and_read_body_json(app, req).await
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

/// A store whose every call fails the way an unreachable database does.
pub struct FailingTasks;

fn unavailable() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl TaskRepository for FailingTasks {
    async fn list(&self, _owner: i32, _query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        Err(unavailable())
    }

    async fn find(&self, _id: Uuid) -> Result<Option<Task>, AppError> {
        Err(unavailable())
    }

    async fn insert(&self, _task: &Task) -> Result<Task, AppError> {
        Err(unavailable())
    }

    async fn update(&self, _task: &Task) -> Result<Option<Task>, AppError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: Uuid, _owner: i32) -> Result<bool, AppError> {
        Err(unavailable())
    }
}

/// In-memory store that records how often it was reached.
#[derive(Default)]
pub struct CountingTasks {
    inner: InMemoryTaskRepository,
    calls: AtomicUsize,
}

impl CountingTasks {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskRepository for CountingTasks {
    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.hit();
        self.inner.list(owner, query).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        self.hit();
        self.inner.find(id).await
    }

    async fn insert(&self, task: &Task) -> Result<Task, AppError> {
        self.hit();
        self.inner.insert(task).await
    }

    async fn update(&self, task: &Task) -> Result<Option<Task>, AppError> {
        self.hit();
        self.inner.update(task).await
    }

    async fn delete(&self, id: Uuid, owner: i32) -> Result<bool, AppError> {
        self.hit();
        self.inner.delete(id, owner).await
    }
}

/// A store that panics on listing, as a mapping bug deep in a handler would.
pub struct PanickingTasks;

#[async_trait]
impl TaskRepository for PanickingTasks {
    async fn list(&self, _owner: i32, _query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        panic!("task row could not be mapped")
    }

    async fn find(&self, _id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(None)
    }

    async fn insert(&self, task: &Task) -> Result<Task, AppError> {
        Ok(task.clone())
    }

    async fn update(&self, _task: &Task) -> Result<Option<Task>, AppError> {
        Ok(None)
    }

    async fn delete(&self, _id: Uuid, _owner: i32) -> Result<bool, AppError> {
        Ok(false)
    }
}
