use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TaskRepository, UserRepository};
use crate::error::{AppError, DuplicateRecord};
use crate::models::{NewUser, Task, TaskQuery, User, UserCredentials};

/// Process-local task store. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryTaskRepository {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|task| task.user_id == owner && query.matches(task))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn insert(&self, task: &Task) -> Result<Task, AppError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(DuplicateRecord::default().into());
        }
        tasks.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn update(&self, task: &Task) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(stored) if stored.user_id == task.user_id => {
                *stored = task.clone();
                Ok(Some(stored.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid, owner: i32) -> Result<bool, AppError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get(&id) {
            Some(task) if task.user_id == owner => {
                tasks.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct UserTable {
    rows: Vec<UserCredentials>,
    last_id: i32,
}

/// Process-local account store. Emails are unique, ids are sequential.
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, AppError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .find(|row| row.user.email == email)
            .cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let mut table = self.table.write().await;
        if table.rows.iter().any(|row| row.user.email == user.email) {
            return Err(DuplicateRecord::default().into());
        }
        table.last_id += 1;
        let stored = User {
            id: table.last_id,
            username: user.username,
            email: user.email,
            role: user.role,
            created_at: Utc::now(),
        };
        table.rows.push(UserCredentials {
            user: stored.clone(),
            password_hash: user.password_hash,
        });
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let table = self.table.read().await;
        Ok(table.rows.iter().map(|row| row.user.clone()).collect())
    }
}
