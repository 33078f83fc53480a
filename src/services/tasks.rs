use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, RecordNotFound};
use crate::models::{Task, TaskInput, TaskQuery};
use crate::repository::TaskRepository;

/// Task use cases. Every operation is scoped to the owning user; tasks owned
/// by someone else are reported exactly like missing ones.
#[derive(Clone)]
pub struct TaskService {
    repository: Arc<dyn TaskRepository>,
}

impl TaskService {
    pub fn new(repository: Arc<dyn TaskRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, owner: i32, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        self.repository.list(owner, query).await
    }

    pub async fn get(&self, owner: i32, id: Uuid) -> Result<Task, AppError> {
        match self.repository.find(id).await? {
            Some(task) if task.user_id == owner => Ok(task),
            _ => Err(RecordNotFound::new("Task not found").into()),
        }
    }

    pub async fn create(&self, owner: i32, input: TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        let task = Task::new(input, owner);
        self.repository.insert(&task).await
    }

    pub async fn update(&self, owner: i32, id: Uuid, input: TaskInput) -> Result<Task, AppError> {
        input.validate()?;
        let mut task = match self.repository.find(id).await? {
            Some(task) if task.user_id == owner => task,
            _ => return Err(RecordNotFound::default().into()),
        };
        task.apply(input);
        self.repository
            .update(&task)
            .await?
            .ok_or_else(|| RecordNotFound::default().into())
    }

    pub async fn delete(&self, owner: i32, id: Uuid) -> Result<(), AppError> {
        if self.repository.delete(id, owner).await? {
            Ok(())
        } else {
            Err(RecordNotFound::new("The record you are trying to delete is not found").into())
        }
    }
}
