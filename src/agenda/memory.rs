use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{sort_tasks, NewTask, Task, TaskError, TaskRepository, TaskUpdate};

/// Process-local task repository
#[derive(Debug, Default)]
pub struct MemoryTaskRepository {
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        MemoryTaskRepository::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn list(
        &self,
        year_month: &str,
        nome_cliente: Option<&str>,
    ) -> Result<Vec<Task>, TaskError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .values()
            .filter(|t| t.matches(year_month, nome_cliente))
            .cloned()
            .collect();
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn create(&self, new: NewTask) -> Result<Task, TaskError> {
        let task = Task::create(new, Utc::now())?;
        self.tasks.write().insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, TaskError> {
        let mut tasks = self.tasks.write();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.apply(update, Utc::now())?;
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), TaskError> {
        self.tasks
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| TaskError::NotFound(id.to_string()))
    }
}
