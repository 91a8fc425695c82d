//! Agenda Module
//!
//! Calendar tasks shown next to the SAP reports. Tasks are grouped by
//! month (`yearMonth`, derived from the task date) and optionally tagged
//! with a client name.

mod dynamo;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub use dynamo::DynamoTaskRepository;
pub use memory::MemoryTaskRepository;

/// Agenda errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Request data failed validation
    #[error("Invalid task: {0}")]
    Invalid(String),

    /// The storage backend failed
    #[error("Task storage error: {0}")]
    Backend(String),
}

/// A stored task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: NaiveDate,
    pub year_month: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /api/agenda/tasks`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub date: NaiveDate,
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `PUT /api/agenda/tasks/:id`; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub nome_cliente: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

/// `YYYY-MM` of a date
pub fn year_month_of(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Validate a `YYYY-MM` string
pub fn parse_year_month(value: &str) -> Result<String, TaskError> {
    let valid = value.len() == 7
        && NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").is_ok();
    if valid {
        Ok(value.to_string())
    } else {
        Err(TaskError::Invalid(format!(
            "yearMonth must look like YYYY-MM, got '{value}'"
        )))
    }
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::Invalid("title must not be empty".to_string()));
    }
    Ok(())
}

impl Task {
    /// Build a stored task from a creation request
    pub fn create(new: NewTask, now: DateTime<Utc>) -> Result<Self, TaskError> {
        validate_title(&new.title)?;
        Ok(Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: new.title,
            description: new.description,
            year_month: year_month_of(new.date),
            date: new.date,
            nome_cliente: new.nome_cliente.filter(|n| !n.trim().is_empty()),
            completed: new.completed,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply the present fields of `update`
    pub fn apply(&mut self, update: TaskUpdate, now: DateTime<Utc>) -> Result<(), TaskError> {
        if let Some(title) = update.title {
            validate_title(&title)?;
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(date) = update.date {
            self.date = date;
            self.year_month = year_month_of(date);
        }
        if let Some(nome_cliente) = update.nome_cliente {
            self.nome_cliente = Some(nome_cliente).filter(|n| !n.trim().is_empty());
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        self.updated_at = now;
        Ok(())
    }

    fn matches(&self, year_month: &str, nome_cliente: Option<&str>) -> bool {
        self.year_month == year_month
            && nome_cliente.map_or(true, |c| self.nome_cliente.as_deref() == Some(c))
    }
}

/// Listing order: date, then title
pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.title.cmp(&b.title)));
}

/// Task persistence
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks of one month, optionally only one client's
    async fn list(&self, year_month: &str, nome_cliente: Option<&str>)
        -> Result<Vec<Task>, TaskError>;

    async fn create(&self, new: NewTask) -> Result<Task, TaskError>;

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, TaskError>;

    async fn delete(&self, id: &str) -> Result<(), TaskError>;
}
