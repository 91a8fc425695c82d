//! Agenda Handlers
//!
//! Task CRUD over the configured [`TaskRepository`](crate::agenda::TaskRepository).

use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};

use crate::agenda::{parse_year_month, NewTask, Task, TaskUpdate};
use crate::api::dto::TaskListQuery;
use crate::api::error::RestError;
use crate::api::AppState;

/// List the tasks of a month
pub async fn list_tasks(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<TaskListQuery>,
) -> Result<Json<Vec<Task>>, RestError> {
    let year_month = params
        .year_month
        .ok_or_else(|| RestError::bad_request("yearMonth is required"))?;
    let year_month = parse_year_month(&year_month)?;
    let nome_cliente = params.nome_cliente.filter(|c| !c.trim().is_empty());

    let tasks = state
        .tasks
        .list(&year_month, nome_cliente.as_deref())
        .await?;
    Ok(Json(tasks))
}

/// Create a task
pub async fn create_task(
    Extension(state): Extension<Arc<AppState>>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), RestError> {
    let task = state.tasks.create(new).await?;
    tracing::info!(task_id = %task.id, year_month = %task.year_month, "agenda_task_created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// Update a task
pub async fn update_task(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Json<Task>, RestError> {
    let task = state.tasks.update(&id, update).await?;
    Ok(Json(task))
}

/// Delete a task
pub async fn delete_task(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, RestError> {
    state.tasks.delete(&id).await?;
    tracing::info!(task_id = %id, "agenda_task_deleted");
    Ok(StatusCode::NO_CONTENT)
}
