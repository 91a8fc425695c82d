//! Agenda repository tests through the `TaskRepository` trait.

use std::sync::Arc;

use chrono::NaiveDate;
use sapdash::agenda::{
    parse_year_month, year_month_of, MemoryTaskRepository, NewTask, TaskError, TaskRepository,
    TaskUpdate,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_task(title: &str, on: NaiveDate, client: Option<&str>) -> NewTask {
    NewTask {
        title: title.to_string(),
        description: None,
        date: on,
        nome_cliente: client.map(str::to_string),
        completed: false,
    }
}

fn repository() -> Arc<dyn TaskRepository> {
    Arc::new(MemoryTaskRepository::new())
}

#[tokio::test]
async fn test_list_is_ordered_by_date_then_title() {
    let repo = repository();
    repo.create(new_task("Zeta", date(2024, 6, 1), None)).await.unwrap();
    repo.create(new_task("Alpha", date(2024, 6, 20), None)).await.unwrap();
    repo.create(new_task("Beta", date(2024, 6, 1), None)).await.unwrap();

    let titles: Vec<String> = repo
        .list("2024-06", None)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();

    assert_eq!(titles, vec!["Beta", "Zeta", "Alpha"]);
}

#[tokio::test]
async fn test_moving_date_moves_month() {
    let repo = repository();
    let task = repo
        .create(new_task("Go-live", date(2024, 1, 31), Some("ACME")))
        .await
        .unwrap();

    let update = TaskUpdate {
        date: Some(date(2024, 2, 1)),
        ..TaskUpdate::default()
    };
    let moved = repo.update(&task.id, update).await.unwrap();

    assert_eq!(moved.year_month, "2024-02");
    assert!(moved.updated_at >= moved.created_at);
    assert!(repo.list("2024-01", None).await.unwrap().is_empty());
    assert_eq!(repo.list("2024-02", Some("ACME")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_client_is_stored_as_none() {
    let repo = repository();
    let task = repo
        .create(new_task("Housekeeping", date(2024, 7, 3), Some("  ")))
        .await
        .unwrap();

    assert_eq!(task.nome_cliente, None);
    assert!(repo.list("2024-07", Some("ACME")).await.unwrap().is_empty());
    assert_eq!(repo.list("2024-07", None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_twice_is_not_found() {
    let repo = repository();
    let task = repo
        .create(new_task("Once", date(2024, 8, 8), None))
        .await
        .unwrap();

    repo.delete(&task.id).await.unwrap();
    assert_eq!(
        repo.delete(&task.id).await,
        Err(TaskError::NotFound(task.id.clone()))
    );
}

#[tokio::test]
async fn test_ids_are_unique() {
    let repo = repository();
    let a = repo.create(new_task("A", date(2024, 9, 1), None)).await.unwrap();
    let b = repo.create(new_task("A", date(2024, 9, 1), None)).await.unwrap();
    assert_ne!(a.id, b.id);
}

#[test]
fn test_year_month_helpers() {
    assert_eq!(year_month_of(date(2024, 12, 31)), "2024-12");
    assert!(parse_year_month("2024-12").is_ok());
    assert!(parse_year_month("2024-1").is_err());
    assert!(parse_year_month("2024-00").is_err());
    assert!(parse_year_month("").is_err());
}
