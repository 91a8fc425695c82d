use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use super::{sort_tasks, NewTask, Task, TaskError, TaskRepository, TaskUpdate};

type Item = HashMap<String, AttributeValue>;

/// Task repository over a DynamoDB table.
///
/// Layout: partition key `id`, global secondary index on `yearMonth`.
#[derive(Clone)]
pub struct DynamoTaskRepository {
    client: Client,
    table_name: String,
    year_month_index: String,
}

impl DynamoTaskRepository {
    pub fn new(client: Client, table_name: &str, year_month_index: &str) -> Self {
        DynamoTaskRepository {
            client,
            table_name: table_name.to_string(),
            year_month_index: year_month_index.to_string(),
        }
    }

    /// Build a client for `region` from the default credential chain
    pub async fn from_region(region: &str, table_name: &str, year_month_index: &str) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        DynamoTaskRepository::new(Client::new(&sdk_config), table_name, year_month_index)
    }

    async fn get(&self, id: &str) -> Result<Option<Task>, TaskError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| backend_error("GetItem", e))?;
        output.item().map(task_from_item).transpose()
    }

    async fn put(&self, task: &Task) -> Result<(), TaskError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(task_to_item(task)))
            .send()
            .await
            .map_err(|e| backend_error("PutItem", e))?;
        Ok(())
    }
}

fn backend_error(operation: &str, error: impl std::error::Error) -> TaskError {
    TaskError::Backend(format!("{operation} failed: {}", DisplayErrorContext(error)))
}

fn task_to_item(task: &Task) -> Item {
    let mut item = Item::new();
    item.insert("id".to_string(), AttributeValue::S(task.id.clone()));
    item.insert("title".to_string(), AttributeValue::S(task.title.clone()));
    if let Some(description) = &task.description {
        item.insert(
            "description".to_string(),
            AttributeValue::S(description.clone()),
        );
    }
    item.insert("date".to_string(), AttributeValue::S(task.date.to_string()));
    item.insert(
        "yearMonth".to_string(),
        AttributeValue::S(task.year_month.clone()),
    );
    if let Some(nome_cliente) = &task.nome_cliente {
        item.insert(
            "nomeCliente".to_string(),
            AttributeValue::S(nome_cliente.clone()),
        );
    }
    item.insert("completed".to_string(), AttributeValue::Bool(task.completed));
    item.insert(
        "createdAt".to_string(),
        AttributeValue::S(task.created_at.to_rfc3339()),
    );
    item.insert(
        "updatedAt".to_string(),
        AttributeValue::S(task.updated_at.to_rfc3339()),
    );
    item
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    item.get(name).and_then(|v| v.as_s().ok()).cloned()
}

fn required(item: &Item, name: &str) -> Result<String, TaskError> {
    string_attr(item, name)
        .ok_or_else(|| TaskError::Backend(format!("stored task is missing '{name}'")))
}

fn timestamp_attr(item: &Item, name: &str) -> Result<DateTime<Utc>, TaskError> {
    let raw = required(item, name)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TaskError::Backend(format!("stored task has bad '{name}': {e}")))
}

fn task_from_item(item: &Item) -> Result<Task, TaskError> {
    let date_raw = required(item, "date")?;
    let date = NaiveDate::parse_from_str(&date_raw, "%Y-%m-%d")
        .map_err(|e| TaskError::Backend(format!("stored task has bad 'date': {e}")))?;
    Ok(Task {
        id: required(item, "id")?,
        title: required(item, "title")?,
        description: string_attr(item, "description"),
        date,
        year_month: required(item, "yearMonth")?,
        nome_cliente: string_attr(item, "nomeCliente"),
        completed: item
            .get("completed")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false),
        created_at: timestamp_attr(item, "createdAt")?,
        updated_at: timestamp_attr(item, "updatedAt")?,
    })
}

#[async_trait]
impl TaskRepository for DynamoTaskRepository {
    async fn list(
        &self,
        year_month: &str,
        nome_cliente: Option<&str>,
    ) -> Result<Vec<Task>, TaskError> {
        let mut tasks = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.year_month_index)
                .key_condition_expression("yearMonth = :ym")
                .expression_attribute_values(":ym", AttributeValue::S(year_month.to_string()))
                .set_exclusive_start_key(start_key.take());
            if let Some(client) = nome_cliente {
                request = request
                    .filter_expression("nomeCliente = :client")
                    .expression_attribute_values(":client", AttributeValue::S(client.to_string()));
            }

            let output = request
                .send()
                .await
                .map_err(|e| backend_error("Query", e))?;
            for item in output.items() {
                tasks.push(task_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!(year_month, count = tasks.len(), "agenda_tasks_listed");
        sort_tasks(&mut tasks);
        Ok(tasks)
    }

    async fn create(&self, new: NewTask) -> Result<Task, TaskError> {
        let task = Task::create(new, Utc::now())?;
        self.put(&task).await?;
        Ok(task)
    }

    async fn update(&self, id: &str, update: TaskUpdate) -> Result<Task, TaskError> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| TaskError::NotFound(id.to_string()))?;
        task.apply(update, Utc::now())?;
        self.put(&task).await?;
        Ok(task)
    }

    async fn delete(&self, id: &str) -> Result<(), TaskError> {
        let output = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .return_values(ReturnValue::AllOld)
            .send()
            .await
            .map_err(|e| backend_error("DeleteItem", e))?;
        match output.attributes() {
            Some(old) if !old.is_empty() => Ok(()),
            _ => Err(TaskError::NotFound(id.to_string())),
        }
    }
}
