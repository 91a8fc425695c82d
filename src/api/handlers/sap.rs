//! SAP Reference Handlers
//!
//! Client and SID lists, read from the SAP namespace through the query client.

use std::sync::Arc;

use axum::{extract::Query, Extension, Json};

use crate::api::dto::SidListQuery;
use crate::api::error::RestError;
use crate::api::AppState;
use crate::cache::{ClientRecord, SidRecord};
use crate::query::{QueryOptions, ResultRow};

/// Quote a value as a SQL string literal
pub fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn clients_query(table: &str) -> String {
    format!("SELECT DISTINCT nomecliente FROM {table} ORDER BY nomecliente")
}

pub fn sids_query(table: &str, client_name: &str) -> String {
    format!(
        "SELECT DISTINCT sid, nomecliente FROM {table} WHERE nomecliente = {} ORDER BY sid",
        sql_literal(client_name)
    )
}

fn take(row: &mut ResultRow, column: &str) -> String {
    row.shift_remove(column).unwrap_or_default()
}

/// List all SAP clients
pub async fn list_clients(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<ClientRecord>>, RestError> {
    let rows = state
        .queries
        .run_sap_query(&clients_query(&state.reference_table), &QueryOptions::default())
        .await?;

    let clients = rows
        .into_iter()
        .map(|mut row| ClientRecord {
            nomecliente: take(&mut row, "nomecliente"),
        })
        .collect();
    Ok(Json(clients))
}

/// List the SIDs of one client
pub async fn list_sids(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SidListQuery>,
) -> Result<Json<Vec<SidRecord>>, RestError> {
    let client_name = params
        .client_name
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| RestError::bad_request("clientName is required"))?;

    let rows = state
        .queries
        .run_sap_query(
            &sids_query(&state.reference_table, &client_name),
            &QueryOptions::default(),
        )
        .await?;

    let sids = rows
        .into_iter()
        .map(|mut row| SidRecord {
            sid: take(&mut row, "sid"),
            nomecliente: take(&mut row, "nomecliente"),
        })
        .collect();
    Ok(Json(sids))
}
