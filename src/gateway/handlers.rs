use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::auth::Caller;
use super::error::ApiError;
use crate::provisioning::{ResourceGroupRequest, SqlServerRequest, StorageAccountRequest};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddResourceGroupQuery {
    pub resource_group_name: String,
    pub region: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSqlServerQuery {
    pub server_name: String,
    pub region: String,
    pub admin_user_name: String,
    pub admin_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStorageAccountQuery {
    pub storage_account_name: String,
    pub resource_group_name: String,
    pub region: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageAccountCreated {
    pub message: String,
    pub connection_string: String,
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn add_resource_group(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<AddResourceGroupQuery>,
) -> Result<String, ApiError> {
    info!(caller = %caller.subject, resource_group = %query.resource_group_name, region = %query.region, "adding resource group");

    state
        .provisioner
        .create_resource_group(ResourceGroupRequest::new(
            &query.resource_group_name,
            &query.region,
        ))
        .await
        .map_err(|e| ApiError::provisioning("creating the resource group", e))?;

    Ok(format!(
        "Resource group '{}' creation initiated successfully in region '{}'.",
        query.resource_group_name, query.region
    ))
}

pub async fn create_sql_server(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<CreateSqlServerQuery>,
) -> Result<String, ApiError> {
    info!(caller = %caller.subject, server = %query.server_name, region = %query.region, "creating SQL server");

    state
        .provisioner
        .create_sql_server(SqlServerRequest::new(
            query.server_name,
            query.region,
            query.admin_user_name,
            query.admin_password,
        ))
        .await
        .map_err(|e| ApiError::provisioning("creating the SQL server", e))?;

    Ok("SQL Server Successfully Created.".to_string())
}

pub async fn add_storage_account(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<AddStorageAccountQuery>,
) -> Result<Json<StorageAccountCreated>, ApiError> {
    info!(caller = %caller.subject, storage_account = %query.storage_account_name, resource_group = %query.resource_group_name, "adding storage account");

    let connection_string = state
        .provisioner
        .create_storage_account(StorageAccountRequest::new(
            &query.storage_account_name,
            &query.resource_group_name,
            &query.region,
        ))
        .await
        .map_err(|e| ApiError::provisioning("creating the storage account", e))?;

    Ok(Json(StorageAccountCreated {
        message: format!(
            "Storage account '{}' created successfully in region '{}'.",
            query.storage_account_name, query.region
        ),
        connection_string,
    }))
}
