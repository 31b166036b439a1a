//! HTTP surface of the gateway.

pub mod auth;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::provisioning::ResourceProvisioner;
use auth::Authorize;

pub const ADD_RESOURCE_GROUP_PATH: &str = "/api/AzureManagement/AddResourceGroup";
pub const CREATE_SQL_SERVER_PATH: &str = "/api/AzureManagement/CreateSqlServer";
pub const ADD_STORAGE_ACCOUNT_PATH: &str = "/api/AzureManagement/AddStorageAccount";

#[derive(Clone)]
pub struct AppState {
    pub provisioner: Arc<dyn ResourceProvisioner>,
    pub authorizer: Arc<dyn Authorize>,
}

impl AppState {
    pub fn new(provisioner: Arc<dyn ResourceProvisioner>, authorizer: Arc<dyn Authorize>) -> Self {
        Self {
            provisioner,
            authorizer,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route(ADD_RESOURCE_GROUP_PATH, post(handlers::add_resource_group))
        .route(CREATE_SQL_SERVER_PATH, post(handlers::create_sql_server))
        .route(ADD_STORAGE_ACCOUNT_PATH, post(handlers::add_storage_account))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::http_layer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
