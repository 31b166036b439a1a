//! Resource operations: each one acquires a management token, builds the provider payload from
//! the caller's parameters and fixed defaults, and creates or updates the resource.

pub mod resource_group;
pub mod sql_server;
pub mod storage_account;

pub use resource_group::ResourceGroupRequest;
pub use sql_server::SqlServerRequest;
pub use storage_account::StorageAccountRequest;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::arm::{ArmClient, ArmError, ResourceId};
use crate::config::{PollingConfig, ResourceConfig};
use crate::credential::{CredentialError, RefreshingCredential};
use crate::http_client::HttpClient;
use crate::{TokenRetriever, TokenRetrieverError};

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("acquiring management token: `{0}`")]
    Auth(#[from] TokenRetrieverError),
    #[error("management credential: `{0}`")]
    Credential(#[from] CredentialError),
    #[error("resource manager: `{0}`")]
    Arm(ArmError),
    #[error("no access keys returned for storage account `{0}`")]
    NoKeysFound(String),
}

impl From<ArmError> for ProvisionError {
    fn from(error: ArmError) -> Self {
        match error {
            ArmError::Credential(e) => ProvisionError::Credential(e),
            other => ProvisionError::Arm(other),
        }
    }
}

/// Operations offered by the gateway.
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    async fn create_resource_group(
        &self,
        request: ResourceGroupRequest,
    ) -> Result<(), ProvisionError>;

    /// Returns the fully qualified domain name of the server, when reported.
    async fn create_sql_server(
        &self,
        request: SqlServerRequest,
    ) -> Result<Option<String>, ProvisionError>;

    /// Returns the connection string of the account.
    async fn create_storage_account(
        &self,
        request: StorageAccountRequest,
    ) -> Result<String, ProvisionError>;
}

/// Provisions resources in the configured subscription with a client-credentials token.
pub struct Provisioner<R, C> {
    token_retriever: R,
    http_client: C,
    resources: ResourceConfig,
    polling: PollingConfig,
}

impl<R, C> Provisioner<R, C>
where
    R: TokenRetriever,
    C: HttpClient,
{
    pub fn new(
        token_retriever: R,
        http_client: C,
        resources: ResourceConfig,
        polling: PollingConfig,
    ) -> Self {
        Self {
            token_retriever,
            http_client,
            resources,
            polling,
        }
    }

    /// Acquires a fresh (or cached) token and binds a Resource Manager client to it. The client
    /// goes back to the token provider whenever the token is about to expire.
    async fn arm_client(
        &self,
    ) -> Result<ArmClient<'_, C, RefreshingCredential<'_, R>>, ProvisionError> {
        let token = self.token_retriever.retrieve().await?;
        Ok(ArmClient::new(
            &self.http_client,
            RefreshingCredential::new(&self.token_retriever, token),
            &self.resources.arm_endpoint,
            &self.polling,
        ))
    }

    fn resource_group_id(&self, resource_group_name: &str) -> ResourceId {
        ResourceId::resource_group(&self.resources.subscription_id, resource_group_name)
    }
}

#[async_trait]
impl<R, C> ResourceProvisioner for Provisioner<R, C>
where
    R: TokenRetriever,
    C: HttpClient,
{
    async fn create_resource_group(
        &self,
        request: ResourceGroupRequest,
    ) -> Result<(), ProvisionError> {
        let client = self.arm_client().await?;
        let id = self.resource_group_id(&request.name);

        resource_group::create(&client, &id, &request)
            .await
            .inspect(|_| {
                info!(resource_group = %request.name, region = %request.region, "resource group created")
            })
            .inspect_err(|e| {
                warn!(resource_group = %request.name, "resource group creation failed: {e}")
            })
    }

    async fn create_sql_server(
        &self,
        request: SqlServerRequest,
    ) -> Result<Option<String>, ProvisionError> {
        let client = self.arm_client().await?;
        let id = self
            .resource_group_id(&self.resources.resource_group_name)
            .provider_resource(sql_server::RESOURCE_TYPE, &request.name);

        sql_server::create(&client, &id, &request)
            .await
            .inspect(|fqdn| {
                info!(
                    server = %request.name,
                    fqdn = fqdn.as_deref().unwrap_or_default(),
                    "SQL server created"
                )
            })
            .inspect_err(|e| warn!(server = %request.name, "SQL server creation failed: {e}"))
    }

    async fn create_storage_account(
        &self,
        request: StorageAccountRequest,
    ) -> Result<String, ProvisionError> {
        let client = self.arm_client().await?;
        let id = self
            .resource_group_id(&request.resource_group_name)
            .provider_resource(storage_account::RESOURCE_TYPE, &request.name);

        storage_account::create(&client, &id, &request)
            .await
            .inspect(|_| info!(storage_account = %request.name, "storage account created"))
            .inspect_err(|e| {
                warn!(storage_account = %request.name, "storage account creation failed: {e}")
            })
    }
}
