use std::collections::BTreeMap;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ProvisionError;
use crate::arm::{ArmClient, ResourceId, default_tags};
use crate::credential::TokenCredential;
use crate::http_client::HttpClient;

pub const RESOURCE_TYPE: &str = "Microsoft.Storage/storageAccounts";
pub const API_VERSION: &str = "2023-01-01";
const ENDPOINT_SUFFIX: &str = "core.windows.net";

#[derive(Debug, Clone, PartialEq)]
pub struct StorageAccountRequest {
    pub name: String,
    pub resource_group_name: String,
    pub region: String,
}

impl StorageAccountRequest {
    pub fn new(
        name: impl Into<String>,
        resource_group_name: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group_name: resource_group_name.into(),
            region: region.into(),
        }
    }
}

/// Connection string of a storage account authenticated with an account key.
pub fn connection_string(account_name: &str, account_key: &str) -> String {
    format!(
        "DefaultEndpointsProtocol=https;AccountName={account_name};AccountKey={account_key};EndpointSuffix={ENDPOINT_SUFFIX}"
    )
}

#[derive(Serialize)]
struct StorageAccountPayload<'a> {
    sku: Sku,
    kind: &'static str,
    location: &'a str,
    tags: BTreeMap<String, String>,
    properties: StorageAccountProperties,
}

#[derive(Serialize)]
struct Sku {
    name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageAccountProperties {
    access_tier: &'static str,
    allow_blob_public_access: bool,
    allow_shared_key_access: bool,
    minimum_tls_version: &'static str,
    allow_cross_tenant_replication: bool,
    dns_endpoint_type: &'static str,
    #[serde(rename = "defaultToOAuthAuthentication")]
    default_to_oauth_authentication: bool,
    public_network_access: &'static str,
}

impl Default for StorageAccountProperties {
    fn default() -> Self {
        Self {
            access_tier: "Hot",
            allow_blob_public_access: true,
            allow_shared_key_access: true,
            minimum_tls_version: "TLS1_2",
            allow_cross_tenant_replication: true,
            dns_endpoint_type: "Standard",
            default_to_oauth_authentication: false,
            public_network_access: "Enabled",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountKeys {
    #[serde(default)]
    keys: Vec<AccountKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountKey {
    #[serde(default)]
    key_name: String,
    #[serde(default)]
    value: String,
}

pub(super) async fn create<C, K>(
    client: &ArmClient<'_, C, K>,
    id: &ResourceId,
    request: &StorageAccountRequest,
) -> Result<String, ProvisionError>
where
    C: HttpClient,
    K: TokenCredential,
{
    let payload = StorageAccountPayload {
        sku: Sku {
            name: "Standard_RAGRS",
        },
        kind: "StorageV2",
        location: &request.region,
        tags: default_tags(),
        properties: StorageAccountProperties::default(),
    };
    client
        .create_or_update::<_, IgnoredAny>(id, API_VERSION, &payload)
        .await?;

    let account_keys: AccountKeys = client.post_action(id, "listKeys", API_VERSION).await?;
    let key = account_keys
        .keys
        .into_iter()
        .next()
        .filter(|key| !key.value.is_empty())
        .ok_or_else(|| ProvisionError::NoKeysFound(request.name.clone()))?;
    debug!(storage_account = %request.name, key_name = %key.key_name, "using account key");

    Ok(connection_string(&request.name, &key.value))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use httpmock::Method::{POST, PUT};
    use httpmock::MockServer;
    use serde_json::{Value, json};

    use super::*;
    use crate::provisioning::ResourceProvisioner;
    use crate::provisioning::tests::{provisioner, token_retriever};

    const ACCOUNT_PATH: &str = "/subscriptions/sub-id/resourceGroups/rg-data/providers/Microsoft.Storage/storageAccounts/store1";

    async fn mock_account(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(ACCOUNT_PATH)
                    .query_param("api-version", "2023-01-01");
                then.status(200).json_body(json!({
                    "name": "store1",
                    "properties": {"provisioningState": "Succeeded"}
                }));
            })
            .await;
    }

    async fn mock_keys(server: &MockServer, keys: Value) {
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(format!("{ACCOUNT_PATH}/listKeys"))
                    .query_param("api-version", "2023-01-01")
                    .header("authorization", "Bearer arm-token");
                then.status(200).json_body(json!({ "keys": keys }));
            })
            .await;
    }

    #[tokio::test]
    async fn returns_connection_string_of_first_key() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(ACCOUNT_PATH)
                    .json_body(json!({
                        "sku": {"name": "Standard_RAGRS"},
                        "kind": "StorageV2",
                        "location": "eastus",
                        "tags": {"Environment": "Dev"},
                        "properties": {
                            "accessTier": "Hot",
                            "allowBlobPublicAccess": true,
                            "allowSharedKeyAccess": true,
                            "minimumTlsVersion": "TLS1_2",
                            "allowCrossTenantReplication": true,
                            "dnsEndpointType": "Standard",
                            "defaultToOAuthAuthentication": false,
                            "publicNetworkAccess": "Enabled"
                        }
                    }));
                then.status(200).json_body(json!({
                    "name": "store1",
                    "properties": {"provisioningState": "Succeeded"}
                }));
            })
            .await;
        mock_keys(
            &server,
            json!([
                {"keyName": "key1", "value": "a2V5MQ==", "permissions": "FULL"},
                {"keyName": "key2", "value": "a2V5Mg==", "permissions": "FULL"}
            ]),
        )
        .await;

        let provisioner = provisioner(&server, token_retriever());
        let connection_string = provisioner
            .create_storage_account(StorageAccountRequest::new("store1", "rg-data", "eastus"))
            .await
            .unwrap();

        put.assert_async().await;
        assert_eq!(
            connection_string,
            "DefaultEndpointsProtocol=https;AccountName=store1;AccountKey=a2V5MQ==;EndpointSuffix=core.windows.net"
        );
    }

    #[tokio::test]
    async fn no_keys_found() {
        let server = MockServer::start_async().await;
        mock_account(&server).await;
        mock_keys(&server, json!([])).await;

        let provisioner = provisioner(&server, token_retriever());
        let result = provisioner
            .create_storage_account(StorageAccountRequest::new("store1", "rg-data", "eastus"))
            .await;

        assert_matches!(result, Err(ProvisionError::NoKeysFound(name)) => {
            assert_eq!(name, "store1");
        });
    }

    #[tokio::test]
    async fn empty_first_key_is_not_used() {
        let server = MockServer::start_async().await;
        mock_account(&server).await;
        mock_keys(&server, json!([{"keyName": "key1", "value": ""}])).await;

        let provisioner = provisioner(&server, token_retriever());
        let result = provisioner
            .create_storage_account(StorageAccountRequest::new("store1", "rg-data", "eastus"))
            .await;

        assert_matches!(result, Err(ProvisionError::NoKeysFound(_)));
    }

    #[test]
    fn connection_string_template() {
        assert_eq!(
            connection_string("acct", "k3y=="),
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=k3y==;EndpointSuffix=core.windows.net"
        );
    }
}
