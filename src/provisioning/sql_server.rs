use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ProvisionError;
use crate::arm::{ArmClient, ResourceId, default_tags};
use crate::credential::TokenCredential;
use crate::http_client::HttpClient;

pub const RESOURCE_TYPE: &str = "Microsoft.Sql/servers";
pub const API_VERSION: &str = "2021-11-01";
const SERVER_VERSION: &str = "12.0";

/// SQL server in the configured default resource group. The administrator credentials are passed
/// through as received.
#[derive(Clone, PartialEq)]
pub struct SqlServerRequest {
    pub name: String,
    pub region: String,
    pub admin_user_name: String,
    pub admin_password: String,
}

impl SqlServerRequest {
    pub fn new(
        name: impl Into<String>,
        region: impl Into<String>,
        admin_user_name: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            admin_user_name: admin_user_name.into(),
            admin_password: admin_password.into(),
        }
    }
}

impl fmt::Debug for SqlServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlServerRequest")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("admin_user_name", &self.admin_user_name)
            .field("admin_password", &"<hidden>")
            .finish()
    }
}

#[derive(Serialize)]
struct SqlServerPayload<'a> {
    location: &'a str,
    tags: BTreeMap<String, String>,
    identity: Identity,
    properties: SqlServerProperties<'a>,
}

#[derive(Serialize)]
struct Identity {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SqlServerProperties<'a> {
    administrator_login: &'a str,
    administrator_login_password: &'a str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct SqlServer {
    #[serde(default)]
    properties: Option<SqlServerState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SqlServerState {
    #[serde(default)]
    fully_qualified_domain_name: Option<String>,
}

pub(super) async fn create<C, K>(
    client: &ArmClient<'_, C, K>,
    id: &ResourceId,
    request: &SqlServerRequest,
) -> Result<Option<String>, ProvisionError>
where
    C: HttpClient,
    K: TokenCredential,
{
    let payload = SqlServerPayload {
        location: &request.region,
        tags: default_tags(),
        identity: Identity {
            kind: "SystemAssigned",
        },
        properties: SqlServerProperties {
            administrator_login: &request.admin_user_name,
            administrator_login_password: &request.admin_password,
            version: SERVER_VERSION,
        },
    };

    let server: Option<SqlServer> = client.create_or_update(id, API_VERSION, &payload).await?;

    Ok(server
        .and_then(|server| server.properties)
        .and_then(|properties| properties.fully_qualified_domain_name))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use httpmock::{Method::PUT, MockServer};
    use serde_json::json;

    use super::*;
    use crate::arm::ArmError;
    use crate::provisioning::ResourceProvisioner;
    use crate::provisioning::tests::{provisioner, token_retriever};

    const SERVER_PATH: &str =
        "/subscriptions/sub-id/resourceGroups/rg-default/providers/Microsoft.Sql/servers/sql1";

    #[tokio::test]
    async fn creates_server_in_the_default_resource_group() {
        let server = MockServer::start_async().await;
        let put = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(SERVER_PATH)
                    .query_param("api-version", "2021-11-01")
                    .header("authorization", "Bearer arm-token")
                    .json_body(json!({
                        "location": "westeurope",
                        "tags": {"Environment": "Dev"},
                        "identity": {"type": "SystemAssigned"},
                        "properties": {
                            "administratorLogin": "sqladmin",
                            "administratorLoginPassword": "P@ssw0rd!",
                            "version": "12.0"
                        }
                    }));
                then.status(200).json_body(json!({
                    "name": "sql1",
                    "properties": {
                        "provisioningState": "Succeeded",
                        "fullyQualifiedDomainName": "sql1.database.windows.net"
                    }
                }));
            })
            .await;

        let provisioner = provisioner(&server, token_retriever());
        let fqdn = provisioner
            .create_sql_server(SqlServerRequest::new(
                "sql1",
                "westeurope",
                "sqladmin",
                "P@ssw0rd!",
            ))
            .await
            .unwrap();

        put.assert_async().await;
        assert_eq!(fqdn.as_deref(), Some("sql1.database.windows.net"));
    }

    #[tokio::test]
    async fn missing_domain_name_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(SERVER_PATH);
                then.status(200).json_body(json!({"name": "sql1"}));
            })
            .await;

        let provisioner = provisioner(&server, token_retriever());
        let fqdn = provisioner
            .create_sql_server(SqlServerRequest::new("sql1", "westeurope", "a", "b"))
            .await
            .unwrap();

        assert_eq!(fqdn, None);
    }

    #[tokio::test]
    async fn downstream_failure_is_propagated() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path(SERVER_PATH);
                then.status(400).json_body(json!({
                    "error": {
                        "code": "PasswordNotComplex",
                        "message": "The password does not meet policy requirements."
                    }
                }));
            })
            .await;

        let provisioner = provisioner(&server, token_retriever());
        let result = provisioner
            .create_sql_server(SqlServerRequest::new("sql1", "westeurope", "a", "weak"))
            .await;

        assert_matches!(
            result,
            Err(ProvisionError::Arm(ArmError::ErrorResponse { status: 400, code, .. })) => {
                assert_eq!(code, "PasswordNotComplex");
            }
        );
    }

    #[test]
    fn debug_hides_the_password() {
        let request = SqlServerRequest::new("sql1", "westeurope", "sqladmin", "P@ssw0rd!");
        assert!(!format!("{request:?}").contains("P@ssw0rd!"));
    }
}
