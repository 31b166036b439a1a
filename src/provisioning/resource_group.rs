use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::IgnoredAny;

use super::ProvisionError;
use crate::arm::{ArmClient, ResourceId, default_tags};
use crate::credential::TokenCredential;
use crate::http_client::HttpClient;

pub const API_VERSION: &str = "2021-04-01";

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceGroupRequest {
    pub name: String,
    pub region: String,
}

impl ResourceGroupRequest {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResourceGroupPayload<'a> {
    location: &'a str,
    tags: BTreeMap<String, String>,
}

pub(super) async fn create<C, K>(
    client: &ArmClient<'_, C, K>,
    id: &ResourceId,
    request: &ResourceGroupRequest,
) -> Result<(), ProvisionError>
where
    C: HttpClient,
    K: TokenCredential,
{
    let payload = ResourceGroupPayload {
        location: &request.region,
        tags: default_tags(),
    };
    client
        .create_or_update::<_, IgnoredAny>(id, API_VERSION, &payload)
        .await?;
    Ok(())
}
