use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

use super::{ArmError, ResourceId};
use crate::config::PollingConfig;
use crate::credential::TokenCredential;
use crate::http_client::HttpClient;

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";
const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Resource Manager client bound to one credential.
///
/// A client is cheap: it borrows the shared HTTP client and settings and owns only the credential,
/// so a new one is built for every provisioning request.
pub struct ArmClient<'a, C, K> {
    http_client: &'a C,
    credential: K,
    endpoint: &'a Url,
    polling: &'a PollingConfig,
}

/// How the progress of a long-running operation is observed.
enum Monitor {
    /// `Azure-AsyncOperation` status resource.
    AsyncOperation(String),
    /// `Location` header, answering `202` while running.
    Location(String),
    /// `provisioningState` of the resource itself.
    Resource,
}

enum Outcome {
    Succeeded,
    Failed { state: String, message: String },
    Running,
}

impl<'a, C, K> ArmClient<'a, C, K>
where
    C: HttpClient,
    K: TokenCredential,
{
    pub fn new(
        http_client: &'a C,
        credential: K,
        endpoint: &'a Url,
        polling: &'a PollingConfig,
    ) -> Self {
        Self {
            http_client,
            credential,
            endpoint,
            polling,
        }
    }

    /// `PUT`s the payload on `id` and waits until the operation reaches a terminal state. Returns
    /// the final representation of the resource.
    pub async fn create_or_update<T, R>(
        &self,
        id: &ResourceId,
        api_version: &str,
        payload: &T,
    ) -> Result<R, ArmError>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.resource_url(id, None, api_version)?;
        let body = serde_json::to_vec(payload)
            .map_err(|e| ArmError::Encoder(format!("Failed to encode JSON: {e}")))?;

        debug!(resource_id = %id, "creating or updating resource");
        let response = self.send(Method::PUT, url.as_str(), Some(body)).await?;
        let body = self.wait_for_completion(response, &url).await?;

        decode(&body)
    }

    pub async fn get<R>(&self, id: &ResourceId, api_version: &str) -> Result<R, ArmError>
    where
        R: DeserializeOwned,
    {
        let url = self.resource_url(id, None, api_version)?;
        let response = self.send(Method::GET, url.as_str(), None).await?;
        decode(response.body())
    }

    /// Invokes a resource action such as `listKeys`.
    pub async fn post_action<R>(
        &self,
        id: &ResourceId,
        action: &str,
        api_version: &str,
    ) -> Result<R, ArmError>
    where
        R: DeserializeOwned,
    {
        let url = self.resource_url(id, Some(action), api_version)?;
        let response = self.send(Method::POST, url.as_str(), None).await?;
        decode(response.body())
    }

    fn resource_url(
        &self,
        id: &ResourceId,
        action: Option<&str>,
        api_version: &str,
    ) -> Result<Url, ArmError> {
        let mut url = self.endpoint.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ArmError::Encoder(format!("endpoint `{}` cannot be a base", self.endpoint))
            })?;
            segments.pop_if_empty().extend(id.segments());
            if let Some(action) = action {
                segments.push(action);
            }
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("api-version", api_version);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response<Vec<u8>>, ArmError> {
        let token = self.credential.get_token().await?;

        let mut bearer_token_header = HeaderValue::from_str(&token.to_string()).map_err(|_| {
            ArmError::Encoder("invalid HTTP header value set for Authorization".to_string())
        })?;
        bearer_token_header.set_sensitive(true);

        let client_request_id = Uuid::now_v7().to_string();
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(url)
            .header(AUTHORIZATION, bearer_token_header)
            .header(ACCEPT, "application/json")
            .header(CLIENT_REQUEST_ID, client_request_id.as_str());
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.unwrap_or_default())
            .map_err(|e| ArmError::Encoder(format!("Failed to build request: {e}")))?;

        trace!(%method, url, %client_request_id, "resource manager request");
        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|e| ArmError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_response(&response))
        }
    }

    async fn wait_for_completion(
        &self,
        initial: Response<Vec<u8>>,
        resource_url: &Url,
    ) -> Result<Vec<u8>, ArmError> {
        let monitor = match (
            header_str(&initial, AZURE_ASYNC_OPERATION),
            header_str(&initial, LOCATION.as_str()),
        ) {
            (Some(url), _) => Monitor::AsyncOperation(url),
            (None, Some(url)) if initial.status() == StatusCode::ACCEPTED => Monitor::Location(url),
            _ => match resource_outcome(initial.body()) {
                Outcome::Succeeded => return Ok(initial.into_body()),
                Outcome::Failed { state, message } => {
                    return Err(ArmError::OperationFailed { state, message });
                }
                Outcome::Running => Monitor::Resource,
            },
        };

        let mut delay = self.retry_after(&initial);
        for poll in 1..=self.polling.max_polls {
            tokio::time::sleep(delay).await;
            trace!(poll, "checking long-running operation");

            match &monitor {
                Monitor::AsyncOperation(status_url) => {
                    let response = self.send(Method::GET, status_url, None).await?;
                    delay = self.retry_after(&response);
                    let status: OperationStatus = decode(response.body())?;
                    match outcome(&status.status, || status.error_message()) {
                        Outcome::Succeeded => return self.fetch(resource_url).await,
                        Outcome::Failed { state, message } => {
                            return Err(ArmError::OperationFailed { state, message });
                        }
                        Outcome::Running => continue,
                    }
                }
                Monitor::Location(location_url) => {
                    let response = self.send(Method::GET, location_url, None).await?;
                    if response.status() == StatusCode::ACCEPTED {
                        delay = self.retry_after(&response);
                        continue;
                    }
                    return self.fetch(resource_url).await;
                }
                Monitor::Resource => {
                    let response = self.send(Method::GET, resource_url.as_str(), None).await?;
                    delay = self.retry_after(&response);
                    match resource_outcome(response.body()) {
                        Outcome::Succeeded => return Ok(response.into_body()),
                        Outcome::Failed { state, message } => {
                            return Err(ArmError::OperationFailed { state, message });
                        }
                        Outcome::Running => continue,
                    }
                }
            }
        }

        Err(ArmError::PollingExhausted(self.polling.max_polls))
    }

    async fn fetch(&self, resource_url: &Url) -> Result<Vec<u8>, ArmError> {
        let response = self.send(Method::GET, resource_url.as_str(), None).await?;
        Ok(response.into_body())
    }

    fn retry_after(&self, response: &Response<Vec<u8>>) -> Duration {
        header_str(response, RETRY_AFTER.as_str())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(self.polling.interval)
    }
}

fn header_str(response: &Response<Vec<u8>>, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn decode<R: DeserializeOwned>(body: &[u8]) -> Result<R, ArmError> {
    let body = if body.is_empty() { b"null".as_slice() } else { body };
    serde_json::from_slice(body).map_err(|e| {
        ArmError::Decoder(format!(
            "Failed to decode JSON response: {e}. Response body: {}",
            String::from_utf8_lossy(body)
        ))
    })
}

fn outcome(state: &str, message: impl FnOnce() -> String) -> Outcome {
    if state.eq_ignore_ascii_case("Succeeded") {
        Outcome::Succeeded
    } else if state.eq_ignore_ascii_case("Failed") || state.eq_ignore_ascii_case("Canceled") {
        Outcome::Failed {
            state: state.to_string(),
            message: message(),
        }
    } else {
        Outcome::Running
    }
}

/// Outcome from the `provisioningState` of a resource body. Resources without one are complete.
fn resource_outcome(body: &[u8]) -> Outcome {
    let state = serde_json::from_slice::<ProvisioningBody>(body)
        .ok()
        .and_then(|body| body.properties)
        .and_then(|properties| properties.provisioning_state);
    match state {
        Some(state) => outcome(&state, || "resource provisioning did not succeed".to_string()),
        None => Outcome::Succeeded,
    }
}

fn error_response(response: &Response<Vec<u8>>) -> ArmError {
    let status = response.status();
    match serde_json::from_slice::<ErrorBody>(response.body()) {
        Ok(ErrorBody { error }) => ArmError::ErrorResponse {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
        },
        Err(_) => ArmError::ErrorResponse {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: String::from_utf8_lossy(response.body()).to_string(),
        },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

impl OperationStatus {
    fn error_message(&self) -> String {
        self.error
            .as_ref()
            .map(|e| format!("{}: {}", e.code, e.message))
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ProvisioningBody {
    #[serde(default)]
    properties: Option<ProvisioningProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProvisioningProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}
