use async_trait::async_trait;
use http::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use url::form_urlencoded;

use crate::ClientID;
use crate::config::ClientSecret;
use crate::http_client::HttpClient;
use crate::token::AccessToken;

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize request: `{0}`")]
    SerializeError(String),
    #[error("unable to deserialize token: `{0}`")]
    DeserializeError(String),
    #[error("identity server error: Status code: `{0}`, Reason: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
}

/// Exchanges client credentials for an access token.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError>;
}

/// The Authenticator is responsible for obtaining an access token from the identity provider's
/// OAuth2 token endpoint.
pub struct HttpAuthenticator<C> {
    /// HTTP client
    http_client: C,
    /// Token endpoint URL
    url: Url,
}

impl<C> HttpAuthenticator<C> {
    pub fn new(http_client: C, url: Url) -> Self {
        Self { http_client, url }
    }
}

#[async_trait]
impl<C> Authenticator for HttpAuthenticator<C>
where
    C: HttpClient,
{
    /// Executes a form-encoded POST request to the token endpoint with the `TokenRetrievalRequest`
    /// as body and returns a `TokenRetrievalResponse`.
    async fn authenticate(
        &self,
        req: TokenRetrievalRequest,
    ) -> Result<TokenRetrievalResponse, AuthenticateError> {
        let request = http::Request::builder()
            .uri(self.url.as_str())
            .method("POST")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(ACCEPT, "application/json")
            .body(req.to_form().into_bytes())
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let response = self
            .http_client
            .send(request)
            .await
            .map_err(|e| AuthenticateError::HttpTransportError(e.to_string()))?;

        let body: String = String::from_utf8(response.body().clone()).map_err(|e| {
            AuthenticateError::DeserializeError(format!("invalid utf8 response: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AuthenticateError::HttpResponseError(
                response.status().as_u16(),
                error_reason(&body),
            ));
        }

        serde_json::from_str(body.as_str())
            .map_err(|e| AuthenticateError::DeserializeError(e.to_string()))
    }
}

/// Extracts the OAuth2 `error` and `error_description` fields from an error body, falling back to
/// the raw body.
fn error_reason(body: &str) -> String {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(OAuthErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(OAuthErrorResponse { error, .. }) => error,
        Err(_) => body.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    ClientCredentials,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenRetrievalRequest {
    pub client_id: ClientID,
    pub client_secret: ClientSecret,
    pub grant_type: GrantType,
    pub scope: String,
}

impl TokenRetrievalRequest {
    /// Encodes the request as an `application/x-www-form-urlencoded` body.
    pub fn to_form(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", self.client_secret.expose())
            .append_pair("grant_type", self.grant_type.as_str())
            .append_pair("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenRetrievalResponse {
    pub access_token: AccessToken,
    /// The lifetime in seconds of the access token.
    pub expires_in: u64,
    pub token_type: String,
}
