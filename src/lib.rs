//! HTTP gateway that provisions Azure resources (resource groups, SQL servers and storage
//! accounts) through the Resource Manager API, authenticating with an OAuth2
//! client-credentials token.

pub mod arm;
pub mod authenticator;
pub mod config;
pub mod credential;
pub mod gateway;
pub mod http;
pub mod http_client;
pub mod parameters;
pub mod provisioning;
pub mod telemetry;
pub mod token;
pub mod token_retriever;

use crate::token::Token;
use async_trait::async_trait;
use thiserror::Error;

pub type ClientID = String;

#[derive(Error, Debug)]
pub enum TokenRetrieverError {
    #[error("retrieving token: `{0}`")]
    TokenRetrieverError(String),
    #[error("fetching access token: `{0}`")]
    AuthenticatorError(#[from] authenticator::AuthenticateError),
}

/// The TokenRetriever will be the responsible to retrieve an authorization token
#[async_trait]
pub trait TokenRetriever: Send + Sync {
    async fn retrieve(&self) -> Result<Token, TokenRetrieverError>;
}
