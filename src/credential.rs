//! Adapts acquired tokens to the credential capability of the Resource Manager client.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::TokenRetriever;
use crate::token::Token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("access token expired at `{0}`")]
    Expired(String),
    #[error("renewing access token: `{0}`")]
    Renewal(String),
}

/// Produces a bearer token on demand.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<Token, CredentialError>;
}

/// Wraps a single token. Every call yields the same token; it is never refreshed here, but it keeps
/// the real expiry and refuses to hand out an expired token.
#[derive(Debug, Clone, PartialEq)]
pub struct BearerCredential {
    token: Token,
}

impl BearerCredential {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn token(&self) -> Result<&Token, CredentialError> {
        if self.token.is_expired() {
            return Err(CredentialError::Expired(
                self.token.expires_at().to_rfc3339(),
            ));
        }
        Ok(&self.token)
    }

    fn expires_soon(&self) -> bool {
        self.token.expires_soon()
    }
}

impl From<Token> for BearerCredential {
    fn from(token: Token) -> Self {
        Self::new(token)
    }
}

#[async_trait]
impl TokenCredential for BearerCredential {
    async fn get_token(&self) -> Result<Token, CredentialError> {
        self.token().cloned()
    }
}

/// Holds the token of one provisioning operation and asks the token provider for a new one when
/// it is about to expire, so long-running waits outlive the first token.
pub struct RefreshingCredential<'a, R> {
    token_retriever: &'a R,
    current: Mutex<BearerCredential>,
}

impl<'a, R> RefreshingCredential<'a, R>
where
    R: TokenRetriever,
{
    pub fn new(token_retriever: &'a R, token: Token) -> Self {
        Self {
            token_retriever,
            current: Mutex::new(BearerCredential::new(token)),
        }
    }
}

#[async_trait]
impl<R> TokenCredential for RefreshingCredential<'_, R>
where
    R: TokenRetriever,
{
    async fn get_token(&self) -> Result<Token, CredentialError> {
        let mut current = self.current.lock().await;
        if current.expires_soon() {
            debug!("management token about to expire, acquiring a new one");
            let token = self
                .token_retriever
                .retrieve()
                .await
                .map_err(|e| CredentialError::Renewal(e.to_string()))?;
            *current = BearerCredential::new(token);
        }
        current.token().cloned()
    }
}
