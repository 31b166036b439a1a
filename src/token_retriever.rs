use crate::authenticator::{Authenticator, GrantType, TokenRetrievalRequest};
use crate::config::ClientSecret;
use crate::token::Token;
use crate::{ClientID, TokenRetriever, TokenRetrieverError};

use async_trait::async_trait;
use std::fmt;
use tokio::sync::Mutex;
use tracing::debug;

/// Client-credentials token provider for a single scope.
///
/// The token is cached until it is about to expire. Concurrent callers wait on the cache lock, so
/// only one refresh is in flight at a time.
pub struct TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    client_id: ClientID,
    client_secret: ClientSecret,
    scope: String,
    tokens: Mutex<Option<Token>>,
    authenticator: A,
    retries: u8,
}

impl<A: Authenticator> fmt::Debug for TokenRetrieverWithCache<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRetrieverWithCache")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret)
            .field("scope", &self.scope)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<A> TokenRetriever for TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    async fn retrieve(&self) -> Result<Token, TokenRetrieverError> {
        let mut cached_token = self.tokens.lock().await;

        if let Some(token) = cached_token.as_ref().filter(|t| !t.expires_soon()) {
            return Ok(token.clone());
        }

        // Attempt to refresh the token. Retry if failed.
        // This retry will block everyone trying to retrieve the token,
        // so we should enforce low retry numbers and error early.
        let mut attempt = 0;
        loop {
            match self.refresh_token().await {
                Ok(token) => {
                    debug!(expires_at = %token.expires_at(), "authorization token refreshed");
                    *cached_token = Some(token.clone());
                    return Ok(token);
                }
                Err(e) => {
                    debug!("error refreshing token: {e}");

                    attempt += 1;
                    if self.should_retry_refresh(attempt) {
                        debug!("retrying to refresh token");
                        continue;
                    } else {
                        debug!("exhausted retries");
                        return Err(e);
                    }
                }
            }
        }
    }
}

impl<A> TokenRetrieverWithCache<A>
where
    A: Authenticator,
{
    /// Creates a new `TokenRetrieverWithCache` that authenticates with a client secret.
    pub fn new(
        client_id: ClientID,
        client_secret: ClientSecret,
        scope: String,
        authenticator: A,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            scope,
            tokens: Mutex::new(None),
            authenticator,
            retries: 0,
        }
    }

    pub fn with_retries(self, retries: u8) -> Self {
        Self { retries, ..self }
    }

    fn should_retry_refresh(&self, attempt: u8) -> bool {
        attempt < self.retries.saturating_add(1)
    }

    async fn refresh_token(&self) -> Result<Token, TokenRetrieverError> {
        let request = TokenRetrievalRequest {
            client_id: self.client_id.to_owned(),
            client_secret: self.client_secret.to_owned(),
            grant_type: GrantType::ClientCredentials,
            scope: self.scope.to_owned(),
        };

        let response = self.authenticator.authenticate(request).await?;

        Token::try_from(response)
    }
}
