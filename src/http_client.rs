use async_trait::async_trait;
use http::{Request, Response};

#[derive(thiserror::Error, Debug)]
pub enum HttpClientError {
    /// Represents an http transport crate error.
    #[error("HTTP Transport error: `{0}`")]
    TransportError(String),
    /// Represents an unexpected response.
    #[error("invalid http response: `{0}`")]
    InvalidResponse(String),
}

/// An asynchronous trait that defines the internal methods for HTTP clients.
///
/// Every outbound call of the gateway (identity provider, signing keys and the
/// Resource Manager API) goes through this seam.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a request. The method and url are defined inside the Request.
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError>;
}

#[async_trait]
impl<C> HttpClient for std::sync::Arc<C>
where
    C: HttpClient + ?Sized,
{
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        self.as_ref().send(req).await
    }
}
