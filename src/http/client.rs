use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient as GatewayHttpClient, HttpClientError};
use async_trait::async_trait;
use http::Response as HttpResponse;
use http::{Request, Response};
use reqwest::{Client, Proxy, Response as ReqwestResponse};
use tracing::trace;

/// [GatewayHttpClient] backed by an asynchronous `reqwest` client using rustls and the system
/// native certificates.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpBuildError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .no_proxy()
            .timeout(config.timeout)
            .connect_timeout(config.conn_timeout);

        if !config.proxy.is_empty() {
            let proxy = Proxy::all(config.proxy.url_as_string())
                .map_err(|err| HttpBuildError::ClientBuilder(format!("invalid proxy: {err}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<HttpResponse<Vec<u8>>, HttpResponseError> {
        trace!(method = %request.method(), uri = %request.uri(), "sending request");

        let (parts, body) = request.into_parts();
        let req = self
            .client
            .request(parts.method, parts.uri.to_string().as_str())
            .headers(parts.headers)
            .body(body);

        let res = req
            .send()
            .await
            .map_err(|err| HttpResponseError::TransportError(err.to_string()))?;

        try_build_response(res).await
    }
}

async fn try_build_response(
    res: ReqwestResponse,
) -> Result<HttpResponse<Vec<u8>>, HttpResponseError> {
    let status = res.status();
    let version = res.version();
    let headers = res.headers().clone();

    let body: Vec<u8> = res
        .bytes()
        .await
        .map_err(|err| HttpResponseError::ReadingResponse(err.to_string()))?
        .into();

    let mut response = http::Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpResponseError::BuildingResponse(err.to_string()))?;
    *response.headers_mut() = headers;

    Ok(response)
}

#[async_trait]
impl GatewayHttpClient for HttpClient {
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        let response = self.send(req).await?;

        Ok(response)
    }
}

impl From<HttpResponseError> for HttpClientError {
    fn from(err: HttpResponseError) -> Self {
        match err {
            HttpResponseError::TransportError(msg) => HttpClientError::TransportError(msg),
            HttpResponseError::BuildingResponse(msg) | HttpResponseError::ReadingResponse(msg) => {
                HttpClientError::InvalidResponse(msg)
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
}

#[derive(thiserror::Error, Debug)]
enum HttpResponseError {
    #[error("could read response body: {0}")]
    ReadingResponse(String),
    #[error("could build response: {0}")]
    BuildingResponse(String),
    #[error("http transport error: `{0}`")]
    TransportError(String),
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use http::header::CONTENT_TYPE;
    use httpmock::{Method::PUT, MockServer};

    use super::*;
    use crate::http::config::ProxyConfig;

    #[tokio::test]
    async fn forwards_method_headers_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/resource")
                    .header("content-type", "application/json")
                    .body(r#"{"location":"eastus"}"#);
                then.status(201)
                    .header("azure-asyncoperation", "https://example.com/op")
                    .body(r#"{"ok":true}"#);
            })
            .await;

        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let request = Request::builder()
            .method("PUT")
            .uri(server.url("/resource"))
            .header(CONTENT_TYPE, "application/json")
            .body(br#"{"location":"eastus"}"#.to_vec())
            .unwrap();

        let response = GatewayHttpClient::send(&client, request).await.unwrap();

        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers().get("azure-asyncoperation").unwrap(),
            "https://example.com/op"
        );
        assert_eq!(response.body(), br#"{"ok":true}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let server = MockServer::start_async().await;
        let timeout = Duration::from_millis(10);
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/slow");
                then.status(200)
                    .delay(timeout.saturating_add(Duration::from_millis(50)));
            })
            .await;

        let config = HttpConfig::new(timeout, timeout, ProxyConfig::default());
        let client = HttpClient::new(&config).unwrap();
        let request = Request::builder()
            .method("PUT")
            .uri(server.url("/slow"))
            .body(Vec::new())
            .unwrap();

        let error = GatewayHttpClient::send(&client, request).await.unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(_));
    }
}
