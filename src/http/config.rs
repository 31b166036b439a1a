use http::Uri;
use std::env;
use std::env::VarError;
use std::fmt::Display;
use std::time::Duration;

use crate::parameters::DEFAULT_HTTP_TIMEOUT;

/// Settings for the outbound HTTP client shared by the token provider, the signing keys
/// fetcher and the Resource Manager client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub(crate) timeout: Duration,
    pub(crate) conn_timeout: Duration,
    pub(crate) proxy: ProxyConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            conn_timeout: DEFAULT_HTTP_TIMEOUT,
            proxy: ProxyConfig::default(),
        }
    }
}

impl HttpConfig {
    pub fn new(timeout: Duration, conn_timeout: Duration, proxy: ProxyConfig) -> Self {
        Self {
            timeout,
            conn_timeout,
            proxy,
        }
    }
}

const HTTP_PROXY_ENV_NAME: &str = "HTTP_PROXY";
const HTTPS_PROXY_ENV_NAME: &str = "HTTPS_PROXY";
/// Schemes the client can tunnel through.
const SUPPORTED_PROXY_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

#[derive(thiserror::Error, Debug)]
pub enum ProxyError {
    #[error("invalid proxy url `{0}`: `{1}`")]
    InvalidUrl(String, String),
}

/// Type to represent a Url which can be used in proxy implementations.
/// It allows representing empty urls and perform basic uri validations.
#[derive(Debug, Default, PartialEq, Clone)]
pub struct ProxyUrl(Option<Uri>);

impl TryFrom<&str> for ProxyUrl {
    type Error = ProxyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Ok(Self(None));
        }
        let invalid = |reason: String| ProxyError::InvalidUrl(s.to_string(), reason);
        let uri = s.parse::<Uri>().map_err(|err| invalid(err.to_string()))?;
        match uri.scheme_str() {
            None => return Err(invalid("missing scheme".to_string())),
            Some(scheme) if !SUPPORTED_PROXY_SCHEMES.contains(&scheme) => {
                return Err(invalid(format!("unsupported scheme `{scheme}`")));
            }
            Some(_) => {}
        }
        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host".to_string()));
        }
        Ok(Self(Some(uri)))
    }
}

impl Display for ProxyUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Some(url) => write!(f, "{url}"),
            None => write!(f, ""),
        }
    }
}

impl ProxyUrl {
    fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

/// Proxy for the outbound HTTP client.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ProxyConfig {
    /// Proxy URL proxy:
    /// <protocol>://<user>:<password>@<host>:<port>
    /// (All parts except host are optional)
    url: ProxyUrl,
}

impl ProxyConfig {
    pub fn new(proxy_url: &str) -> Result<Self, ProxyError> {
        let url = ProxyUrl::try_from(proxy_url)?;
        Ok(Self { url })
    }

    pub fn is_empty(&self) -> bool {
        self.url.is_empty()
    }

    /// Returns a string representation of the proxy url.
    pub fn url_as_string(&self) -> String {
        self.url.to_string()
    }

    /// Returns a new instance whose url is taken from the standard environment variables if needed.
    pub fn try_with_url_from_env(self) -> Result<Self, ProxyError> {
        self.with_env_aware_url(|k| env::var(k))
    }

    /// Returns a new instance setting up the using the provided `env_var` function to get it from the
    /// environment if required. It fails if the url from the environment is not valid.
    fn with_env_aware_url<F>(self, env_var: F) -> Result<Self, ProxyError>
    where
        F: Fn(&'static str) -> Result<String, VarError>,
    {
        if !self.url.is_empty() {
            return Ok(self);
        }
        let url = env_var(HTTPS_PROXY_ENV_NAME)
            .or_else(|_| env_var(HTTP_PROXY_ENV_NAME))
            .unwrap_or_default()
            .as_str()
            .try_into()?;
        Ok(ProxyConfig { url })
    }
}
