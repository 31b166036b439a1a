//! Process-wide configuration. It is built once at start-up from [crate::parameters] and passed
//! explicitly to every component that needs it; nothing mutates it afterwards.

use std::fmt;
use std::time::Duration;

use url::Url;

pub const DEFAULT_INSTANCE: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com/";
pub const DEFAULT_MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid url for `{0}`: `{1}`")]
    InvalidUrl(&'static str, String),
    #[error("missing value for `{0}`")]
    Missing(&'static str),
}

/// Client secret of the identity provider registration. Never printed.
#[derive(Clone, PartialEq)]
pub struct ClientSecret(String);

impl<S: AsRef<str>> From<S> for ClientSecret {
    fn from(secret: S) -> Self {
        ClientSecret(secret.as_ref().to_string())
    }
}

impl ClientSecret {
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClientSecret: redacted")
    }
}

/// Identity provider registration of the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct AdConfig {
    /// Identity provider instance, e.g. `https://login.microsoftonline.com/`.
    pub instance: Url,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: ClientSecret,
    /// Object id of the service principal. Informational only.
    pub object_id: Option<String>,
}

impl AdConfig {
    /// OAuth2 v2.0 token endpoint of the tenant.
    pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
        self.tenant_url("oauth2/v2.0/token")
    }

    /// Signing keys (JWKS) of the tenant, used to validate callers' tokens.
    pub fn jwks_endpoint(&self) -> Result<Url, ConfigError> {
        self.tenant_url("discovery/v2.0/keys")
    }

    /// Issuers accepted in callers' tokens (v2.0 and v1.0 formats).
    pub fn issuers(&self) -> Vec<String> {
        vec![
            format!("{}{}/v2.0", self.instance, self.tenant_id),
            format!("https://sts.windows.net/{}/", self.tenant_id),
        ]
    }

    fn tenant_url(&self, path: &str) -> Result<Url, ConfigError> {
        self.instance
            .join(&format!("{}/{path}", self.tenant_id))
            .map_err(|e| ConfigError::InvalidUrl("instance", e.to_string()))
    }
}

/// Target subscription of the provisioned resources.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceConfig {
    pub subscription_id: String,
    /// Resource group used when the caller does not name one (SQL servers).
    pub resource_group_name: String,
    /// Scope requested in the client-credentials exchange.
    pub scope: String,
    /// Resource Manager endpoint.
    pub arm_endpoint: Url,
}

/// Long-running operation wait settings of the Resource Manager client.
#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    /// Interval used when the service does not send `Retry-After`.
    pub interval: Duration,
    /// Upper bound of status requests per operation.
    pub max_polls: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: 360,
        }
    }
}

/// Validation settings for the callers' bearer tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerAuthConfig {
    pub audiences: Vec<String>,
    pub issuers: Vec<String>,
    pub jwks_endpoint: Url,
}

impl CallerAuthConfig {
    /// Builds the settings for the registration: the audiences default to the client id and its
    /// `api://` application id uri.
    pub fn for_registration(
        ad_config: &AdConfig,
        audiences: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let audiences = if audiences.is_empty() {
            vec![
                ad_config.client_id.clone(),
                format!("api://{}", ad_config.client_id),
            ]
        } else {
            audiences
        };
        Ok(Self {
            audiences,
            issuers: ad_config.issuers(),
            jwks_endpoint: ad_config.jwks_endpoint()?,
        })
    }
}

/// Parses `value` as a url whose path ends with `/`, so it can be joined.
pub(crate) fn parse_base_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    let with_slash = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };
    Url::parse(&with_slash).map_err(|e| ConfigError::InvalidUrl(name, e.to_string()))
}
