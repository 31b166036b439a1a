//! Command line of the gateway. Every flag falls back to an environment variable, and a `.env` file
//! is loaded before parsing.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Args, Parser};

use crate::config::{
    AdConfig, CallerAuthConfig, ClientSecret, ConfigError, DEFAULT_ARM_ENDPOINT, DEFAULT_INSTANCE,
    DEFAULT_MANAGEMENT_SCOPE, PollingConfig, ResourceConfig, parse_base_url,
};
use crate::http::config::{HttpConfig, ProxyConfig, ProxyError};

pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Parser, Debug)]
#[command(name = "arm-gateway", version, about)]
pub struct Cli {
    /// Socket address the gateway listens on
    #[arg(long, env = "GATEWAY_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub identity: IdentityArgs,

    #[command(flatten)]
    pub resources: ResourceArgs,

    #[command(flatten)]
    pub http: HttpArgs,
}

/// Identity provider registration of the gateway.
#[derive(Args, Debug)]
pub struct IdentityArgs {
    /// Identity provider instance
    #[arg(long, env = "AZURE_AD_INSTANCE", default_value = DEFAULT_INSTANCE)]
    pub instance: String,

    #[arg(long, env = "AZURE_AD_TENANT_ID")]
    pub tenant_id: String,

    #[arg(long, env = "AZURE_AD_CLIENT_ID")]
    pub client_id: String,

    #[arg(long, env = "AZURE_AD_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    /// Object id of the service principal (informational)
    #[arg(long, env = "AZURE_AD_OBJECT_ID")]
    pub object_id: Option<String>,

    /// Audience accepted in callers' tokens. Defaults to the client id and its `api://` uri
    #[arg(
        long = "allowed-audience",
        env = "GATEWAY_ALLOWED_AUDIENCES",
        value_delimiter = ','
    )]
    pub allowed_audiences: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ResourceArgs {
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription_id: String,

    /// Resource group of the SQL servers
    #[arg(long, env = "AZURE_RESOURCE_GROUP_NAME")]
    pub resource_group_name: String,

    /// Scope requested for the management token
    #[arg(long, env = "AZURE_TOKEN_SCOPE", default_value = DEFAULT_MANAGEMENT_SCOPE)]
    pub scope: String,

    #[arg(long, env = "AZURE_ARM_ENDPOINT", default_value = DEFAULT_ARM_ENDPOINT)]
    pub arm_endpoint: String,

    /// Seconds between status checks of a long-running operation, unless the service says otherwise
    #[arg(long, env = "ARM_POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Maximum status checks of a long-running operation
    #[arg(long, env = "ARM_MAX_POLLS", default_value_t = 360)]
    pub max_polls: u32,
}

#[derive(Args, Debug)]
pub struct HttpArgs {
    /// Timeout in seconds of every outbound request
    #[arg(long, env = "GATEWAY_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Outbound proxy. `HTTPS_PROXY` and `HTTP_PROXY` are used when not set
    #[arg(long)]
    pub proxy_url: Option<String>,
}

impl IdentityArgs {
    pub fn ad_config(&self) -> Result<AdConfig, ConfigError> {
        Ok(AdConfig {
            instance: parse_base_url("instance", &self.instance)?,
            tenant_id: non_empty("tenant-id", &self.tenant_id)?,
            client_id: non_empty("client-id", &self.client_id)?,
            client_secret: ClientSecret::from(non_empty("client-secret", &self.client_secret)?),
            object_id: self.object_id.clone().filter(|id| !id.is_empty()),
        })
    }

    pub fn caller_auth_config(&self, ad_config: &AdConfig) -> Result<CallerAuthConfig, ConfigError> {
        let audiences = self
            .allowed_audiences
            .iter()
            .map(|audience| audience.trim().to_string())
            .filter(|audience| !audience.is_empty())
            .collect();
        CallerAuthConfig::for_registration(ad_config, audiences)
    }
}

impl ResourceArgs {
    pub fn resource_config(&self) -> Result<ResourceConfig, ConfigError> {
        Ok(ResourceConfig {
            subscription_id: non_empty("subscription-id", &self.subscription_id)?,
            resource_group_name: non_empty("resource-group-name", &self.resource_group_name)?,
            scope: non_empty("scope", &self.scope)?,
            arm_endpoint: parse_base_url("arm-endpoint", &self.arm_endpoint)?,
        })
    }

    pub fn polling_config(&self) -> PollingConfig {
        PollingConfig {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }
}

impl HttpArgs {
    pub fn http_config(&self) -> Result<HttpConfig, ProxyError> {
        let timeout = Duration::from_secs(self.timeout_secs);
        let proxy = ProxyConfig::new(self.proxy_url.as_deref().unwrap_or_default())?
            .try_with_url_from_env()?;
        Ok(HttpConfig::new(timeout, timeout, proxy))
    }
}

fn non_empty(name: &'static str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }
    Ok(value.to_string())
}
