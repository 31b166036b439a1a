use std::error::Error;
use std::sync::Arc;

use arm_gateway::authenticator::HttpAuthenticator;
use arm_gateway::gateway::auth::JwksAuthorizer;
use arm_gateway::gateway::{AppState, router};
use arm_gateway::http::client::HttpClient;
use arm_gateway::parameters::Cli;
use arm_gateway::provisioning::Provisioner;
use arm_gateway::telemetry;
use arm_gateway::token_retriever::TokenRetrieverWithCache;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init()?;

    let ad_config = cli.identity.ad_config()?;
    let caller_auth_config = cli.identity.caller_auth_config(&ad_config)?;
    let resource_config = cli.resources.resource_config()?;
    let polling_config = cli.resources.polling_config();

    let http_client = HttpClient::new(&cli.http.http_config()?)
        .map_err(|e| format!("error creating http client: {e}"))?;

    let authenticator = HttpAuthenticator::new(http_client.clone(), ad_config.token_endpoint()?);
    let token_retriever = TokenRetrieverWithCache::new(
        ad_config.client_id.clone(),
        ad_config.client_secret.clone(),
        resource_config.scope.clone(),
        authenticator,
    );

    info!(
        tenant_id = %ad_config.tenant_id,
        client_id = %ad_config.client_id,
        object_id = ad_config.object_id.as_deref().unwrap_or_default(),
        subscription_id = %resource_config.subscription_id,
        arm_endpoint = %resource_config.arm_endpoint,
        "gateway configured"
    );

    let provisioner = Provisioner::new(
        token_retriever,
        http_client.clone(),
        resource_config,
        polling_config,
    );
    let authorizer = JwksAuthorizer::new(http_client, caller_auth_config);
    let state = AppState::new(Arc::new(provisioner), Arc::new(authorizer));

    let listener = TcpListener::bind(cli.listen).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}
