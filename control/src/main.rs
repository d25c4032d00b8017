use anyhow::Result;
use control::apis::ingress::IngressReconciler;
use control::appgw::{load_snapshot, GatewayState};
use control::ControllerConfig;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application gateway ingress controller
///
/// Watches the cluster and keeps the gateway configuration in sync, leaving
/// resources owned by someone else untouched.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (needed for Kubernetes TLS client)
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok(); // Ignore error if already installed

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ControllerConfig::from_env()?;
    info!(
        controller = %config.controller_name,
        ingress_class = %config.ingress_class,
        prefix = %config.naming.prefix,
        "Starting application gateway ingress controller"
    );

    let initial = match &config.initial_config_path {
        Some(path) => load_snapshot(path)?,
        None => {
            info!("No previously applied configuration, starting greenfield");
            Default::default()
        }
    };
    let state = GatewayState::new(initial);

    let client = kube::Client::try_default().await?;

    let controller = tokio::spawn(IngressReconciler::run(client, config, state));

    tokio::select! {
        result = controller => {
            match result {
                Ok(Ok(())) => info!("Ingress controller stopped"),
                Ok(Err(e)) => error!("Ingress controller error: {}", e),
                Err(e) => error!("Ingress controller task failed: {}", e),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    Ok(())
}
