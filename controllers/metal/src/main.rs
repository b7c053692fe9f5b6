//! metal controller
//!
//! Unified controller for the bare-metal cloud provider CRDs:
//! - Device: provisions and manages bare-metal servers
//! - VirtualNetwork: manages layer-2 VLANs
//! - SpotMarketRequest: places and observes spot capacity bids
//!
//! This controller ensures GitOps-style management of provider resources.

mod backoff;
mod controller;
mod error;
mod reconcile_helpers;
#[cfg(test)]
mod reconcile_helpers_test;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use std::env;

use tracing::info;

use crate::controller::Controller;
use crate::error::ControllerError;

/// Default provider API endpoint
const DEFAULT_API_URL: &str = "https://api.equinix.com/metal/v1";

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting metal controller");

    // Load configuration from environment variables
    let api_url = env::var("METAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
    let auth_token = env::var("METAL_AUTH_TOKEN").map_err(|_| {
        ControllerError::InvalidConfig(
            "METAL_AUTH_TOKEN environment variable is required".to_string(),
        )
    })?;
    let project_id = env::var("METAL_PROJECT_ID").map_err(|_| {
        ControllerError::InvalidConfig(
            "METAL_PROJECT_ID environment variable is required".to_string(),
        )
    })?;
    let namespace = env::var("WATCH_NAMESPACE").ok();

    info!("Configuration:");
    info!("  API URL: {}", api_url);
    info!("  Project: {}", project_id);
    info!("  Namespace: {}", namespace.as_deref().unwrap_or("all namespaces"));

    // Initialize and run controller
    let controller = Controller::new(api_url, auth_token, project_id, namespace).await?;
    controller.run().await?;

    Ok(())
}
