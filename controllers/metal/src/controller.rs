//! Main controller implementation.
//!
//! This module contains the `Controller` struct that orchestrates
//! reconciliation and resource watching for the unified metal controller.
//!
//! The controller manages three CRD types:
//! - Device: provisions and manages bare-metal servers
//! - VirtualNetwork: manages layer-2 VLANs
//! - SpotMarketRequest: places and observes spot capacity bids

use std::sync::Arc;

use kube::{Api, Client};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;
use crds::{Device, SpotMarketRequest, VirtualNetwork};
use metal_client::MetalClient;

/// Main controller for provider resource management.
pub struct Controller {
    device_watcher: JoinHandle<Result<(), ControllerError>>,
    virtual_network_watcher: JoinHandle<Result<(), ControllerError>>,
    spot_market_request_watcher: JoinHandle<Result<(), ControllerError>>,
}

impl Controller {
    /// Creates a new controller instance.
    pub async fn new(
        api_url: String,
        auth_token: String,
        project_id: String,
        namespace: Option<String>,
    ) -> Result<Self, ControllerError> {
        info!("Initializing metal controller");

        // Create Kubernetes client
        let kube_client = Client::try_default()
            .await
            .map_err(ControllerError::Kube)?;

        // Create provider client
        let metal_client =
            MetalClient::new(api_url.clone(), auth_token).map_err(ControllerError::Metal)?;

        // Validate token and connectivity before proceeding
        info!("Validating provider token and connectivity...");
        metal_client.validate_token().await.map_err(|e| {
            error!("Failed to validate provider token: {}", e);
            error!("Please ensure:");
            error!("  1. METAL_AUTH_TOKEN environment variable is set correctly");
            error!("  2. The token is valid at the provider");
            error!("  3. The API is reachable at {}", api_url);
            ControllerError::Metal(e)
        })?;
        info!("Provider token validated and connectivity established");

        // Create API clients for all CRD types
        let ns = namespace.as_deref().unwrap_or("default");
        let device_api: Api<Device> = Api::namespaced(kube_client.clone(), ns);
        let virtual_network_api: Api<VirtualNetwork> = Api::namespaced(kube_client.clone(), ns);
        let spot_market_request_api: Api<SpotMarketRequest> =
            Api::namespaced(kube_client.clone(), ns);

        // Create reconciler
        let reconciler = Reconciler::new(
            metal_client,
            kube_client,
            project_id,
            device_api.clone(),
            virtual_network_api.clone(),
            spot_market_request_api.clone(),
        );

        // Map existing provider devices back to CRs before watching
        info!("Performing startup reconciliation to map existing provider resources...");
        if let Err(e) = reconciler.startup_reconciliation().await {
            warn!("Startup reconciliation failed (will continue): {}", e);
        } else {
            info!("Startup reconciliation completed");
        }

        // Create watchers - use Arc to share reconciler
        let reconciler_arc = Arc::new(reconciler);

        let watcher_instance = Arc::new(Watcher::new(
            reconciler_arc,
            device_api,
            virtual_network_api,
            spot_market_request_api,
        ));

        // Start all watchers in background tasks
        let device_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_devices().await })
        };

        let virtual_network_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_virtual_networks().await })
        };

        let spot_market_request_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_spot_market_requests().await })
        };

        Ok(Self {
            device_watcher,
            virtual_network_watcher,
            spot_market_request_watcher,
        })
    }

    /// Runs the controller until shutdown.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("metal controller running");

        // Wait for any watcher to exit (they should run forever)
        tokio::select! {
            result = &mut self.device_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("Device watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("Device watcher error: {}", e)))?;
            }
            result = &mut self.virtual_network_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("VirtualNetwork watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("VirtualNetwork watcher error: {}", e)))?;
            }
            result = &mut self.spot_market_request_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("SpotMarketRequest watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("SpotMarketRequest watcher error: {}", e)))?;
            }
        }

        Ok(())
    }
}
