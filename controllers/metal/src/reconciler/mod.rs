//! Reconciliation logic for the metal-operator CRDs.
//!
//! One reconcile method per managed kind:
//! - `device`: bare-metal servers
//! - `virtual_network`: layer-2 VLANs
//! - `spot_market_request`: spot capacity bids

pub mod device;
#[cfg(test)]
mod device_test;
pub mod spot_market_request;
#[cfg(test)]
mod spot_market_request_test;
pub mod virtual_network;
#[cfg(test)]
mod virtual_network_test;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::{error, info, warn};

use crate::backoff::FibonacciBackoff;
use crate::error::ControllerError;
use crds::{Device, ResourceState, SpotMarketRequest, VirtualNetwork};
use metal_client::MetalClientTrait;

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10), // 1 minute min, 10 minutes max
            error_count: 0,
        }
    }
}

/// Reconciles the metal-operator managed resources.
pub struct Reconciler {
    pub(crate) metal_client: Box<dyn MetalClientTrait + Send + Sync>,
    pub(crate) kube_client: Client,
    /// Provider project every managed resource is scoped to
    pub(crate) project_id: String,
    pub(crate) device_api: Api<Device>,
    pub(crate) virtual_network_api: Api<VirtualNetwork>,
    pub(crate) spot_market_request_api: Api<SpotMarketRequest>,
    /// Error count tracking per resource (namespace/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        metal_client: impl MetalClientTrait + Send + Sync + 'static,
        kube_client: Client,
        project_id: String,
        device_api: Api<Device>,
        virtual_network_api: Api<VirtualNetwork>,
        spot_market_request_api: Api<SpotMarketRequest>,
    ) -> Self {
        Self {
            metal_client: Box::new(metal_client),
            kube_client,
            project_id,
            device_api,
            virtual_network_api,
            spot_market_request_api,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Device status patch derived from an observed provider device.
    ///
    /// `lastReconciled` is deliberately never written here: status patches
    /// must be deterministic or status updates re-trigger reconciliation.
    pub(crate) fn create_device_status_patch(
        observed: Option<&metal_client::Device>,
        state: ResourceState,
        error: Option<String>,
    ) -> serde_json::Value {
        match observed {
            Some(device) => {
                let provider_state = device::map_device_state(device.state);
                serde_json::json!({
                    "status": {
                        "deviceId": device.id,
                        "href": device.href,
                        "state": state,
                        "providerState": provider_state,
                        "ready": provider_state.is_ready(),
                        "ipAddresses": device::observed_addresses(device),
                        "locked": device.locked,
                        "error": error,
                    }
                })
            }
            // Drift/failure patch: clear the external identity
            None => serde_json::json!({
                "status": {
                    "deviceId": null,
                    "href": null,
                    "state": state,
                    "providerState": null,
                    "ready": false,
                    "locked": null,
                    "error": error,
                }
            }),
        }
    }

    /// VirtualNetwork status patch derived from an observed provider VLAN.
    pub(crate) fn create_virtual_network_status_patch(
        observed: Option<&metal_client::VirtualNetwork>,
        state: ResourceState,
        error: Option<String>,
    ) -> serde_json::Value {
        match observed {
            Some(vnet) => serde_json::json!({
                "status": {
                    "vnetId": vnet.id,
                    "href": vnet.href,
                    "vxlan": vnet.vxlan,
                    "metroCode": vnet.metro_code,
                    "state": state,
                    "error": error,
                }
            }),
            None => serde_json::json!({
                "status": {
                    "vnetId": null,
                    "href": null,
                    "vxlan": null,
                    "metroCode": null,
                    "state": state,
                    "error": error,
                }
            }),
        }
    }

    /// SpotMarketRequest status patch derived from an observed request.
    pub(crate) fn create_spot_market_request_status_patch(
        observed: Option<&metal_client::SpotMarketRequest>,
        state: ResourceState,
        error: Option<String>,
    ) -> serde_json::Value {
        match observed {
            Some(request) => {
                let device_ids: Vec<&str> =
                    request.devices.iter().map(|d| d.id.as_str()).collect();
                serde_json::json!({
                    "status": {
                        "requestId": request.id,
                        "href": request.href,
                        "state": state,
                        "deviceIds": device_ids,
                        "fulfilled": spot_market_request::is_fulfilled(request),
                        "error": error,
                    }
                })
            }
            None => serde_json::json!({
                "status": {
                    "requestId": null,
                    "href": null,
                    "state": state,
                    "deviceIds": [],
                    "fulfilled": false,
                    "error": error,
                }
            }),
        }
    }

    pub(crate) async fn patch_device_status(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let pp = PatchParams::default();
        self.device_api
            .patch_status(name, &pp, &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to update Device {} status: {}", name, e);
                ControllerError::Kube(e)
            })
    }

    pub(crate) async fn patch_virtual_network_status(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let pp = PatchParams::default();
        self.virtual_network_api
            .patch_status(name, &pp, &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to update VirtualNetwork {} status: {}", name, e);
                ControllerError::Kube(e)
            })
    }

    pub(crate) async fn patch_spot_market_request_status(
        &self,
        name: &str,
        patch: &serde_json::Value,
    ) -> Result<(), ControllerError> {
        let pp = PatchParams::default();
        self.spot_market_request_api
            .patch_status(name, &pp, &Patch::Merge(patch))
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to update SpotMarketRequest {} status: {}", name, e);
                ControllerError::Kube(e)
            })
    }

    /// Performs startup reconciliation to map existing provider devices back
    /// to Kubernetes CRs.
    ///
    /// Called when the controller starts up so that:
    /// 1. CRs created before a controller restart are mapped to their
    ///    provider device IDs
    /// 2. Devices provisioned out-of-band under a CR's hostname are adopted
    ///    instead of duplicated
    pub async fn startup_reconciliation(&self) -> Result<(), ControllerError> {
        info!("Starting startup reconciliation for Device resources...");

        let devices = match self.device_api.list(&Default::default()).await {
            Ok(list) => list,
            Err(e) => {
                error!("Failed to list Device CRs: {}", e);
                return Err(ControllerError::Kube(e));
            }
        };

        info!("Found {} Device CRs to reconcile", devices.items.len());

        let mut mapped_count = 0;
        let mut not_found_count = 0;

        for device_crd in devices.items {
            let name = device_crd.metadata.name.as_ref().ok_or_else(|| {
                ControllerError::InvalidConfig("Device missing name".to_string())
            })?;
            let namespace = device_crd.metadata.namespace.as_deref().unwrap_or("default");

            // Skip if already mapped to a provider device
            if let Some(status) = &device_crd.status {
                if status.device_id.is_some() {
                    continue;
                }
            }

            let hostname = &device_crd.spec.hostname;
            info!(
                "Mapping Device {}/{} (hostname: {}) to a provider device...",
                namespace, name, hostname
            );

            let found = match self
                .metal_client
                .find_device_by_hostname(&self.project_id, hostname)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!("Lookup for hostname {} failed: {}, skipping", hostname, e);
                    continue;
                }
            };

            if let Some(device) = found {
                let status_patch = Self::create_device_status_patch(
                    Some(&device),
                    ResourceState::Created,
                    None,
                );
                match self
                    .device_api
                    .patch_status(name, &PatchParams::default(), &Patch::Merge(&status_patch))
                    .await
                {
                    Ok(_) => {
                        info!(
                            "Mapped Device {}/{} to provider device {}",
                            namespace, name, device.id
                        );
                        mapped_count += 1;
                    }
                    Err(e) => {
                        error!("Failed to update Device {}/{} status: {}", namespace, name, e);
                    }
                }
            } else {
                not_found_count += 1;
            }
        }

        info!(
            "Startup reconciliation complete: {} mapped, {} not found",
            mapped_count, not_found_count
        );
        Ok(())
    }

    /// Get the Fibonacci backoff duration for a resource based on its error
    /// count
    ///
    /// Returns (backoff_seconds, error_count)
    pub fn get_backoff_for_resource(&self, resource_key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.error_count += 1;
                let backoff_seconds = state.backoff.next_backoff_seconds();
                (backoff_seconds, state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (60, 0)
            }
        }
    }

    /// Reset error tracking for a resource (on successful reconciliation)
    pub fn reset_error(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.error_count = 0;
                state.backoff.reset();
            }
        }
    }
}
