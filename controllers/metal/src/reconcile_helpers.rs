//! Helper functions for common reconciliation patterns
//!
//! This module provides reusable functions to eliminate code duplication
//! across the Device, VirtualNetwork, and SpotMarketRequest reconcilers.

use kube::api::{Api, Patch, PatchParams};
use tracing::{debug, error, warn};

use crate::error::ControllerError;

/// Finalizer the controller places on every managed CR so the external
/// resource is deleted before the CR disappears.
pub const FINALIZER: &str = "metalops.io/cleanup";

/// Trait for provider resources that have an ID and an API URL
pub trait MetalResource {
    fn id(&self) -> &str;
    fn href(&self) -> Option<&str>;
}

impl MetalResource for metal_client::Device {
    fn id(&self) -> &str {
        &self.id
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}
impl MetalResource for metal_client::VirtualNetwork {
    fn id(&self) -> &str {
        &self.id
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}
impl MetalResource for metal_client::SpotMarketRequest {
    fn id(&self) -> &str {
        &self.id
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
}

/// Drift detection for an already-created external resource
///
/// Returns:
/// - `Ok(Some(resource))` if the resource still exists at the provider
/// - `Ok(None)` if it was deleted out-of-band (drift detected)
/// - `Err(e)` for transport/auth errors that should be retried
pub async fn check_existing<FGet, Resource>(
    external_id: &str,
    resource_name: &str,
    get_fn: FGet,
) -> Result<Option<Resource>, ControllerError>
where
    FGet: std::future::Future<Output = Result<Resource, metal_client::MetalError>> + Send,
    Resource: Clone + Send + Sync + MetalResource,
{
    match get_fn.await {
        Ok(existing) => {
            debug!("{} (ID: {}) exists at the provider", resource_name, external_id);
            Ok(Some(existing))
        }
        Err(metal_client::MetalError::NotFound(_)) => {
            warn!(
                "{} (ID: {}) was deleted at the provider (drift detected), will recreate",
                resource_name, external_id
            );
            Ok(None)
        }
        Err(e) => {
            // Other errors (auth, network) - don't assume deleted
            error!(
                "Failed to verify {} (ID: {}) exists: {}, will retry",
                resource_name, external_id, e
            );
            Err(ControllerError::Metal(e))
        }
    }
}

/// Trait for checking status values without needing specific CRD types
///
/// All managed-resource status types implement this trait so a single helper
/// can decide whether a status patch is actually needed.
pub trait StatusCheck {
    fn resource_id(&self) -> Option<&str>;
    fn href(&self) -> Option<&str>;
    fn state(&self) -> &crds::ResourceState;
    fn error(&self) -> Option<&str>;
}

impl StatusCheck for crds::DeviceStatus {
    fn resource_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
    fn state(&self) -> &crds::ResourceState {
        &self.state
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl StatusCheck for crds::VirtualNetworkStatus {
    fn resource_id(&self) -> Option<&str> {
        self.vnet_id.as_deref()
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
    fn state(&self) -> &crds::ResourceState {
        &self.state
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl StatusCheck for crds::SpotMarketRequestStatus {
    fn resource_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
    fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }
    fn state(&self) -> &crds::ResourceState {
        &self.state
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Check if a status patch is needed by comparing current status with the
/// desired values
///
/// Prevents unnecessary status updates that would re-trigger reconciliation.
pub fn status_needs_update<S: StatusCheck>(
    current_status: Option<&S>,
    desired_id: &str,
    desired_href: Option<&str>,
    desired_state: &crds::ResourceState,
    desired_error: Option<&str>,
) -> bool {
    match current_status {
        None => true,
        Some(status) => {
            status.resource_id() != Some(desired_id)
                || status.href() != desired_href
                || status.state() != desired_state
                || status.error() != desired_error
        }
    }
}

/// Extended status check for Device, which carries observed provider fields
/// on top of the common id/href/state/error set.
pub trait DeviceStatusCheck: StatusCheck {
    fn provider_state(&self) -> Option<crds::DeviceState>;
    fn ready(&self) -> bool;
    fn addresses(&self) -> &[crds::DeviceAddress];
}

impl DeviceStatusCheck for crds::DeviceStatus {
    fn provider_state(&self) -> Option<crds::DeviceState> {
        self.provider_state
    }
    fn ready(&self) -> bool {
        self.ready
    }
    fn addresses(&self) -> &[crds::DeviceAddress] {
        &self.ip_addresses
    }
}

/// Device status comparison including the observed provider fields
#[allow(clippy::too_many_arguments)]
pub fn device_status_needs_update<S: DeviceStatusCheck>(
    current_status: Option<&S>,
    desired_id: &str,
    desired_href: Option<&str>,
    desired_state: &crds::ResourceState,
    desired_provider_state: Option<crds::DeviceState>,
    desired_ready: bool,
    desired_addresses: &[crds::DeviceAddress],
    desired_error: Option<&str>,
) -> bool {
    if status_needs_update(
        current_status,
        desired_id,
        desired_href,
        desired_state,
        desired_error,
    ) {
        return true;
    }
    match current_status {
        None => true,
        Some(status) => {
            status.provider_state() != desired_provider_state
                || status.ready() != desired_ready
                || status.addresses() != desired_addresses
        }
    }
}

/// Finalizer list with `finalizer` appended (no-op when already present)
pub fn finalizers_with(existing: &[String], finalizer: &str) -> Vec<String> {
    let mut updated = existing.to_vec();
    if !existing.iter().any(|f| f == finalizer) {
        updated.push(finalizer.to_string());
    }
    updated
}

/// Finalizer list with `finalizer` removed
pub fn finalizers_without(existing: &[String], finalizer: &str) -> Vec<String> {
    existing.iter().filter(|f| *f != finalizer).cloned().collect()
}

/// Ensure the controller finalizer is present on a CR.
///
/// Returns true when the finalizer was added by this call.
pub async fn ensure_finalizer<K>(api: &Api<K>, obj: &K, name: &str) -> Result<bool, ControllerError>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let existing = obj.meta().finalizers.clone().unwrap_or_default();
    if existing.iter().any(|f| f == FINALIZER) {
        return Ok(false);
    }

    let patch = serde_json::json!({
        "metadata": { "finalizers": finalizers_with(&existing, FINALIZER) }
    });
    let pp = PatchParams::default();
    api.patch(name, &pp, &Patch::Merge(&patch)).await?;
    Ok(true)
}

/// Remove the controller finalizer from a CR, releasing it for deletion.
pub async fn remove_finalizer<K>(api: &Api<K>, obj: &K, name: &str) -> Result<(), ControllerError>
where
    K: kube::Resource<DynamicType = ()>
        + Clone
        + std::fmt::Debug
        + serde::de::DeserializeOwned,
{
    let existing = obj.meta().finalizers.clone().unwrap_or_default();
    if !existing.iter().any(|f| f == FINALIZER) {
        return Ok(());
    }

    let remaining = finalizers_without(&existing, FINALIZER);
    // A merge-patch null removes the key outright once no finalizers remain
    let value = if remaining.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::json!(remaining)
    };
    let patch = serde_json::json!({ "metadata": { "finalizers": value } });
    let pp = PatchParams::default();
    api.patch(name, &pp, &Patch::Merge(&patch)).await?;
    Ok(())
}
