//! Device reconciler
//!
//! Drives a Device CR toward a provisioned bare-metal server: observe by
//! provider ID, adopt or create when missing, late-initialize defaulted spec
//! fields, convert network type before other updates, and publish connection
//! details once known.

use std::collections::BTreeMap;
use std::time::Duration;

use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, Patch, PatchParams};
use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::{
    check_existing, device_status_needs_update, ensure_finalizer, remove_finalizer,
};
use crds::{Device, DeviceAddress, DeviceSpec, DeviceState, ResourceState, UserDataRefKind};
use metal_client::{DeviceCreateRequest, DeviceUpdateRequest};

/// Default data key read from a userDataRef target
pub(crate) const USER_DATA_KEY: &str = "cloud-init";

/// How often to poll a device that the provider is still transitioning
const PROVISIONING_REQUEUE: Duration = Duration::from_secs(30);

/// Map the provider's wire state onto the CRD state enum.
pub(crate) fn map_device_state(state: metal_client::DeviceState) -> DeviceState {
    match state {
        metal_client::DeviceState::Queued => DeviceState::Queued,
        metal_client::DeviceState::Provisioning => DeviceState::Provisioning,
        metal_client::DeviceState::Active => DeviceState::Active,
        metal_client::DeviceState::Inactive => DeviceState::Inactive,
        metal_client::DeviceState::Deprovisioning => DeviceState::Deprovisioning,
        metal_client::DeviceState::Failed => DeviceState::Failed,
        metal_client::DeviceState::PoweringOff => DeviceState::PoweringOff,
        metal_client::DeviceState::Reinstalling => DeviceState::Reinstalling,
    }
}

fn device_state_label(state: DeviceState) -> &'static str {
    match state {
        DeviceState::Queued => "queued",
        DeviceState::Provisioning => "provisioning",
        DeviceState::Active => "active",
        DeviceState::Inactive => "inactive",
        DeviceState::Deprovisioning => "deprovisioning",
        DeviceState::Failed => "failed",
        DeviceState::PoweringOff => "powering_off",
        DeviceState::Reinstalling => "reinstalling",
    }
}

/// Addresses assigned to a device, in status form.
pub(crate) fn observed_addresses(device: &metal_client::Device) -> Vec<DeviceAddress> {
    device
        .ip_addresses
        .iter()
        .map(|ip| DeviceAddress {
            address: ip.address.clone(),
            public: ip.public,
            family: ip.address_family,
        })
        .collect()
}

/// Result of diffing a Device spec against the observed provider device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DeviceDiff {
    /// Some updatable field differs
    pub fields: bool,
    /// The network bonding mode differs; converted before any field update
    pub network_type: bool,
}

/// Diff the desired spec against an observed device.
///
/// Optional spec fields that were never set do not count as drift; they are
/// provider defaults picked up by late-initialization instead.
pub(crate) fn diff_device(spec: &DeviceSpec, observed: &metal_client::Device) -> DeviceDiff {
    let fields = spec.hostname != observed.hostname
        || spec.tags != observed.tags
        || spec.locked.is_some_and(|locked| locked != observed.locked)
        || spec
            .always_pxe
            .is_some_and(|always_pxe| always_pxe != observed.always_pxe)
        || (spec.ipxe_script_url.is_some() && spec.ipxe_script_url != observed.ipxe_script_url)
        || (spec.user_data.is_some() && spec.user_data != observed.user_data);

    let network_type = spec
        .network_type
        .is_some_and(|nt| observed.network_type.as_deref() != Some(nt.as_str()));

    DeviceDiff {
        fields,
        network_type,
    }
}

/// Spec merge patch filling in optional fields the provider defaulted.
///
/// Returns None when the spec is already fully specified.
pub(crate) fn late_initialize(
    spec: &DeviceSpec,
    observed: &metal_client::Device,
) -> Option<serde_json::Value> {
    let mut fields = serde_json::Map::new();

    if spec.billing_cycle.is_none() {
        if let Some(cycle) = &observed.billing_cycle {
            fields.insert("billingCycle".to_string(), serde_json::json!(cycle));
        }
    }
    if spec.locked.is_none() {
        fields.insert("locked".to_string(), serde_json::json!(observed.locked));
    }
    if spec.always_pxe.is_none() {
        fields.insert(
            "alwaysPxe".to_string(),
            serde_json::json!(observed.always_pxe),
        );
    }
    if spec.ipxe_script_url.is_none() {
        if let Some(url) = &observed.ipxe_script_url {
            fields.insert("ipxeScriptUrl".to_string(), serde_json::json!(url));
        }
    }

    if fields.is_empty() {
        None
    } else {
        Some(serde_json::json!({ "spec": fields }))
    }
}

/// Create request for the provider, with user-data already resolved.
pub(crate) fn build_create_request(
    spec: &DeviceSpec,
    user_data: Option<String>,
) -> DeviceCreateRequest {
    DeviceCreateRequest {
        hostname: spec.hostname.clone(),
        plan: spec.plan.clone(),
        operating_system: spec.operating_system.clone(),
        metro: spec.metro.clone(),
        facility: spec.facility.clone(),
        billing_cycle: spec.billing_cycle.map(|c| c.as_str().to_string()),
        user_data,
        custom_data: spec.custom_data.clone(),
        ipxe_script_url: spec.ipxe_script_url.clone(),
        always_pxe: spec.always_pxe,
        locked: spec.locked,
        hardware_reservation_id: spec.hardware_reservation_id.clone(),
        tags: spec.tags.clone(),
    }
}

/// Update request carrying every updatable field from the spec.
///
/// Unset optional fields are omitted and left untouched at the provider.
pub(crate) fn build_update_request(spec: &DeviceSpec) -> DeviceUpdateRequest {
    DeviceUpdateRequest {
        hostname: Some(spec.hostname.clone()),
        user_data: spec.user_data.clone(),
        locked: spec.locked,
        always_pxe: spec.always_pxe,
        ipxe_script_url: spec.ipxe_script_url.clone(),
        custom_data: spec.custom_data.clone(),
        billing_cycle: spec.billing_cycle.map(|c| c.as_str().to_string()),
        tags: Some(spec.tags.clone()),
    }
}

/// Connection details published for a device.
///
/// The root password is only served by the provider for ~24h after
/// provisioning; the secret is written with whatever is known.
pub(crate) fn connection_secret_data(device: &metal_client::Device) -> BTreeMap<String, String> {
    let mut data = BTreeMap::new();

    if let Some(ip) = device
        .ip_addresses
        .iter()
        .find(|ip| ip.public && ip.address_family == 4)
    {
        let address = ip.address.split('/').next().unwrap_or(&ip.address);
        data.insert("address".to_string(), address.to_string());
    }
    data.insert("username".to_string(), "root".to_string());
    if let Some(password) = &device.root_password {
        data.insert("password".to_string(), password.clone());
    }
    data.insert(
        "state".to_string(),
        device_state_label(map_device_state(device.state)).to_string(),
    );

    data
}

/// Requeue while the provider is still transitioning the device.
fn requeue_for(device: &metal_client::Device) -> Action {
    if map_device_state(device.state).is_transitional() {
        Action::requeue(PROVISIONING_REQUEUE)
    } else {
        Action::await_change()
    }
}

impl Reconciler {
    pub async fn reconcile_device(&self, device_crd: &Device) -> Result<Action, ControllerError> {
        let name = device_crd
            .metadata
            .name
            .as_ref()
            .ok_or_else(|| ControllerError::InvalidConfig("Device missing name".to_string()))?;
        let namespace = device_crd.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling Device {}/{}", namespace, name);

        // Deletion: tear down the external device, then release the finalizer
        if device_crd.metadata.deletion_timestamp.is_some() {
            // Fall back to a hostname lookup in case the create succeeded but
            // the status patch recording the ID never did
            let device_id = match device_crd.status.as_ref().and_then(|s| s.device_id.clone()) {
                Some(device_id) => Some(device_id),
                None => self
                    .metal_client
                    .find_device_by_hostname(&self.project_id, &device_crd.spec.hostname)
                    .await?
                    .map(|d| d.id),
            };
            if let Some(device_id) = device_id {
                match self.metal_client.delete_device(&device_id, false).await {
                    Ok(()) => info!("Deleted device {} for {}/{}", device_id, namespace, name),
                    Err(e) if e.is_not_found() => {
                        debug!("Device {} already gone at the provider", device_id);
                    }
                    // Finalizer stays until the delete goes through
                    Err(e) => return Err(ControllerError::Metal(e)),
                }
            }
            remove_finalizer(&self.device_api, device_crd, name).await?;
            return Ok(Action::await_change());
        }

        // The finalizer must be in place before anything external is created
        if ensure_finalizer(&self.device_api, device_crd, name).await? {
            debug!("Added finalizer to Device {}/{}", namespace, name);
        }

        // Observe: fetch by the recorded provider ID, detecting drift
        let observed = if let Some(device_id) =
            device_crd.status.as_ref().and_then(|s| s.device_id.as_deref())
        {
            match check_existing(
                device_id,
                &format!("Device {}/{}", namespace, name),
                self.metal_client.get_device(device_id),
            )
            .await?
            {
                Some(device) => Some(device),
                None => {
                    // Drift: clear the external identity and recreate below
                    let status_patch = Self::create_device_status_patch(
                        None,
                        ResourceState::Pending,
                        Some("Device was deleted at the provider, will recreate".to_string()),
                    );
                    if let Err(e) = self.patch_device_status(name, &status_patch).await {
                        warn!("Failed to clear Device status after drift detection: {}", e);
                    }
                    None
                }
            }
        } else {
            None
        };

        let (device, lifecycle) = match observed {
            Some(device) => {
                // Write provider-defaulted optional fields back into the spec
                if let Some(spec_patch) = late_initialize(&device_crd.spec, &device) {
                    info!("Late-initializing Device {}/{} spec", namespace, name);
                    self.device_api
                        .patch(name, &PatchParams::default(), &Patch::Merge(&spec_patch))
                        .await?;
                }

                let diff = diff_device(&device_crd.spec, &device);

                if diff.network_type {
                    // Convert first and finish the pass; remaining field
                    // updates happen on subsequent reconciles once the ports
                    // have been rebonded
                    if let Some(network_type) = device_crd.spec.network_type {
                        info!(
                            "Converting Device {}/{} to network type {}",
                            namespace,
                            name,
                            network_type.as_str()
                        );
                        let converted = self
                            .metal_client
                            .convert_network_type(&device.id, network_type.as_str())
                            .await?;
                        let status_patch = Self::create_device_status_patch(
                            Some(&converted),
                            ResourceState::Updated,
                            None,
                        );
                        self.patch_device_status(name, &status_patch).await?;
                        return Ok(Action::requeue(PROVISIONING_REQUEUE));
                    }
                }

                if diff.fields {
                    info!("Device {}/{} spec changed, updating at the provider", namespace, name);
                    let updated = self
                        .metal_client
                        .update_device(&device.id, &build_update_request(&device_crd.spec))
                        .await?;
                    (updated, ResourceState::Updated)
                } else {
                    // Preserve Updated once set; otherwise the resource is Created
                    let lifecycle = match device_crd.status.as_ref().map(|s| &s.state) {
                        Some(ResourceState::Updated) => ResourceState::Updated,
                        _ => ResourceState::Created,
                    };
                    (device, lifecycle)
                }
            }
            None => {
                let user_data = self.resolve_user_data(device_crd, namespace).await?;

                // Adopt an existing provider device with this hostname before
                // creating a duplicate
                let existing = match self
                    .metal_client
                    .find_device_by_hostname(&self.project_id, &device_crd.spec.hostname)
                    .await
                {
                    Ok(existing) => existing,
                    Err(e) => {
                        debug!("Hostname lookup failed, proceeding to create: {}", e);
                        None
                    }
                };

                let device = match existing {
                    Some(device) => {
                        info!(
                            "Device with hostname {} already exists at the provider (ID: {}), adopting",
                            device_crd.spec.hostname, device.id
                        );
                        device
                    }
                    None => {
                        let create = build_create_request(&device_crd.spec, user_data);
                        match self.metal_client.create_device(&self.project_id, &create).await {
                            Ok(created) => {
                                info!(
                                    "Created device {} for {}/{}",
                                    created.id, namespace, name
                                );
                                created
                            }
                            Err(e) => {
                                let error_msg = format!("Failed to create device: {}", e);
                                let status_patch = Self::create_device_status_patch(
                                    None,
                                    ResourceState::Failed,
                                    Some(error_msg),
                                );
                                if let Err(patch_err) =
                                    self.patch_device_status(name, &status_patch).await
                                {
                                    warn!("Failed to record create failure: {}", patch_err);
                                }
                                return Err(ControllerError::Metal(e));
                            }
                        }
                    }
                };
                (device, ResourceState::Created)
            }
        };

        // Status: skip the write when nothing observable changed
        let provider_state = map_device_state(device.state);
        let addresses = observed_addresses(&device);
        let needs_status_update = device_status_needs_update(
            device_crd.status.as_ref(),
            &device.id,
            device.href.as_deref(),
            &lifecycle,
            Some(provider_state),
            provider_state.is_ready(),
            &addresses,
            None,
        );
        if needs_status_update {
            let status_patch = Self::create_device_status_patch(Some(&device), lifecycle, None);
            self.patch_device_status(name, &status_patch).await?;
        } else {
            debug!(
                "Device {}/{} already has correct status (ID: {}), skipping update",
                namespace, name, device.id
            );
        }

        self.publish_connection_secret(device_crd, name, namespace, &device)
            .await?;

        Ok(requeue_for(&device))
    }

    /// Resolve the user-data payload for a device.
    ///
    /// Inline `userData` wins over `userDataRef`. A missing ref target or key
    /// is an error unless the ref is marked optional.
    pub(crate) async fn resolve_user_data(
        &self,
        device_crd: &Device,
        namespace: &str,
    ) -> Result<Option<String>, ControllerError> {
        if let Some(inline) = &device_crd.spec.user_data {
            return Ok(Some(inline.clone()));
        }
        let Some(user_data_ref) = &device_crd.spec.user_data_ref else {
            return Ok(None);
        };

        let ref_namespace = user_data_ref.namespace.as_deref().unwrap_or(namespace);
        let key = user_data_ref.key.as_deref().unwrap_or(USER_DATA_KEY);
        let kind_label = match user_data_ref.kind {
            UserDataRefKind::ConfigMap => "ConfigMap",
            UserDataRefKind::Secret => "Secret",
        };

        let value = match user_data_ref.kind {
            UserDataRefKind::ConfigMap => {
                let api: Api<ConfigMap> =
                    Api::namespaced(self.kube_client.clone(), ref_namespace);
                match api.get(&user_data_ref.name).await {
                    Ok(config_map) => {
                        config_map.data.and_then(|data| data.get(key).cloned())
                    }
                    Err(e) => {
                        if user_data_ref.optional {
                            warn!(
                                "Optional userDataRef {}/{} unavailable: {}",
                                ref_namespace, user_data_ref.name, e
                            );
                            return Ok(None);
                        }
                        return Err(ControllerError::UserDataRef(format!(
                            "cannot get ConfigMap {}/{}: {}",
                            ref_namespace, user_data_ref.name, e
                        )));
                    }
                }
            }
            UserDataRefKind::Secret => {
                let api: Api<Secret> = Api::namespaced(self.kube_client.clone(), ref_namespace);
                match api.get(&user_data_ref.name).await {
                    Ok(secret) => match secret.data.and_then(|data| data.get(key).cloned()) {
                        Some(bytes) => Some(String::from_utf8(bytes.0).map_err(|_| {
                            ControllerError::UserDataRef(format!(
                                "key {:?} in Secret {}/{} is not valid UTF-8",
                                key, ref_namespace, user_data_ref.name
                            ))
                        })?),
                        None => None,
                    },
                    Err(e) => {
                        if user_data_ref.optional {
                            warn!(
                                "Optional userDataRef {}/{} unavailable: {}",
                                ref_namespace, user_data_ref.name, e
                            );
                            return Ok(None);
                        }
                        return Err(ControllerError::UserDataRef(format!(
                            "cannot get Secret {}/{}: {}",
                            ref_namespace, user_data_ref.name, e
                        )));
                    }
                }
            }
        };

        match value {
            Some(user_data) => Ok(Some(user_data)),
            None if user_data_ref.optional => Ok(None),
            None => Err(ControllerError::UserDataRef(format!(
                "key {:?} not found in {} {}/{}",
                key, kind_label, ref_namespace, user_data_ref.name
            ))),
        }
    }

    /// Publish connection details into the Secret named by the spec.
    ///
    /// Server-side apply keeps the secret current across reconciles; the
    /// owner reference ties its lifetime to the Device CR.
    pub(crate) async fn publish_connection_secret(
        &self,
        device_crd: &Device,
        name: &str,
        namespace: &str,
        device: &metal_client::Device,
    ) -> Result<(), ControllerError> {
        let Some(secret_name) = &device_crd.spec.connection_secret_name else {
            return Ok(());
        };

        let mut secret = serde_json::json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {
                "name": secret_name,
                "namespace": namespace,
            },
            "type": "Opaque",
            "stringData": connection_secret_data(device),
        });
        if let Some(uid) = &device_crd.metadata.uid {
            secret["metadata"]["ownerReferences"] = serde_json::json!([{
                "apiVersion": "metalops.io/v1alpha1",
                "kind": "Device",
                "name": name,
                "uid": uid,
                "controller": true,
                "blockOwnerDeletion": true,
            }]);
        }

        let api: Api<Secret> = Api::namespaced(self.kube_client.clone(), namespace);
        api.patch(
            secret_name,
            &PatchParams::apply("metal-controller").force(),
            &Patch::Apply(&secret),
        )
        .await?;
        debug!(
            "Published connection secret {}/{} for Device {}",
            namespace, secret_name, name
        );
        Ok(())
    }
}
