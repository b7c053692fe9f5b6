//! VirtualNetwork reconciler
//!
//! VLANs are created synchronously and are immutable at the provider apart
//! from their description, so the reconcile loop is: drift-check by ID,
//! adopt by VXLAN, create, and keep the description in sync.

use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::{
    check_existing, ensure_finalizer, remove_finalizer, status_needs_update,
};
use crds::{ResourceState, VirtualNetwork, VirtualNetworkSpec};
use metal_client::VirtualNetworkCreateRequest;

/// True when the spec's description differs from the observed one.
///
/// An unset spec description leaves the provider value alone.
pub(crate) fn description_needs_update(
    spec: &VirtualNetworkSpec,
    observed: &metal_client::VirtualNetwork,
) -> bool {
    spec.description.is_some() && spec.description != observed.description
}

/// Create request for the provider.
pub(crate) fn build_create_request(spec: &VirtualNetworkSpec) -> VirtualNetworkCreateRequest {
    VirtualNetworkCreateRequest {
        description: spec.description.clone(),
        metro: spec.metro.clone(),
        facility: spec.facility.clone(),
        vxlan: spec.vxlan,
    }
}

impl Reconciler {
    pub async fn reconcile_virtual_network(
        &self,
        vnet_crd: &VirtualNetwork,
    ) -> Result<Action, ControllerError> {
        let name = vnet_crd.metadata.name.as_ref().ok_or_else(|| {
            ControllerError::InvalidConfig("VirtualNetwork missing name".to_string())
        })?;
        let namespace = vnet_crd.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling VirtualNetwork {}/{}", namespace, name);

        // Deletion: remove the VLAN, then release the finalizer
        if vnet_crd.metadata.deletion_timestamp.is_some() {
            if let Some(vnet_id) = vnet_crd.status.as_ref().and_then(|s| s.vnet_id.as_deref()) {
                match self.metal_client.delete_virtual_network(vnet_id).await {
                    Ok(()) => {
                        info!("Deleted virtual network {} for {}/{}", vnet_id, namespace, name);
                    }
                    Err(e) if e.is_not_found() => {
                        debug!("Virtual network {} already gone at the provider", vnet_id);
                    }
                    Err(e) => return Err(ControllerError::Metal(e)),
                }
            }
            remove_finalizer(&self.virtual_network_api, vnet_crd, name).await?;
            return Ok(Action::await_change());
        }

        if ensure_finalizer(&self.virtual_network_api, vnet_crd, name).await? {
            debug!("Added finalizer to VirtualNetwork {}/{}", namespace, name);
        }

        // Observe by recorded provider ID, detecting drift
        let observed = if let Some(vnet_id) =
            vnet_crd.status.as_ref().and_then(|s| s.vnet_id.as_deref())
        {
            match check_existing(
                vnet_id,
                &format!("VirtualNetwork {}/{}", namespace, name),
                self.metal_client.get_virtual_network(vnet_id),
            )
            .await?
            {
                Some(vnet) => Some(vnet),
                None => {
                    let status_patch = Self::create_virtual_network_status_patch(
                        None,
                        ResourceState::Pending,
                        Some(
                            "Virtual network was deleted at the provider, will recreate"
                                .to_string(),
                        ),
                    );
                    if let Err(e) = self.patch_virtual_network_status(name, &status_patch).await {
                        warn!(
                            "Failed to clear VirtualNetwork status after drift detection: {}",
                            e
                        );
                    }
                    None
                }
            }
        } else {
            None
        };

        let (vnet, lifecycle) = match observed {
            Some(vnet) => {
                if description_needs_update(&vnet_crd.spec, &vnet) {
                    let description = vnet_crd.spec.description.as_deref().unwrap_or_default();
                    info!(
                        "Updating description of virtual network {} for {}/{}",
                        vnet.id, namespace, name
                    );
                    let updated = self
                        .metal_client
                        .update_virtual_network(&vnet.id, description)
                        .await?;
                    (updated, ResourceState::Updated)
                } else {
                    let lifecycle = match vnet_crd.status.as_ref().map(|s| &s.state) {
                        Some(ResourceState::Updated) => ResourceState::Updated,
                        _ => ResourceState::Created,
                    };
                    (vnet, lifecycle)
                }
            }
            None => {
                // Adopt an existing VLAN with the requested VXLAN ID before
                // creating a duplicate
                let existing = match vnet_crd.spec.vxlan {
                    Some(vxlan) => {
                        match self.metal_client.list_virtual_networks(&self.project_id).await {
                            Ok(vnets) => vnets.into_iter().find(|v| v.vxlan == vxlan),
                            Err(e) => {
                                debug!("VXLAN lookup failed, proceeding to create: {}", e);
                                None
                            }
                        }
                    }
                    None => None,
                };

                let vnet = match existing {
                    Some(vnet) => {
                        info!(
                            "VLAN {} already exists at the provider (ID: {}), adopting",
                            vnet.vxlan, vnet.id
                        );
                        vnet
                    }
                    None => {
                        let create = build_create_request(&vnet_crd.spec);
                        match self
                            .metal_client
                            .create_virtual_network(&self.project_id, &create)
                            .await
                        {
                            Ok(created) => {
                                info!(
                                    "Created virtual network {} (VXLAN {}) for {}/{}",
                                    created.id, created.vxlan, namespace, name
                                );
                                created
                            }
                            Err(e) => {
                                let error_msg = format!("Failed to create virtual network: {}", e);
                                let status_patch = Self::create_virtual_network_status_patch(
                                    None,
                                    ResourceState::Failed,
                                    Some(error_msg),
                                );
                                if let Err(patch_err) =
                                    self.patch_virtual_network_status(name, &status_patch).await
                                {
                                    warn!("Failed to record create failure: {}", patch_err);
                                }
                                return Err(ControllerError::Metal(e));
                            }
                        }
                    }
                };
                (vnet, ResourceState::Created)
            }
        };

        let vxlan_changed = vnet_crd
            .status
            .as_ref()
            .map_or(true, |s| s.vxlan != Some(vnet.vxlan));
        let needs_status_update = vxlan_changed
            || status_needs_update(
                vnet_crd.status.as_ref(),
                &vnet.id,
                vnet.href.as_deref(),
                &lifecycle,
                None,
            );
        if needs_status_update {
            let status_patch =
                Self::create_virtual_network_status_patch(Some(&vnet), lifecycle, None);
            self.patch_virtual_network_status(name, &status_patch).await?;
            info!(
                "Updated VirtualNetwork {}/{} status: provider ID {}",
                namespace, name, vnet.id
            );
        } else {
            debug!(
                "VirtualNetwork {}/{} already has correct status (ID: {}), skipping update",
                namespace, name, vnet.id
            );
        }

        Ok(Action::await_change())
    }
}
