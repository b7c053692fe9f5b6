//! SpotMarketRequest reconciler
//!
//! A spot market request is immutable at the provider once placed: the
//! reconcile loop creates it, then only observes fulfillment until the CR is
//! deleted. Spec changes after creation are not propagated.

use std::time::Duration;

use kube_runtime::controller::Action;
use tracing::{debug, info, warn};

use super::Reconciler;
use crate::error::ControllerError;
use crate::reconcile_helpers::{check_existing, ensure_finalizer, remove_finalizer};
use crds::{ResourceState, SpotMarketRequest, SpotMarketRequestSpec};
use metal_client::{SpotInstanceParameters, SpotMarketRequestCreateRequest};

/// How often to poll an unfulfilled request
const FULFILLMENT_REQUEUE: Duration = Duration::from_secs(60);

/// A request is fulfilled once the provider has provisioned at least
/// `devices_min` devices for it.
pub(crate) fn is_fulfilled(request: &metal_client::SpotMarketRequest) -> bool {
    request.devices.len() as u32 >= request.devices_min
}

/// Create request for the provider.
pub(crate) fn build_create_request(
    spec: &SpotMarketRequestSpec,
) -> SpotMarketRequestCreateRequest {
    let params = &spec.instance_parameters;
    SpotMarketRequestCreateRequest {
        devices_min: spec.devices_min,
        devices_max: spec.devices_max,
        max_bid_price: spec.max_bid_price,
        end_at: spec.end_at,
        instance_parameters: SpotInstanceParameters {
            hostname: params.hostname.clone(),
            plan: params.plan.clone(),
            operating_system: params.operating_system.clone(),
            metro: params.metro.clone(),
            facility: params.facility.clone(),
            billing_cycle: params.billing_cycle.map(|c| c.as_str().to_string()),
            user_data: params.user_data.clone(),
            tags: params.tags.clone(),
        },
    }
}

impl Reconciler {
    pub async fn reconcile_spot_market_request(
        &self,
        request_crd: &SpotMarketRequest,
    ) -> Result<Action, ControllerError> {
        let name = request_crd.metadata.name.as_ref().ok_or_else(|| {
            ControllerError::InvalidConfig("SpotMarketRequest missing name".to_string())
        })?;
        let namespace = request_crd.metadata.namespace.as_deref().unwrap_or("default");

        info!("Reconciling SpotMarketRequest {}/{}", namespace, name);

        // Deletion: withdraw the request, optionally terminating its devices
        if request_crd.metadata.deletion_timestamp.is_some() {
            if let Some(request_id) =
                request_crd.status.as_ref().and_then(|s| s.request_id.as_deref())
            {
                let force_termination = request_crd.spec.force_termination.unwrap_or(false);
                match self
                    .metal_client
                    .delete_spot_market_request(request_id, force_termination)
                    .await
                {
                    Ok(()) => info!(
                        "Deleted spot market request {} for {}/{} (force_termination: {})",
                        request_id, namespace, name, force_termination
                    ),
                    Err(e) if e.is_not_found() => {
                        debug!("Spot market request {} already gone at the provider", request_id);
                    }
                    Err(e) => return Err(ControllerError::Metal(e)),
                }
            }
            remove_finalizer(&self.spot_market_request_api, request_crd, name).await?;
            return Ok(Action::await_change());
        }

        if ensure_finalizer(&self.spot_market_request_api, request_crd, name).await? {
            debug!("Added finalizer to SpotMarketRequest {}/{}", namespace, name);
        }

        // Observe by recorded provider ID, detecting drift
        let observed = if let Some(request_id) =
            request_crd.status.as_ref().and_then(|s| s.request_id.as_deref())
        {
            match check_existing(
                request_id,
                &format!("SpotMarketRequest {}/{}", namespace, name),
                self.metal_client.get_spot_market_request(request_id, true),
            )
            .await?
            {
                Some(request) => Some(request),
                None => {
                    let status_patch = Self::create_spot_market_request_status_patch(
                        None,
                        ResourceState::Pending,
                        Some(
                            "Spot market request was deleted at the provider, will recreate"
                                .to_string(),
                        ),
                    );
                    if let Err(e) =
                        self.patch_spot_market_request_status(name, &status_patch).await
                    {
                        warn!(
                            "Failed to clear SpotMarketRequest status after drift detection: {}",
                            e
                        );
                    }
                    None
                }
            }
        } else {
            None
        };

        let request = match observed {
            Some(request) => request,
            None => {
                let create = build_create_request(&request_crd.spec);
                match self
                    .metal_client
                    .create_spot_market_request(&self.project_id, &create)
                    .await
                {
                    Ok(created) => {
                        info!(
                            "Created spot market request {} for {}/{} (bid {})",
                            created.id, namespace, name, created.max_bid_price
                        );
                        created
                    }
                    Err(e) => {
                        let error_msg = format!("Failed to create spot market request: {}", e);
                        let status_patch = Self::create_spot_market_request_status_patch(
                            None,
                            ResourceState::Failed,
                            Some(error_msg),
                        );
                        if let Err(patch_err) =
                            self.patch_spot_market_request_status(name, &status_patch).await
                        {
                            warn!("Failed to record create failure: {}", patch_err);
                        }
                        return Err(ControllerError::Metal(e));
                    }
                }
            }
        };

        let fulfilled = is_fulfilled(&request);
        let status_patch = Self::create_spot_market_request_status_patch(
            Some(&request),
            ResourceState::Created,
            None,
        );
        self.patch_spot_market_request_status(name, &status_patch).await?;

        if fulfilled {
            info!(
                "SpotMarketRequest {}/{} fulfilled with {} device(s)",
                namespace,
                name,
                request.devices.len()
            );
            Ok(Action::await_change())
        } else {
            debug!(
                "SpotMarketRequest {}/{} has {}/{} device(s), polling",
                namespace,
                name,
                request.devices.len(),
                request.devices_min
            );
            Ok(Action::requeue(FULFILLMENT_REQUEUE))
        }
    }
}
