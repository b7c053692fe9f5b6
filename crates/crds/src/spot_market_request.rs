//! SpotMarketRequest CRD
//!
//! Declares a bid for spot-market capacity. The request itself is immutable
//! at the provider once placed; the operator only observes fulfillment and
//! deletes the request (optionally terminating its devices) on CR deletion.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::device::BillingCycle;
use crate::state::ResourceState;

/// SpotMarketRequestSpec defines the desired state of a spot market request
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metalops.io",
    version = "v1alpha1",
    kind = "SpotMarketRequest",
    namespaced,
    status = "SpotMarketRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SpotMarketRequestSpec {
    /// Minimum number of devices to provision
    pub devices_min: u32,

    /// Maximum number of devices to provision
    pub devices_max: u32,

    /// Maximum hourly bid price per device, in USD
    pub max_bid_price: f64,

    /// When the provider should terminate the request's devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Terminate still-running devices when the request is deleted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_termination: Option<bool>,

    /// Parameters applied to every device the request provisions
    pub instance_parameters: SpotInstanceParameters,
}

/// Device parameters for spot-provisioned instances
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpotInstanceParameters {
    /// Hostname (or hostname prefix) for provisioned devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    /// Hardware plan slug
    pub plan: String,

    /// Operating system slug
    pub operating_system: String,

    /// Metro code to provision in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,

    /// Facility code to provision in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,

    /// Billing cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,

    /// User-data (cloud-init payload) for provisioned devices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,

    /// Tags applied to provisioned devices
    #[serde(default)]
    pub tags: Vec<String>,
}

/// SpotMarketRequestStatus defines the observed state of a spot market request
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SpotMarketRequestStatus {
    /// Provider request ID (set after creation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    /// Provider API URL of the request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Lifecycle state of the managed resource
    pub state: ResourceState,

    /// IDs of devices provisioned to satisfy the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub device_ids: Vec<String>,

    /// True once at least devicesMin devices have been provisioned
    #[serde(default)]
    pub fulfilled: bool,

    /// Error message if reconciliation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}
