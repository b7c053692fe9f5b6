//! VirtualNetwork CRD
//!
//! Declares a layer-2 virtual network (VLAN) in a project at the provider.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::state::ResourceState;

/// VirtualNetworkSpec defines the desired state of a virtual network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metalops.io",
    version = "v1alpha1",
    kind = "VirtualNetwork",
    namespaced,
    status = "VirtualNetworkStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkSpec {
    /// Human-readable description; the only field mutable after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Metro code the VLAN lives in (preferred placement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,

    /// Facility code the VLAN lives in (legacy placement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,

    /// Requested VXLAN ID (2-3999); the provider assigns one when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<u16>,
}

/// VirtualNetworkStatus defines the observed state of a virtual network
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkStatus {
    /// Provider virtual network ID (set after creation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnet_id: Option<String>,

    /// Provider API URL of the virtual network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// VXLAN ID assigned by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<u16>,

    /// Metro code the VLAN was placed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro_code: Option<String>,

    /// Lifecycle state of the managed resource
    pub state: ResourceState,

    /// Error message if reconciliation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}
