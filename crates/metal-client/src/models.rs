//! Provider API models
//!
//! These models match the provider's REST serializers for the device,
//! virtual-network, and spot-market endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::Page;

/// A link to another API resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Href {
    pub href: String,
}

/// Pagination block attached to list responses
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub next: Option<Href>,
    #[serde(default)]
    pub previous: Option<Href>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Provisioning state reported for a device
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    Queued,
    Provisioning,
    Active,
    Inactive,
    Deprovisioning,
    Failed,
    PoweringOff,
    Reinstalling,
}

/// Device model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
    pub hostname: String,
    pub state: DeviceState,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub billing_cycle: Option<String>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub always_pxe: bool,
    #[serde(default)]
    pub ipxe_script_url: Option<String>,
    #[serde(default, rename = "userdata")]
    pub user_data: Option<String>,
    #[serde(default)]
    pub network_type: Option<String>,
    #[serde(default)]
    pub plan: Option<NestedPlan>,
    #[serde(default)]
    pub operating_system: Option<NestedOperatingSystem>,
    #[serde(default)]
    pub metro: Option<NestedMetro>,
    #[serde(default)]
    pub facility: Option<NestedFacility>,
    #[serde(default)]
    pub hardware_reservation: Option<Href>,
    /// Only present for roughly 24h after provisioning
    #[serde(default)]
    pub root_password: Option<String>,
    #[serde(default)]
    pub ip_addresses: Vec<IpAddress>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// IP address assignment on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: String,
    pub address: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
    pub address_family: u8,
    pub public: bool,
    #[serde(default)]
    pub management: bool,
}

/// Request body for creating a device
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceCreateRequest {
    pub hostname: String,
    pub plan: String,
    pub operating_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(default, rename = "userdata", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipxe_script_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_pxe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_reservation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Request body for updating a device; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, rename = "userdata", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_pxe: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipxe_script_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

/// One page of a project's device list
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesPage {
    pub devices: Vec<Device>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Page for DevicesPage {
    type Item = Device;

    fn into_items(self) -> Vec<Device> {
        self.devices
    }

    fn next_href(&self) -> Option<String> {
        self.meta.as_ref()?.next.as_ref().map(|h| h.href.clone())
    }
}

/// Virtual network (VLAN) model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub vxlan: u16,
    #[serde(default)]
    pub facility_code: Option<String>,
    #[serde(default)]
    pub metro_code: Option<String>,
}

/// Request body for creating a virtual network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualNetworkCreateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vxlan: Option<u16>,
}

/// One page of a project's virtual network list
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualNetworksPage {
    pub virtual_networks: Vec<VirtualNetwork>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Page for VirtualNetworksPage {
    type Item = VirtualNetwork;

    fn into_items(self) -> Vec<VirtualNetwork> {
        self.virtual_networks
    }

    fn next_href(&self) -> Option<String> {
        self.meta.as_ref()?.next.as_ref().map(|h| h.href.clone())
    }
}

/// Spot market request model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarketRequest {
    pub id: String,
    #[serde(default)]
    pub href: Option<String>,
    pub devices_min: u32,
    pub devices_max: u32,
    pub max_bid_price: f64,
    #[serde(default)]
    pub end_at: Option<DateTime<Utc>>,
    /// Populated when the request is fetched with device includes
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Device parameters applied to every spot-provisioned instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpotInstanceParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub plan: String,
    pub operating_system: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<String>,
    #[serde(default, rename = "userdata", skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Request body for placing a spot market request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMarketRequestCreateRequest {
    pub devices_min: u32,
    pub devices_max: u32,
    pub max_bid_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    pub instance_parameters: SpotInstanceParameters,
}

/// One page of a project's spot market request list
#[derive(Debug, Clone, Deserialize)]
pub struct SpotMarketRequestsPage {
    pub spot_market_requests: Vec<SpotMarketRequest>,
    #[serde(default)]
    pub meta: Option<Meta>,
}

impl Page for SpotMarketRequestsPage {
    type Item = SpotMarketRequest;

    fn into_items(self) -> Vec<SpotMarketRequest> {
        self.spot_market_requests
    }

    fn next_href(&self) -> Option<String> {
        self.meta.as_ref()?.next.as_ref().map(|h| h.href.clone())
    }
}

// Nested serializers (simplified versions for references)

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedPlan {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedOperatingSystem {
    #[serde(default)]
    pub id: Option<String>,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub distro: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedMetro {
    pub id: String,
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NestedFacility {
    pub id: String,
    pub code: String,
    pub name: String,
}
