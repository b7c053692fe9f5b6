//! Device CRD
//!
//! Declares a bare-metal server that the operator provisions and manages
//! at the cloud provider.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::references::UserDataRef;
use crate::state::ResourceState;

/// DeviceSpec defines the desired state of a bare-metal device
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "metalops.io",
    version = "v1alpha1",
    kind = "Device",
    namespaced,
    status = "DeviceStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    /// Hostname of the device
    pub hostname: String,

    /// Hardware plan slug (e.g. "c3.small.x86")
    pub plan: String,

    /// Operating system slug (e.g. "ubuntu_24_04")
    pub operating_system: String,

    /// Metro code to provision in (preferred placement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metro: Option<String>,

    /// Facility code to provision in (legacy placement)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facility: Option<String>,

    /// Billing cycle (defaults to hourly at the provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_cycle: Option<BillingCycle>,

    /// Inline user-data (cloud-init payload); takes precedence over userDataRef
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,

    /// Reference to a ConfigMap or Secret holding the user-data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_ref: Option<UserDataRef>,

    /// Arbitrary custom data attached to the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,

    /// URL of an iPXE script to boot from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipxe_script_url: Option<String>,

    /// Always boot via iPXE instead of only on first provision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub always_pxe: Option<bool>,

    /// Provision onto a specific hardware reservation ("next-available" allowed)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_reservation_id: Option<String>,

    /// Lock the device against accidental deletion at the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,

    /// Tags applied to the device
    #[serde(default)]
    pub tags: Vec<String>,

    /// Desired network bonding mode of the device's ports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_type: Option<NetworkType>,

    /// Name of a Secret in this namespace to publish connection details into
    /// (address, username, password, state)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_secret_name: Option<String>,
}

/// Billing cycle choices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl BillingCycle {
    /// Wire value used by the provider API.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Hourly => "hourly",
            BillingCycle::Daily => "daily",
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

/// Network bonding mode of a device's ports
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkType {
    Layer3,
    Hybrid,
    Layer2Bonded,
    Layer2Individual,
}

impl NetworkType {
    /// Wire value used by the provider API.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Layer3 => "layer3",
            NetworkType::Hybrid => "hybrid",
            NetworkType::Layer2Bonded => "layer2-bonded",
            NetworkType::Layer2Individual => "layer2-individual",
        }
    }
}

/// Provisioning state reported by the provider for a device
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
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

impl DeviceState {
    /// A device is ready once the provider reports it active.
    pub fn is_ready(&self) -> bool {
        matches!(self, DeviceState::Active)
    }

    /// States the provider transitions out of on its own; the reconciler
    /// polls while a device is in one of these.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            DeviceState::Queued
                | DeviceState::Provisioning
                | DeviceState::Deprovisioning
                | DeviceState::PoweringOff
                | DeviceState::Reinstalling
        )
    }
}

/// An IP address assigned to a device
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceAddress {
    /// The address in CIDR form (e.g. "147.75.1.2/31")
    pub address: String,

    /// Whether the address is publicly routable
    pub public: bool,

    /// Address family (4 or 6)
    pub family: u8,
}

/// DeviceStatus defines the observed state of a bare-metal device
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    /// Provider device ID (set after creation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Provider API URL of the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    /// Lifecycle state of the managed resource
    pub state: ResourceState,

    /// Provisioning state last observed at the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_state: Option<DeviceState>,

    /// True once the provider reports the device active
    #[serde(default)]
    pub ready: bool,

    /// IP addresses assigned to the device
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<DeviceAddress>,

    /// Observed lock state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,

    /// Error message if reconciliation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,
}
