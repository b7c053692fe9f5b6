//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test CRs and provider requests.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crds::{
    Device, DeviceSpec, SpotInstanceParameters, SpotMarketRequest, SpotMarketRequestSpec,
    VirtualNetwork, VirtualNetworkSpec,
};

/// Helper to create a test Device CRD
pub fn create_test_device(name: &str, namespace: &str, hostname: &str) -> Device {
    Device {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: DeviceSpec {
            hostname: hostname.to_string(),
            plan: "c3.small.x86".to_string(),
            operating_system: "ubuntu_24_04".to_string(),
            metro: Some("am".to_string()),
            facility: None,
            billing_cycle: None,
            user_data: None,
            user_data_ref: None,
            custom_data: None,
            ipxe_script_url: None,
            always_pxe: None,
            hardware_reservation_id: None,
            locked: None,
            tags: vec!["managed-by=metal-operator".to_string()],
            network_type: None,
            connection_secret_name: None,
        },
        status: None,
    }
}

/// Helper to create a test VirtualNetwork CRD
pub fn create_test_virtual_network(
    name: &str,
    namespace: &str,
    vxlan: Option<u16>,
) -> VirtualNetwork {
    VirtualNetwork {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: VirtualNetworkSpec {
            description: Some("test vlan".to_string()),
            metro: Some("am".to_string()),
            facility: None,
            vxlan,
        },
        status: None,
    }
}

/// Helper to create a test SpotMarketRequest CRD
pub fn create_test_spot_market_request(
    name: &str,
    namespace: &str,
    devices_min: u32,
    devices_max: u32,
) -> SpotMarketRequest {
    SpotMarketRequest {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: SpotMarketRequestSpec {
            devices_min,
            devices_max,
            max_bid_price: 0.15,
            end_at: None,
            force_termination: None,
            instance_parameters: SpotInstanceParameters {
                hostname: Some("spot-worker".to_string()),
                plan: "c3.small.x86".to_string(),
                operating_system: "ubuntu_24_04".to_string(),
                metro: Some("am".to_string()),
                facility: None,
                billing_cycle: None,
                user_data: None,
                tags: Vec::new(),
            },
        },
        status: None,
    }
}
