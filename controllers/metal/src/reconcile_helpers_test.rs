//! Unit tests for reconcile_helpers module

use crate::reconcile_helpers::*;
use crds::{DeviceAddress, DeviceState, DeviceStatus, ResourceState, VirtualNetworkStatus};

fn device_status() -> DeviceStatus {
    DeviceStatus {
        device_id: Some("d7fd40f1".to_string()),
        href: Some("https://api.example.com/metal/v1/devices/d7fd40f1".to_string()),
        state: ResourceState::Created,
        provider_state: Some(DeviceState::Active),
        ready: true,
        ip_addresses: vec![DeviceAddress {
            address: "147.75.100.2/31".to_string(),
            public: true,
            family: 4,
        }],
        locked: Some(false),
        error: None,
        last_reconciled: None,
    }
}

#[test]
fn test_status_needs_update_no_status() {
    let needs_update = status_needs_update::<DeviceStatus>(
        None,
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        None,
    );
    assert!(needs_update, "Should need update when status is None");
}

#[test]
fn test_status_needs_update_all_match() {
    let status = device_status();
    let needs_update = status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        None,
    );
    assert!(!needs_update, "Should not need update when all fields match");
}

#[test]
fn test_status_needs_update_id_changed() {
    let status = device_status();
    let needs_update = status_needs_update(
        Some(&status),
        "other-device",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        None,
    );
    assert!(needs_update, "Should need update when the provider ID changes");
}

#[test]
fn test_status_needs_update_state_changed() {
    let status = device_status();
    let needs_update = status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Updated,
        None,
    );
    assert!(needs_update, "Should need update when lifecycle state changes");
}

#[test]
fn test_status_needs_update_error_changed() {
    let status = device_status();
    let needs_update = status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        Some("provider API error"),
    );
    assert!(needs_update, "Should need update when the error message changes");
}

#[test]
fn test_status_needs_update_for_virtual_network() {
    let status = VirtualNetworkStatus {
        vnet_id: Some("vlan-1".to_string()),
        href: None,
        vxlan: Some(1100),
        metro_code: Some("am".to_string()),
        state: ResourceState::Created,
        error: None,
        last_reconciled: None,
    };
    assert!(!status_needs_update(
        Some(&status),
        "vlan-1",
        None,
        &ResourceState::Created,
        None,
    ));
    assert!(status_needs_update(
        Some(&status),
        "vlan-2",
        None,
        &ResourceState::Created,
        None,
    ));
}

#[test]
fn test_device_status_needs_update_provider_state_changed() {
    let status = device_status();
    let addresses = status.ip_addresses.clone();

    // Same common fields, but the provider moved the device out of active
    let needs_update = device_status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        Some(DeviceState::Reinstalling),
        false,
        &addresses,
        None,
    );
    assert!(needs_update, "Provider state transitions must be recorded");
}

#[test]
fn test_device_status_needs_update_addresses_changed() {
    let status = device_status();
    let addresses = vec![DeviceAddress {
        address: "147.75.200.2/31".to_string(),
        public: true,
        family: 4,
    }];

    let needs_update = device_status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        Some(DeviceState::Active),
        true,
        &addresses,
        None,
    );
    assert!(needs_update, "Address changes must be recorded");
}

#[test]
fn test_device_status_needs_update_all_match() {
    let status = device_status();
    let addresses = status.ip_addresses.clone();

    let needs_update = device_status_needs_update(
        Some(&status),
        "d7fd40f1",
        Some("https://api.example.com/metal/v1/devices/d7fd40f1"),
        &ResourceState::Created,
        Some(DeviceState::Active),
        true,
        &addresses,
        None,
    );
    assert!(!needs_update);
}

#[test]
fn test_finalizers_with_appends_once() {
    let existing = vec!["other.io/finalizer".to_string()];
    let updated = finalizers_with(&existing, FINALIZER);
    assert_eq!(updated.len(), 2);
    assert!(updated.iter().any(|f| f == FINALIZER));

    // Already present: no duplicate
    let unchanged = finalizers_with(&updated, FINALIZER);
    assert_eq!(unchanged.len(), 2);
}

#[test]
fn test_finalizers_without_removes_only_ours() {
    let existing = vec!["other.io/finalizer".to_string(), FINALIZER.to_string()];
    let updated = finalizers_without(&existing, FINALIZER);
    assert_eq!(updated, vec!["other.io/finalizer".to_string()]);

    // Not present: unchanged
    let unchanged = finalizers_without(&updated, FINALIZER);
    assert_eq!(unchanged, updated);
}
