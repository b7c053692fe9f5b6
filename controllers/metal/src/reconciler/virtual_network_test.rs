//! Unit tests for the VirtualNetwork reconciler

use super::virtual_network::*;
use crate::test_utils::*;
use metal_client::{MetalClientTrait, MockMetalClient};

#[tokio::test]
async fn test_description_needs_update() {
    let mock = MockMetalClient::new("http://test-metal");
    let vnet_crd = create_test_virtual_network("test-vlan", "default", Some(1100));
    let observed = mock
        .create_virtual_network("test-project", &build_create_request(&vnet_crd.spec))
        .await
        .expect("mock create failed");

    // Created from the same spec: in sync
    assert!(!description_needs_update(&vnet_crd.spec, &observed));

    let mut changed = vnet_crd.spec.clone();
    changed.description = Some("renamed".to_string());
    assert!(description_needs_update(&changed, &observed));

    // Unset description leaves the provider value alone
    changed.description = None;
    assert!(!description_needs_update(&changed, &observed));
}

#[test]
fn test_build_create_request_maps_spec() {
    let vnet_crd = create_test_virtual_network("test-vlan", "default", Some(1100));

    let request = build_create_request(&vnet_crd.spec);
    assert_eq!(request.description.as_deref(), Some("test vlan"));
    assert_eq!(request.metro.as_deref(), Some("am"));
    assert!(request.facility.is_none());
    assert_eq!(request.vxlan, Some(1100));
}

#[tokio::test]
async fn test_mock_honors_requested_vxlan() {
    let mock = MockMetalClient::new("http://test-metal");
    let vnet_crd = create_test_virtual_network("test-vlan", "default", Some(1234));

    let created = mock
        .create_virtual_network("test-project", &build_create_request(&vnet_crd.spec))
        .await
        .expect("mock create failed");
    assert_eq!(created.vxlan, 1234);
    assert_eq!(created.metro_code.as_deref(), Some("am"));
}

#[tokio::test]
async fn test_mock_assigns_vxlan_when_unset() {
    let mock = MockMetalClient::new("http://test-metal");
    let vnet_crd = create_test_virtual_network("test-vlan", "default", None);

    let first = mock
        .create_virtual_network("test-project", &build_create_request(&vnet_crd.spec))
        .await
        .expect("mock create failed");
    let second = mock
        .create_virtual_network("test-project", &build_create_request(&vnet_crd.spec))
        .await
        .expect("mock create failed");
    assert_ne!(first.vxlan, second.vxlan, "assigned VXLANs must be distinct");
}

#[tokio::test]
async fn test_mock_virtual_network_lifecycle() {
    let mock = MockMetalClient::new("http://test-metal");
    let vnet_crd = create_test_virtual_network("test-vlan", "default", Some(1100));

    let created = mock
        .create_virtual_network("test-project", &build_create_request(&vnet_crd.spec))
        .await
        .expect("mock create failed");

    // Adoption lookup by VXLAN
    let listed = mock
        .list_virtual_networks("test-project")
        .await
        .expect("list failed");
    assert!(listed.iter().any(|v| v.vxlan == 1100));

    // Description update
    let updated = mock
        .update_virtual_network(&created.id, "renamed")
        .await
        .expect("update failed");
    assert_eq!(updated.description.as_deref(), Some("renamed"));

    // Delete, then the VLAN is gone
    mock.delete_virtual_network(&created.id)
        .await
        .expect("delete failed");
    let err = mock
        .get_virtual_network(&created.id)
        .await
        .expect_err("expected NotFound");
    assert!(err.is_not_found());
}
