//! Unit tests for the SpotMarketRequest reconciler

use super::spot_market_request::*;
use crate::test_utils::*;
use crds::BillingCycle;
use metal_client::{MetalClientTrait, MockMetalClient};

async fn placed_request(
    mock: &MockMetalClient,
    request_crd: &crds::SpotMarketRequest,
) -> metal_client::SpotMarketRequest {
    mock.create_spot_market_request("test-project", &build_create_request(&request_crd.spec))
        .await
        .expect("mock create failed")
}

async fn spot_devices(mock: &MockMetalClient, count: usize) -> Vec<metal_client::Device> {
    let mut devices = Vec::new();
    for i in 0..count {
        let request = metal_client::DeviceCreateRequest {
            hostname: format!("spot-worker-{}", i),
            plan: "c3.small.x86".to_string(),
            operating_system: "ubuntu_24_04".to_string(),
            ..Default::default()
        };
        devices.push(
            mock.create_device("test-project", &request)
                .await
                .expect("mock device create failed"),
        );
    }
    devices
}

#[test]
fn test_build_create_request_maps_spec() {
    let mut request_crd = create_test_spot_market_request("test-spot", "default", 2, 4);
    request_crd.spec.instance_parameters.billing_cycle = Some(BillingCycle::Hourly);

    let request = build_create_request(&request_crd.spec);
    assert_eq!(request.devices_min, 2);
    assert_eq!(request.devices_max, 4);
    assert!((request.max_bid_price - 0.15).abs() < f64::EPSILON);
    assert_eq!(
        request.instance_parameters.hostname.as_deref(),
        Some("spot-worker")
    );
    assert_eq!(request.instance_parameters.plan, "c3.small.x86");
    assert_eq!(
        request.instance_parameters.billing_cycle.as_deref(),
        Some("hourly")
    );
}

#[tokio::test]
async fn test_is_fulfilled_at_devices_min() {
    let mock = MockMetalClient::new("http://test-metal");
    let request_crd = create_test_spot_market_request("test-spot", "default", 2, 4);
    let placed = placed_request(&mock, &request_crd).await;

    // Freshly placed: nothing provisioned yet
    assert!(!is_fulfilled(&placed));

    // One device is not enough
    mock.fulfill_spot_market_request(&placed.id, spot_devices(&mock, 1).await);
    let observed = mock
        .get_spot_market_request(&placed.id, true)
        .await
        .expect("get failed");
    assert!(!is_fulfilled(&observed));

    // devices_min satisfied
    mock.fulfill_spot_market_request(&placed.id, spot_devices(&mock, 2).await);
    let observed = mock
        .get_spot_market_request(&placed.id, true)
        .await
        .expect("get failed");
    assert!(is_fulfilled(&observed));
}

#[tokio::test]
async fn test_mock_rejects_inverted_bounds() {
    let mock = MockMetalClient::new("http://test-metal");
    let request_crd = create_test_spot_market_request("test-spot", "default", 5, 2);

    let err = mock
        .create_spot_market_request("test-project", &build_create_request(&request_crd.spec))
        .await
        .expect_err("devices_min > devices_max must be rejected");
    assert!(matches!(err, metal_client::MetalError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_mock_get_without_includes_omits_devices() {
    let mock = MockMetalClient::new("http://test-metal");
    let request_crd = create_test_spot_market_request("test-spot", "default", 1, 1);
    let placed = placed_request(&mock, &request_crd).await;
    mock.fulfill_spot_market_request(&placed.id, spot_devices(&mock, 1).await);

    let with_devices = mock
        .get_spot_market_request(&placed.id, true)
        .await
        .expect("get failed");
    assert_eq!(with_devices.devices.len(), 1);

    let without_devices = mock
        .get_spot_market_request(&placed.id, false)
        .await
        .expect("get failed");
    assert!(without_devices.devices.is_empty());
}

#[tokio::test]
async fn test_mock_spot_market_request_lifecycle() {
    let mock = MockMetalClient::new("http://test-metal");
    let request_crd = create_test_spot_market_request("test-spot", "default", 1, 2);
    let placed = placed_request(&mock, &request_crd).await;

    mock.delete_spot_market_request(&placed.id, true)
        .await
        .expect("delete failed");
    let err = mock
        .get_spot_market_request(&placed.id, false)
        .await
        .expect_err("expected NotFound");
    assert!(err.is_not_found());
}
