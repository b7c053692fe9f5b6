//! Unit tests for the Device reconciler

use super::device::*;
use crate::test_utils::*;
use crds::{BillingCycle, DeviceState, NetworkType};
use metal_client::{MetalClientTrait, MockMetalClient};

async fn observed_device(
    mock: &MockMetalClient,
    device_crd: &crds::Device,
) -> metal_client::Device {
    let request = build_create_request(&device_crd.spec, None);
    mock.create_device("test-project", &request)
        .await
        .expect("mock create failed")
}

#[test]
fn test_map_device_state_ready() {
    assert!(map_device_state(metal_client::DeviceState::Active).is_ready());
    assert!(!map_device_state(metal_client::DeviceState::Provisioning).is_ready());
    assert!(!map_device_state(metal_client::DeviceState::Failed).is_ready());
}

#[test]
fn test_map_device_state_transitional() {
    assert!(map_device_state(metal_client::DeviceState::Queued).is_transitional());
    assert!(map_device_state(metal_client::DeviceState::Provisioning).is_transitional());
    assert!(map_device_state(metal_client::DeviceState::Reinstalling).is_transitional());
    assert!(!map_device_state(metal_client::DeviceState::Active).is_transitional());
    assert!(!map_device_state(metal_client::DeviceState::Failed).is_transitional());
}

#[tokio::test]
async fn test_diff_device_no_changes() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    let diff = diff_device(&device_crd.spec, &observed);
    assert!(!diff.fields);
    assert!(!diff.network_type);
}

#[tokio::test]
async fn test_diff_device_hostname_changed() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    device_crd.spec.hostname = "worker-1".to_string();
    let diff = diff_device(&device_crd.spec, &observed);
    assert!(diff.fields);
    assert!(!diff.network_type);
}

#[tokio::test]
async fn test_diff_device_tags_changed() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    device_crd.spec.tags.push("env=prod".to_string());
    assert!(diff_device(&device_crd.spec, &observed).fields);
}

#[tokio::test]
async fn test_diff_device_unset_optionals_are_not_drift() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");
    let mut observed = observed_device(&mock, &device_crd).await;

    // Provider-side values for fields the spec never set
    observed.locked = false;
    observed.always_pxe = false;
    observed.ipxe_script_url = Some("https://boot.example.com/ipxe".to_string());

    assert!(!diff_device(&device_crd.spec, &observed).fields);
}

#[tokio::test]
async fn test_diff_device_locked_changed() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    device_crd.spec.locked = Some(true);
    assert!(diff_device(&device_crd.spec, &observed).fields);
}

#[tokio::test]
async fn test_diff_device_network_type() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    // Mock devices come up layer3
    device_crd.spec.network_type = Some(NetworkType::Layer3);
    assert!(!diff_device(&device_crd.spec, &observed).network_type);

    device_crd.spec.network_type = Some(NetworkType::Hybrid);
    let diff = diff_device(&device_crd.spec, &observed);
    assert!(diff.network_type);
    assert!(!diff.fields);
}

#[tokio::test]
async fn test_late_initialize_fills_unset_fields() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");
    let observed = observed_device(&mock, &device_crd).await;

    let patch = late_initialize(&device_crd.spec, &observed).expect("expected a spec patch");
    let spec = &patch["spec"];
    // The mock defaults the billing cycle the way the provider does
    assert_eq!(spec["billingCycle"], "hourly");
    assert_eq!(spec["locked"], false);
    assert_eq!(spec["alwaysPxe"], false);
    // Observed has no iPXE URL, so none is late-initialized
    assert!(spec.get("ipxeScriptUrl").is_none());
}

#[tokio::test]
async fn test_late_initialize_complete_spec_needs_no_patch() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    device_crd.spec.billing_cycle = Some(BillingCycle::Hourly);
    device_crd.spec.locked = Some(false);
    device_crd.spec.always_pxe = Some(false);
    device_crd.spec.ipxe_script_url = Some("https://boot.example.com/ipxe".to_string());
    let observed = observed_device(&mock, &device_crd).await;

    assert!(late_initialize(&device_crd.spec, &observed).is_none());
}

#[test]
fn test_build_create_request_maps_spec() {
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    device_crd.spec.billing_cycle = Some(BillingCycle::Monthly);
    device_crd.spec.hardware_reservation_id = Some("next-available".to_string());

    let request = build_create_request(&device_crd.spec, Some("#cloud-config\n".to_string()));
    assert_eq!(request.hostname, "worker-0");
    assert_eq!(request.plan, "c3.small.x86");
    assert_eq!(request.operating_system, "ubuntu_24_04");
    assert_eq!(request.metro.as_deref(), Some("am"));
    assert_eq!(request.billing_cycle.as_deref(), Some("monthly"));
    assert_eq!(request.user_data.as_deref(), Some("#cloud-config\n"));
    assert_eq!(request.hardware_reservation_id.as_deref(), Some("next-available"));
    assert_eq!(request.tags, vec!["managed-by=metal-operator".to_string()]);
}

#[test]
fn test_build_update_request_omits_unset_optionals() {
    let device_crd = create_test_device("test-device", "default", "worker-0");

    let request = build_update_request(&device_crd.spec);
    assert_eq!(request.hostname.as_deref(), Some("worker-0"));
    assert!(request.locked.is_none());
    assert!(request.user_data.is_none());
    assert!(request.billing_cycle.is_none());
    assert_eq!(
        request.tags,
        Some(vec!["managed-by=metal-operator".to_string()])
    );
}

#[tokio::test]
async fn test_connection_secret_data() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");
    let mut observed = observed_device(&mock, &device_crd).await;
    observed.state = metal_client::DeviceState::Active;

    let data = connection_secret_data(&observed);
    // CIDR suffix is stripped from the published address
    assert_eq!(data.get("address").map(String::as_str), Some("147.75.100.2"));
    assert_eq!(data.get("username").map(String::as_str), Some("root"));
    assert_eq!(
        data.get("password").map(String::as_str),
        Some("mock-root-password")
    );
    assert_eq!(data.get("state").map(String::as_str), Some("active"));
}

#[tokio::test]
async fn test_connection_secret_data_without_password() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");
    let mut observed = observed_device(&mock, &device_crd).await;
    observed.root_password = None;

    let data = connection_secret_data(&observed);
    assert!(data.get("address").is_some());
    assert!(data.get("password").is_none());
}

#[test]
fn test_user_data_key_default() {
    assert_eq!(USER_DATA_KEY, "cloud-init");
}

#[tokio::test]
async fn test_mock_device_lifecycle() {
    let mock = MockMetalClient::new("http://test-metal");
    let device_crd = create_test_device("test-device", "default", "worker-0");

    // Create
    let created = observed_device(&mock, &device_crd).await;
    assert_eq!(created.state, metal_client::DeviceState::Provisioning);

    // Observe
    let fetched = mock.get_device(&created.id).await.expect("get failed");
    assert_eq!(fetched.hostname, "worker-0");

    // Adoption lookup
    let found = mock
        .find_device_by_hostname("test-project", "worker-0")
        .await
        .expect("lookup failed");
    assert_eq!(found.map(|d| d.id), Some(created.id.clone()));

    // Transition to active and convert network type
    mock.set_device_state(&created.id, metal_client::DeviceState::Active);
    let converted = mock
        .convert_network_type(&created.id, "hybrid")
        .await
        .expect("convert failed");
    assert_eq!(converted.network_type.as_deref(), Some("hybrid"));

    // Delete, then the device is gone
    mock.delete_device(&created.id, false).await.expect("delete failed");
    let err = mock.get_device(&created.id).await.expect_err("expected NotFound");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_mock_locked_device_requires_force_delete() {
    let mock = MockMetalClient::new("http://test-metal");
    let mut device_crd = create_test_device("test-device", "default", "worker-0");
    device_crd.spec.locked = Some(true);
    let created = observed_device(&mock, &device_crd).await;

    let err = mock
        .delete_device(&created.id, false)
        .await
        .expect_err("locked device must not delete without force");
    assert!(!err.is_not_found());

    mock.delete_device(&created.id, true)
        .await
        .expect("force delete failed");
}

#[tokio::test]
#[ignore] // Requires Kubernetes API mocking for Api<Device> and patch_status
async fn test_reconcile_device_full_pass() {
    // Setup: mock provider with no existing device
    let _mock = MockMetalClient::new("http://test-metal");
    let _device_crd = create_test_device("test-device", "default", "worker-0");

    // A full reconcile pass needs a kube::Client to patch the CR's finalizers
    // and status; cover create + status + requeue once a kube test harness is
    // wired up (kube::client::Body + tower_test mock service).
}
