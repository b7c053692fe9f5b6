//! Mock MetalClient for unit testing
//!
//! This module provides a mock implementation of MetalClientTrait that can be
//! used in unit tests without requiring provider API access.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::MetalError;
use crate::metal_trait::MetalClientTrait;
use crate::models::*;

/// Mock MetalClient for testing
///
/// Stores resources in memory. Created devices start out `provisioning`;
/// tests drive state transitions with [`MockMetalClient::set_device_state`].
/// The mock is single-project: `project_id` arguments are accepted but not
/// used to partition the stores.
#[derive(Clone)]
pub struct MockMetalClient {
    base_url: String,
    devices: Arc<Mutex<HashMap<String, Device>>>,
    virtual_networks: Arc<Mutex<HashMap<String, VirtualNetwork>>>,
    spot_market_requests: Arc<Mutex<HashMap<String, SpotMarketRequest>>>,
    // Counter for assigning VXLAN IDs when the request leaves it unset
    next_vxlan: Arc<Mutex<u16>>,
}

impl MockMetalClient {
    /// Create a new mock client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            devices: Arc::new(Mutex::new(HashMap::new())),
            virtual_networks: Arc::new(Mutex::new(HashMap::new())),
            spot_market_requests: Arc::new(Mutex::new(HashMap::new())),
            next_vxlan: Arc::new(Mutex::new(1000)),
        }
    }

    /// Add a device to the mock store (for test setup)
    pub fn add_device(&self, device: Device) {
        self.devices.lock().unwrap().insert(device.id.clone(), device);
    }

    /// Add a virtual network to the mock store (for test setup)
    pub fn add_virtual_network(&self, vnet: VirtualNetwork) {
        self.virtual_networks
            .lock()
            .unwrap()
            .insert(vnet.id.clone(), vnet);
    }

    /// Add a spot market request to the mock store (for test setup)
    pub fn add_spot_market_request(&self, request: SpotMarketRequest) {
        self.spot_market_requests
            .lock()
            .unwrap()
            .insert(request.id.clone(), request);
    }

    /// Force a device into a provisioning state (for test setup)
    pub fn set_device_state(&self, id: &str, state: DeviceState) {
        if let Some(device) = self.devices.lock().unwrap().get_mut(id) {
            device.state = state;
        }
    }

    /// Attach provisioned devices to a spot market request (for test setup)
    pub fn fulfill_spot_market_request(&self, id: &str, devices: Vec<Device>) {
        if let Some(request) = self.spot_market_requests.lock().unwrap().get_mut(id) {
            request.devices = devices;
        }
    }

    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn build_device(&self, id: String, request: &DeviceCreateRequest) -> Device {
        Device {
            href: Some(format!("{}/devices/{}", self.base_url, id)),
            hostname: request.hostname.clone(),
            state: DeviceState::Provisioning,
            tags: request.tags.clone(),
            billing_cycle: request
                .billing_cycle
                .clone()
                .or_else(|| Some("hourly".to_string())),
            locked: request.locked.unwrap_or(false),
            always_pxe: request.always_pxe.unwrap_or(false),
            ipxe_script_url: request.ipxe_script_url.clone(),
            user_data: request.user_data.clone(),
            network_type: Some("layer3".to_string()),
            plan: Some(NestedPlan {
                id: self.next_id(),
                slug: request.plan.clone(),
                name: request.plan.clone(),
            }),
            operating_system: Some(NestedOperatingSystem {
                id: None,
                slug: request.operating_system.clone(),
                name: request.operating_system.clone(),
                distro: None,
                version: None,
            }),
            metro: request.metro.as_ref().map(|code| NestedMetro {
                id: self.next_id(),
                code: code.clone(),
                name: code.to_uppercase(),
            }),
            facility: request.facility.as_ref().map(|code| NestedFacility {
                id: self.next_id(),
                code: code.clone(),
                name: code.to_uppercase(),
            }),
            hardware_reservation: request
                .hardware_reservation_id
                .as_ref()
                .map(|rid| Href {
                    href: format!("{}/hardware-reservations/{}", self.base_url, rid),
                }),
            root_password: Some("mock-root-password".to_string()),
            ip_addresses: vec![
                IpAddress {
                    id: self.next_id(),
                    address: "147.75.100.2/31".to_string(),
                    gateway: Some("147.75.100.1".to_string()),
                    network: Some("147.75.100.0".to_string()),
                    address_family: 4,
                    public: true,
                    management: true,
                },
                IpAddress {
                    id: self.next_id(),
                    address: "10.80.0.2/31".to_string(),
                    gateway: Some("10.80.0.1".to_string()),
                    network: Some("10.80.0.0".to_string()),
                    address_family: 4,
                    public: false,
                    management: true,
                },
            ],
            created_at: None,
            updated_at: None,
            id,
        }
    }
}

#[async_trait::async_trait]
impl MetalClientTrait for MockMetalClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), MetalError> {
        Ok(())
    }

    async fn get_device(&self, id: &str) -> Result<Device, MetalError> {
        self.devices
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MetalError::NotFound(format!("Device {} not found", id)))
    }

    async fn list_devices(
        &self,
        _project_id: &str,
        _filters: &[(&str, &str)],
        _fetch_all: bool,
    ) -> Result<Vec<Device>, MetalError> {
        Ok(self.devices.lock().unwrap().values().cloned().collect())
    }

    async fn find_device_by_hostname(
        &self,
        _project_id: &str,
        hostname: &str,
    ) -> Result<Option<Device>, MetalError> {
        Ok(self
            .devices
            .lock()
            .unwrap()
            .values()
            .find(|d| d.hostname == hostname)
            .cloned())
    }

    async fn create_device(
        &self,
        _project_id: &str,
        request: &DeviceCreateRequest,
    ) -> Result<Device, MetalError> {
        if request.hostname.is_empty() {
            return Err(MetalError::InvalidRequest("hostname is required".to_string()));
        }
        let id = self.next_id();
        let device = self.build_device(id.clone(), request);
        self.devices.lock().unwrap().insert(id, device.clone());
        Ok(device)
    }

    async fn update_device(
        &self,
        id: &str,
        request: &DeviceUpdateRequest,
    ) -> Result<Device, MetalError> {
        let mut devices = self.devices.lock().unwrap();
        let device = devices
            .get_mut(id)
            .ok_or_else(|| MetalError::NotFound(format!("Device {} not found", id)))?;

        if let Some(hostname) = &request.hostname {
            device.hostname = hostname.clone();
        }
        if let Some(user_data) = &request.user_data {
            device.user_data = Some(user_data.clone());
        }
        if let Some(locked) = request.locked {
            device.locked = locked;
        }
        if let Some(always_pxe) = request.always_pxe {
            device.always_pxe = always_pxe;
        }
        if let Some(ipxe_script_url) = &request.ipxe_script_url {
            device.ipxe_script_url = Some(ipxe_script_url.clone());
        }
        if let Some(billing_cycle) = &request.billing_cycle {
            device.billing_cycle = Some(billing_cycle.clone());
        }
        if let Some(tags) = &request.tags {
            device.tags = tags.clone();
        }

        Ok(device.clone())
    }

    async fn convert_network_type(
        &self,
        id: &str,
        network_type: &str,
    ) -> Result<Device, MetalError> {
        let mut devices = self.devices.lock().unwrap();
        let device = devices
            .get_mut(id)
            .ok_or_else(|| MetalError::NotFound(format!("Device {} not found", id)))?;
        device.network_type = Some(network_type.to_string());
        Ok(device.clone())
    }

    async fn delete_device(&self, id: &str, force: bool) -> Result<(), MetalError> {
        let mut devices = self.devices.lock().unwrap();
        match devices.get(id) {
            Some(device) if device.locked && !force => Err(MetalError::Api(format!(
                "Device {} is locked and cannot be deleted",
                id
            ))),
            Some(_) => {
                devices.remove(id);
                Ok(())
            }
            None => Err(MetalError::NotFound(format!("Device {} not found", id))),
        }
    }

    async fn get_virtual_network(&self, id: &str) -> Result<VirtualNetwork, MetalError> {
        self.virtual_networks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MetalError::NotFound(format!("Virtual network {} not found", id)))
    }

    async fn list_virtual_networks(
        &self,
        _project_id: &str,
    ) -> Result<Vec<VirtualNetwork>, MetalError> {
        Ok(self
            .virtual_networks
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect())
    }

    async fn create_virtual_network(
        &self,
        _project_id: &str,
        request: &VirtualNetworkCreateRequest,
    ) -> Result<VirtualNetwork, MetalError> {
        let id = self.next_id();
        let vxlan = match request.vxlan {
            Some(vxlan) => vxlan,
            None => {
                let mut next = self.next_vxlan.lock().unwrap();
                let assigned = *next;
                *next += 1;
                assigned
            }
        };
        let vnet = VirtualNetwork {
            href: Some(format!("{}/virtual-networks/{}", self.base_url, id)),
            description: request.description.clone(),
            vxlan,
            facility_code: request.facility.clone(),
            metro_code: request.metro.clone(),
            id: id.clone(),
        };
        self.virtual_networks
            .lock()
            .unwrap()
            .insert(id, vnet.clone());
        Ok(vnet)
    }

    async fn update_virtual_network(
        &self,
        id: &str,
        description: &str,
    ) -> Result<VirtualNetwork, MetalError> {
        let mut vnets = self.virtual_networks.lock().unwrap();
        let vnet = vnets
            .get_mut(id)
            .ok_or_else(|| MetalError::NotFound(format!("Virtual network {} not found", id)))?;
        vnet.description = Some(description.to_string());
        Ok(vnet.clone())
    }

    async fn delete_virtual_network(&self, id: &str) -> Result<(), MetalError> {
        self.virtual_networks
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetalError::NotFound(format!("Virtual network {} not found", id)))
    }

    async fn get_spot_market_request(
        &self,
        id: &str,
        include_devices: bool,
    ) -> Result<SpotMarketRequest, MetalError> {
        let mut request = self
            .spot_market_requests
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| MetalError::NotFound(format!("Spot market request {} not found", id)))?;
        if !include_devices {
            request.devices = Vec::new();
        }
        Ok(request)
    }

    async fn create_spot_market_request(
        &self,
        _project_id: &str,
        request: &SpotMarketRequestCreateRequest,
    ) -> Result<SpotMarketRequest, MetalError> {
        if request.devices_min > request.devices_max {
            return Err(MetalError::InvalidRequest(
                "devices_min cannot exceed devices_max".to_string(),
            ));
        }
        let id = self.next_id();
        let smr = SpotMarketRequest {
            href: Some(format!("{}/spot-market-requests/{}", self.base_url, id)),
            devices_min: request.devices_min,
            devices_max: request.devices_max,
            max_bid_price: request.max_bid_price,
            end_at: request.end_at,
            devices: Vec::new(),
            created_at: None,
            id: id.clone(),
        };
        self.spot_market_requests
            .lock()
            .unwrap()
            .insert(id, smr.clone());
        Ok(smr)
    }

    async fn delete_spot_market_request(
        &self,
        id: &str,
        _force_termination: bool,
    ) -> Result<(), MetalError> {
        self.spot_market_requests
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| MetalError::NotFound(format!("Spot market request {} not found", id)))
    }
}
