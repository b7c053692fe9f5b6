//! Provider API client
//!
//! Implements the REST client for the bare-metal cloud API. Device,
//! virtual-network, and spot-market collections are project-scoped; the
//! individual resources are addressed globally by UUID.

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::common::HttpClient;
use crate::error::MetalError;
use crate::metal_trait::MetalClientTrait;
use crate::models::*;

/// Provider API client
pub struct MetalClient {
    http: HttpClient,
}

impl MetalClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - API base URL (e.g., "https://api.equinix.com/metal/v1")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, MetalError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(MetalError::Http)?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Validate the API token by fetching the authenticated user.
    ///
    /// Tests connectivity and token validity before the controller starts
    /// reconciling.
    pub async fn validate_token(&self) -> Result<(), MetalError> {
        debug!("Validating API token and connectivity");
        let _user: serde_json::Value = self.http.get("/user").await?;
        debug!("Token validated successfully");
        Ok(())
    }

    /// Get a device by ID
    pub async fn get_device(&self, id: &str) -> Result<Device, MetalError> {
        self.http.get(&format!("/devices/{}", id)).await
    }

    /// List devices in a project
    ///
    /// # Arguments
    /// * `project_id` - Project to list devices from
    /// * `filters` - Query parameters (e.g. `[("search", "worker-0")]`)
    /// * `fetch_all` - Follow pagination links and return every page
    pub async fn list_devices(
        &self,
        project_id: &str,
        filters: &[(&str, &str)],
        fetch_all: bool,
    ) -> Result<Vec<Device>, MetalError> {
        let mut path = format!("/projects/{}/devices", project_id);
        if !filters.is_empty() {
            path = format!("{}?{}", path, self.http.build_query_string(filters));
        }

        if fetch_all {
            self.http
                .fetch_all_pages::<DevicesPage>(self.http.build_url(&path))
                .await
        } else {
            let page: DevicesPage = self.http.get(&path).await?;
            Ok(page.devices)
        }
    }

    /// Find a device in a project by exact hostname
    ///
    /// Used for adopting externally-created devices and for mapping CRs back
    /// to provider resources after a controller restart.
    pub async fn find_device_by_hostname(
        &self,
        project_id: &str,
        hostname: &str,
    ) -> Result<Option<Device>, MetalError> {
        let devices = self
            .list_devices(project_id, &[("search", hostname)], true)
            .await?;
        Ok(devices.into_iter().find(|d| d.hostname == hostname))
    }

    /// Provision a device in a project
    pub async fn create_device(
        &self,
        project_id: &str,
        request: &DeviceCreateRequest,
    ) -> Result<Device, MetalError> {
        let body = serde_json::to_value(request).map_err(MetalError::Serialization)?;
        debug!("Creating device {} in project {}", request.hostname, project_id);
        self.http
            .post(&format!("/projects/{}/devices", project_id), &body)
            .await
    }

    /// Update a device in place
    pub async fn update_device(
        &self,
        id: &str,
        request: &DeviceUpdateRequest,
    ) -> Result<Device, MetalError> {
        let body = serde_json::to_value(request).map_err(MetalError::Serialization)?;
        debug!("Updating device {}", id);
        self.http.put(&format!("/devices/{}", id), &body).await
    }

    /// Convert a device's network bonding mode
    ///
    /// Conversion is asynchronous at the provider; the returned device may
    /// still report the old mode until port reconfiguration completes.
    pub async fn convert_network_type(
        &self,
        id: &str,
        network_type: &str,
    ) -> Result<Device, MetalError> {
        let body = serde_json::json!({ "network_type": network_type });
        debug!("Converting device {} to network type {}", id, network_type);
        self.http.put(&format!("/devices/{}", id), &body).await
    }

    /// Delete a device
    ///
    /// # Arguments
    /// * `id` - Device ID
    /// * `force` - Delete even if the device is protected by a deletion lock
    pub async fn delete_device(&self, id: &str, force: bool) -> Result<(), MetalError> {
        let path = if force {
            format!("/devices/{}?force_delete=true", id)
        } else {
            format!("/devices/{}", id)
        };
        self.http.delete(&path).await
    }

    /// Get a virtual network by ID
    pub async fn get_virtual_network(&self, id: &str) -> Result<VirtualNetwork, MetalError> {
        self.http.get(&format!("/virtual-networks/{}", id)).await
    }

    /// List virtual networks in a project
    ///
    /// The provider returns the full set in one response; no pagination.
    pub async fn list_virtual_networks(
        &self,
        project_id: &str,
    ) -> Result<Vec<VirtualNetwork>, MetalError> {
        let page: VirtualNetworksPage = self
            .http
            .get(&format!("/projects/{}/virtual-networks", project_id))
            .await?;
        Ok(page.virtual_networks)
    }

    /// Create a virtual network in a project
    pub async fn create_virtual_network(
        &self,
        project_id: &str,
        request: &VirtualNetworkCreateRequest,
    ) -> Result<VirtualNetwork, MetalError> {
        let body = serde_json::to_value(request).map_err(MetalError::Serialization)?;
        debug!("Creating virtual network in project {}", project_id);
        self.http
            .post(&format!("/projects/{}/virtual-networks", project_id), &body)
            .await
    }

    /// Update a virtual network's description (the only mutable field)
    pub async fn update_virtual_network(
        &self,
        id: &str,
        description: &str,
    ) -> Result<VirtualNetwork, MetalError> {
        let body = serde_json::json!({ "description": description });
        debug!("Updating virtual network {}", id);
        self.http
            .put(&format!("/virtual-networks/{}", id), &body)
            .await
    }

    /// Delete a virtual network
    pub async fn delete_virtual_network(&self, id: &str) -> Result<(), MetalError> {
        self.http.delete(&format!("/virtual-networks/{}", id)).await
    }

    /// Get a spot market request by ID
    ///
    /// # Arguments
    /// * `id` - Request ID
    /// * `include_devices` - Expand provisioned devices in the response
    pub async fn get_spot_market_request(
        &self,
        id: &str,
        include_devices: bool,
    ) -> Result<SpotMarketRequest, MetalError> {
        let path = if include_devices {
            format!("/spot-market-requests/{}?include=devices", id)
        } else {
            format!("/spot-market-requests/{}", id)
        };
        self.http.get(&path).await
    }

    /// Place a spot market request in a project
    pub async fn create_spot_market_request(
        &self,
        project_id: &str,
        request: &SpotMarketRequestCreateRequest,
    ) -> Result<SpotMarketRequest, MetalError> {
        let body = serde_json::to_value(request).map_err(MetalError::Serialization)?;
        debug!(
            "Creating spot market request in project {} (bid {})",
            project_id, request.max_bid_price
        );
        self.http
            .post(&format!("/projects/{}/spot-market-requests", project_id), &body)
            .await
    }

    /// Delete a spot market request
    ///
    /// # Arguments
    /// * `id` - Request ID
    /// * `force_termination` - Also terminate devices the request provisioned
    pub async fn delete_spot_market_request(
        &self,
        id: &str,
        force_termination: bool,
    ) -> Result<(), MetalError> {
        let path = if force_termination {
            format!("/spot-market-requests/{}?force_termination=true", id)
        } else {
            format!("/spot-market-requests/{}", id)
        };
        self.http.delete(&path).await
    }
}

#[async_trait::async_trait]
impl MetalClientTrait for MetalClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn validate_token(&self) -> Result<(), MetalError> {
        self.validate_token().await
    }

    async fn get_device(&self, id: &str) -> Result<Device, MetalError> {
        self.get_device(id).await
    }

    async fn list_devices(
        &self,
        project_id: &str,
        filters: &[(&str, &str)],
        fetch_all: bool,
    ) -> Result<Vec<Device>, MetalError> {
        self.list_devices(project_id, filters, fetch_all).await
    }

    async fn find_device_by_hostname(
        &self,
        project_id: &str,
        hostname: &str,
    ) -> Result<Option<Device>, MetalError> {
        self.find_device_by_hostname(project_id, hostname).await
    }

    async fn create_device(
        &self,
        project_id: &str,
        request: &DeviceCreateRequest,
    ) -> Result<Device, MetalError> {
        self.create_device(project_id, request).await
    }

    async fn update_device(
        &self,
        id: &str,
        request: &DeviceUpdateRequest,
    ) -> Result<Device, MetalError> {
        self.update_device(id, request).await
    }

    async fn convert_network_type(
        &self,
        id: &str,
        network_type: &str,
    ) -> Result<Device, MetalError> {
        self.convert_network_type(id, network_type).await
    }

    async fn delete_device(&self, id: &str, force: bool) -> Result<(), MetalError> {
        self.delete_device(id, force).await
    }

    async fn get_virtual_network(&self, id: &str) -> Result<VirtualNetwork, MetalError> {
        self.get_virtual_network(id).await
    }

    async fn list_virtual_networks(
        &self,
        project_id: &str,
    ) -> Result<Vec<VirtualNetwork>, MetalError> {
        self.list_virtual_networks(project_id).await
    }

    async fn create_virtual_network(
        &self,
        project_id: &str,
        request: &VirtualNetworkCreateRequest,
    ) -> Result<VirtualNetwork, MetalError> {
        self.create_virtual_network(project_id, request).await
    }

    async fn update_virtual_network(
        &self,
        id: &str,
        description: &str,
    ) -> Result<VirtualNetwork, MetalError> {
        self.update_virtual_network(id, description).await
    }

    async fn delete_virtual_network(&self, id: &str) -> Result<(), MetalError> {
        self.delete_virtual_network(id).await
    }

    async fn get_spot_market_request(
        &self,
        id: &str,
        include_devices: bool,
    ) -> Result<SpotMarketRequest, MetalError> {
        self.get_spot_market_request(id, include_devices).await
    }

    async fn create_spot_market_request(
        &self,
        project_id: &str,
        request: &SpotMarketRequestCreateRequest,
    ) -> Result<SpotMarketRequest, MetalError> {
        self.create_spot_market_request(project_id, request).await
    }

    async fn delete_spot_market_request(
        &self,
        id: &str,
        force_termination: bool,
    ) -> Result<(), MetalError> {
        self.delete_spot_market_request(id, force_termination).await
    }
}
