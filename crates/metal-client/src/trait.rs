//! MetalClient trait for mocking
//!
//! This trait abstracts the provider API client to enable mocking in unit
//! tests. The concrete MetalClient implements this trait, and tests can use
//! mock implementations.

use crate::error::MetalError;
use crate::models::*;

/// Trait for provider API client operations
///
/// This trait enables mocking of provider API calls for unit testing.
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait MetalClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), MetalError>;

    // Device operations
    async fn get_device(&self, id: &str) -> Result<Device, MetalError>;
    async fn list_devices(
        &self,
        project_id: &str,
        filters: &[(&str, &str)],
        fetch_all: bool,
    ) -> Result<Vec<Device>, MetalError>;
    async fn find_device_by_hostname(
        &self,
        project_id: &str,
        hostname: &str,
    ) -> Result<Option<Device>, MetalError>;
    async fn create_device(
        &self,
        project_id: &str,
        request: &DeviceCreateRequest,
    ) -> Result<Device, MetalError>;
    async fn update_device(
        &self,
        id: &str,
        request: &DeviceUpdateRequest,
    ) -> Result<Device, MetalError>;
    async fn convert_network_type(
        &self,
        id: &str,
        network_type: &str,
    ) -> Result<Device, MetalError>;
    async fn delete_device(&self, id: &str, force: bool) -> Result<(), MetalError>;

    // Virtual network operations
    async fn get_virtual_network(&self, id: &str) -> Result<VirtualNetwork, MetalError>;
    async fn list_virtual_networks(
        &self,
        project_id: &str,
    ) -> Result<Vec<VirtualNetwork>, MetalError>;
    async fn create_virtual_network(
        &self,
        project_id: &str,
        request: &VirtualNetworkCreateRequest,
    ) -> Result<VirtualNetwork, MetalError>;
    async fn update_virtual_network(
        &self,
        id: &str,
        description: &str,
    ) -> Result<VirtualNetwork, MetalError>;
    async fn delete_virtual_network(&self, id: &str) -> Result<(), MetalError>;

    // Spot market operations
    async fn get_spot_market_request(
        &self,
        id: &str,
        include_devices: bool,
    ) -> Result<SpotMarketRequest, MetalError>;
    async fn create_spot_market_request(
        &self,
        project_id: &str,
        request: &SpotMarketRequestCreateRequest,
    ) -> Result<SpotMarketRequest, MetalError>;
    async fn delete_spot_market_request(
        &self,
        id: &str,
        force_termination: bool,
    ) -> Result<(), MetalError>;
}
