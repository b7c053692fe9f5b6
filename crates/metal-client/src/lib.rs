//! Bare-Metal Cloud REST API Client
//!
//! A Rust client library for the provider's REST API. Provides type-safe
//! models and methods for device, virtual-network, and spot-market
//! operations, scoped to a project.
//!
//! # Example
//!
//! ```no_run
//! use metal_client::{DeviceCreateRequest, MetalClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create a client
//! let client = MetalClient::new(
//!     "https://api.equinix.com/metal/v1".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // Provision a device
//! let request = DeviceCreateRequest {
//!     hostname: "worker-0".to_string(),
//!     plan: "c3.small.x86".to_string(),
//!     operating_system: "ubuntu_24_04".to_string(),
//!     metro: Some("am".to_string()),
//!     ..Default::default()
//! };
//! let device = client.create_device("project-uuid", &request).await?;
//!
//! // Poll it until active
//! let device = client.get_device(&device.id).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Devices**: create, update, delete, network-type conversion, lookup
//!   by hostname
//! - **Virtual networks**: project-scoped VLAN management
//! - **Spot market**: placing and observing capacity bids
//! - **Pagination**: follows `meta.next` links for large result sets

pub mod client;
pub mod common;
pub mod error;
#[path = "trait.rs"]
pub mod metal_trait;
#[cfg(feature = "test-util")]
pub mod mock;
pub mod models;

pub use client::MetalClient;
pub use common::{HttpClient, Page};
pub use error::MetalError;
pub use metal_trait::MetalClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockMetalClient;
pub use models::*;
