//! metal-operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the bare-metal cloud
//! provider controllers.

pub mod device;
pub mod references;
pub mod spot_market_request;
pub mod state;
pub mod virtual_network;

pub use device::*;
pub use references::*;
pub use spot_market_request::*;
pub use state::*;
pub use virtual_network::*;
