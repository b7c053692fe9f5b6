//! Controller-specific error types.
//!
//! This module defines error types specific to the metal controller that are
//! not covered by upstream library errors.

use kube::Error as KubeError;
use metal_client::MetalError;
use thiserror::Error;

/// Errors that can occur in the metal controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Provider API error
    #[error("provider error: {0}")]
    Metal(#[from] MetalError),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A userDataRef could not be resolved
    #[error("cannot resolve user-data reference: {0}")]
    UserDataRef(String),

    /// Resource watch failed
    #[error("resource watch failed: {0}")]
    Watch(String),
}
