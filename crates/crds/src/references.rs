//! Kubernetes object references used by the metal-operator CRDs.
//!
//! Follows the Kubernetes typed-reference convention: kind, name, and an
//! optional namespace that defaults to the referencing resource's own.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of object a [`UserDataRef`] may point at.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum UserDataRefKind {
    /// A `v1/ConfigMap` in the cluster
    ConfigMap,
    /// A `v1/Secret` in the cluster
    Secret,
}

/// Reference to a ConfigMap or Secret holding device user-data.
///
/// The referenced object is read at device creation time and its value is
/// passed to the provider as the instance user-data (cloud-init payload).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDataRef {
    /// Kind of the referenced object ("ConfigMap" or "Secret")
    pub kind: UserDataRefKind,

    /// Name of the referenced object
    pub name: String,

    /// Namespace of the referenced object (defaults to the Device's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Key within the object's data to read (defaults to "cloud-init")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// When true, a missing object or key is tolerated and the device is
    /// created without user-data instead of failing the reconciliation
    #[serde(default)]
    pub optional: bool,
}

impl UserDataRef {
    /// Create a reference in the same namespace with the default key.
    pub fn new(kind: UserDataRefKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: None,
            key: None,
            optional: false,
        }
    }
}
