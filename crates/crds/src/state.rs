//! Shared lifecycle state for managed resources.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a managed provider resource
///
/// Serializes as PascalCase ("Created", "Failed", etc.) but deserializes
/// both PascalCase and lowercase ("created", "failed", etc.) for backward
/// compatibility with existing CRs in the cluster.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum ResourceState {
    /// Not yet created at the provider
    #[default]
    #[serde(alias = "pending")]
    Pending,

    /// Created at the provider
    #[serde(alias = "created")]
    Created,

    /// Updated at the provider after a spec change
    #[serde(alias = "updated")]
    Updated,

    /// Last reconciliation failed
    #[serde(alias = "failed")]
    Failed,
}
