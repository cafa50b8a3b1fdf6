//! Cluster-facing collaborators
//!
//! The engine never talks to a cluster itself. Everything that does I/O sits
//! behind these traits so the deploy flow can be driven by real clients in a
//! provider and by mocks in tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use stevedore_common::spec::{DeployAction, ProviderSecretRef};
use stevedore_common::Result;

use crate::k8s::LocalObjectReference;
use crate::workload::Manifest;

// =============================================================================
// Status types
// =============================================================================

/// Rollout state of a Deploy action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployState {
    /// All resources are up to date and ready
    Ready,
    /// A rollout is in progress
    Deploying,
    /// Resources exist but differ from what would be deployed
    Outdated,
    /// Resources exist but are failing
    Unhealthy,
    /// Nothing is deployed
    #[default]
    Missing,
}

/// A port that can be forwarded to the developer machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardablePort {
    /// Port name
    pub name: String,
    /// Port on the target resource
    pub target_port: u16,
    /// Protocol
    pub protocol: String,
}

/// Status of a Deploy action as observed in the cluster
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployStatus {
    /// Rollout state
    pub state: DeployState,
    /// Keys (`Kind/name`) of deployed resources whose selector no longer matches
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selector_changed_resource_keys: Vec<String>,
    /// Ports that can be forwarded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forwardable_ports: Vec<ForwardablePort>,
}

impl DeployStatus {
    /// Status with the given state and nothing else
    pub fn with_state(state: DeployState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }
}

/// Name and UID of a namespace
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceStatus {
    /// Namespace name
    pub name: String,
    /// Namespace UID
    pub uid: String,
}

// =============================================================================
// Traits
// =============================================================================

/// Applies and removes manifests
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Apply manifests, pruning resources with `prune_labels` that are no longer in the set
    async fn apply(
        &self,
        manifests: &[Manifest],
        namespace: &str,
        prune_labels: &BTreeMap<String, String>,
    ) -> Result<()>;

    /// Delete every resource of `object_kinds` matching a label selector
    async fn delete_by_selector(
        &self,
        namespace: &str,
        selector: &str,
        object_kinds: &[String],
    ) -> Result<()>;

    /// Delete resources by `Kind/name` key
    async fn delete_by_keys(&self, namespace: &str, keys: &[String]) -> Result<()>;

    /// Wait until the given manifests are rolled out and ready
    async fn wait_for_resources(
        &self,
        namespace: &str,
        manifests: &[Manifest],
        timeout_seconds: u64,
    ) -> Result<()>;
}

/// Resolves namespaces for the current environment
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NamespaceResolver: Send + Sync {
    /// Namespace the app is deployed into
    async fn app_namespace(&self) -> Result<String>;

    /// Name and UID of the app namespace, creating it if needed
    async fn namespace_status(&self) -> Result<NamespaceStatus>;
}

/// Copies provider secrets into the app namespace
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretsProvider: Send + Sync {
    /// Make `secrets` available in `namespace`, returning references usable as pull secrets
    async fn prepare_secrets(
        &self,
        namespace: &str,
        secrets: &[ProviderSecretRef],
    ) -> Result<Vec<LocalObjectReference>>;
}

/// Reads the deployed state of an action
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StatusProvider: Send + Sync {
    /// Current status of `action`
    async fn get_status(&self, action: &DeployAction) -> Result<DeployStatus>;
}

/// Builds manifests deployed alongside the workload (services, ingresses)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SiblingManifestBuilder: Send + Sync {
    /// Manifests for `action` in `namespace`
    async fn build(&self, action: &DeployAction, namespace: &str) -> Result<Vec<Manifest>>;
}

/// Manages port-forward processes for an action
#[cfg_attr(test, automock)]
pub trait PortForwardManager: Send + Sync {
    /// Stop forwards for the given ports so they reconnect to the new pods
    fn kill(&self, action: &DeployAction, ports: &[ForwardablePort]);
}
