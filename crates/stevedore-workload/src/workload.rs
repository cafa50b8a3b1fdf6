//! Workload manifests
//!
//! A Deploy action renders to exactly one of two workload kinds. Both share the
//! same metadata, selector and pod template; they differ only in how replicas
//! are managed, so every site that cares branches with an exhaustive `match`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use stevedore_common::spec::SyncableKind;
use stevedore_common::ObjectMeta;

use crate::k8s::{
    Affinity, Container, LabelSelector, LocalObjectReference, PodSecurityContext, Volume,
};

/// API version shared by both workload kinds
pub const APPS_V1: &str = "apps/v1";

// =============================================================================
// Deployment
// =============================================================================

/// Kubernetes Deployment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DeploymentSpec,
}

/// Deployment spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of replicas
    pub replicas: u32,
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
    /// Update strategy
    pub strategy: UpdateStrategy,
    /// Old ReplicaSets kept for rollback
    pub revision_history_limit: u32,
}

// =============================================================================
// DaemonSet
// =============================================================================

/// Kubernetes DaemonSet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSet {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DaemonSetSpec,
}

/// DaemonSet spec. No replica count: one pod runs per node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaemonSetSpec {
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
    /// Update strategy
    pub update_strategy: UpdateStrategy,
}

// =============================================================================
// Shared pieces
// =============================================================================

/// Update strategy for either workload kind
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStrategy {
    /// Strategy type: RollingUpdate or Recreate
    #[serde(rename = "type")]
    pub type_: String,
    /// Rolling update config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolling_update: Option<RollingUpdateConfig>,
}

impl UpdateStrategy {
    /// Plain rolling update with the cluster's default surge settings
    pub fn rolling_update() -> Self {
        Self {
            type_: "RollingUpdate".to_string(),
            rolling_update: None,
        }
    }

    /// Rolling update replacing one pod at a time, with one extra pod allowed
    pub fn fast_rolling_update() -> Self {
        Self {
            type_: "RollingUpdate".to_string(),
            rolling_update: Some(RollingUpdateConfig {
                max_unavailable: Some(1),
                max_surge: Some(1),
            }),
        }
    }

    /// Kill all pods before starting new ones
    pub fn recreate() -> Self {
        Self {
            type_: "Recreate".to_string(),
            rolling_update: None,
        }
    }
}

/// Rolling update configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RollingUpdateConfig {
    /// Max unavailable pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_unavailable: Option<u32>,
    /// Max surge pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_surge: Option<u32>,
}

/// Pod template spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Pod metadata
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod metadata (subset of ObjectMeta)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Labels
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers. The engine always renders exactly one.
    pub containers: Vec<Container>,
    /// Volumes. `None` when the action declares no volumes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Vec<Volume>>,
    /// Scheduling hints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity: Option<Affinity>,
    /// Pod-level security context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<PodSecurityContext>,
    /// Image pull secrets for authenticating to private registries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<LocalObjectReference>,
    /// Restart policy
    pub restart_policy: String,
    /// Seconds pods get to shut down gracefully
    pub termination_grace_period_seconds: i64,
    /// DNS policy
    pub dns_policy: String,
}

// =============================================================================
// Workload
// =============================================================================

/// The rendered workload: exactly one of the two supported kinds
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Workload {
    /// Replica-counted workload
    Deployment(Deployment),
    /// One pod per node
    DaemonSet(DaemonSet),
}

impl Workload {
    /// The workload kind
    pub fn kind(&self) -> SyncableKind {
        match self {
            Self::Deployment(_) => SyncableKind::Deployment,
            Self::DaemonSet(_) => SyncableKind::DaemonSet,
        }
    }

    /// Workload name
    pub fn name(&self) -> &str {
        &self.metadata().name
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(d) => &d.metadata,
            Self::DaemonSet(d) => &d.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Deployment(d) => &mut d.metadata,
            Self::DaemonSet(d) => &mut d.metadata,
        }
    }

    /// Selector used to match pods
    pub fn selector(&self) -> &LabelSelector {
        match self {
            Self::Deployment(d) => &d.spec.selector,
            Self::DaemonSet(d) => &d.spec.selector,
        }
    }

    /// Pod template
    pub fn template(&self) -> &PodTemplateSpec {
        match self {
            Self::Deployment(d) => &d.spec.template,
            Self::DaemonSet(d) => &d.spec.template,
        }
    }

    /// Mutable pod template
    pub fn template_mut(&mut self) -> &mut PodTemplateSpec {
        match self {
            Self::Deployment(d) => &mut d.spec.template,
            Self::DaemonSet(d) => &mut d.spec.template,
        }
    }

    /// Replica count, `None` for DaemonSets
    pub fn replicas(&self) -> Option<u32> {
        match self {
            Self::Deployment(d) => Some(d.spec.replicas),
            Self::DaemonSet(_) => None,
        }
    }

    /// The main (and only) container
    pub fn main_container(&self) -> Option<&Container> {
        self.template().spec.containers.first()
    }

    /// Mutable main container
    pub fn main_container_mut(&mut self) -> Option<&mut Container> {
        self.template_mut().spec.containers.first_mut()
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// Any other resource, kept as loosely typed JSON (services, ingresses, ...)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DynamicResource {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Everything else
    #[serde(flatten)]
    pub body: serde_json::Map<String, serde_json::Value>,
}

impl DynamicResource {
    /// Create a resource with an empty body
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        metadata: ObjectMeta,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            metadata,
            body: serde_json::Map::new(),
        }
    }
}

/// A manifest in the list handed to the cluster client
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Manifest {
    /// The rendered workload. Boxed, it dwarfs any sibling resource.
    Workload(Box<Workload>),
    /// A sibling resource
    Resource(DynamicResource),
}

impl Manifest {
    /// Kind as written in the manifest
    pub fn kind(&self) -> &str {
        match self {
            Self::Workload(w) => w.kind().as_str(),
            Self::Resource(r) => &r.kind,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Workload(w) => w.metadata(),
            Self::Resource(r) => &r.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::Workload(w) => w.metadata_mut(),
            Self::Resource(r) => &mut r.metadata,
        }
    }

    /// The workload, if this manifest is one
    pub fn as_workload(&self) -> Option<&Workload> {
        match self {
            Self::Workload(w) => Some(w.as_ref()),
            Self::Resource(_) => None,
        }
    }

    /// Mutable workload, if this manifest is one
    pub fn as_workload_mut(&mut self) -> Option<&mut Workload> {
        match self {
            Self::Workload(w) => Some(w.as_mut()),
            Self::Resource(_) => None,
        }
    }
}

impl From<Workload> for Manifest {
    fn from(workload: Workload) -> Self {
        Self::Workload(Box::new(workload))
    }
}

impl From<DynamicResource> for Manifest {
    fn from(resource: DynamicResource) -> Self {
        Self::Resource(resource)
    }
}
