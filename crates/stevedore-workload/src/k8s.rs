//! Kubernetes object types emitted by the engine
//!
//! Only the fields the engine actually produces are modelled. Optional fields
//! are skipped when unset so the serialized manifest matches what the API
//! server would normalize it to, which keeps downstream diffing stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Environment
// =============================================================================

/// Environment variable: a literal value or a value resolved at runtime
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVar {
    /// Variable name
    pub name: String,
    /// Literal value (mutually exclusive with `value_from`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Runtime source (mutually exclusive with `value`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<EnvVarSource>,
}

impl EnvVar {
    /// Create an env var with a literal value
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            value_from: None,
        }
    }

    /// Create an env var read from a pod field via the downward API
    pub fn from_field(name: impl Into<String>, field_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: Some(ObjectFieldSelector {
                    field_path: field_path.into(),
                }),
                secret_key_ref: None,
            }),
        }
    }

    /// Create an env var that references a secret key
    pub fn from_secret(
        name: impl Into<String>,
        secret_name: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: None,
            value_from: Some(EnvVarSource {
                field_ref: None,
                secret_key_ref: Some(SecretKeySelector {
                    name: secret_name.into(),
                    key: key.into(),
                }),
            }),
        }
    }
}

/// Source for an environment variable value
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSource {
    /// Pod field reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_ref: Option<ObjectFieldSelector>,
    /// Secret key reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

/// Selects a field of the pod
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFieldSelector {
    /// Path of the field, e.g. `status.podIP`
    pub field_path: String,
}

/// Selector for a key within a Secret
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SecretKeySelector {
    /// Name of the Secret
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Reference to a local object by name (e.g. for imagePullSecrets)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalObjectReference {
    /// Object name
    pub name: String,
}

// =============================================================================
// Container
// =============================================================================

/// Container spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image
    pub image: String,
    /// Image pull policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,
    /// Command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Args
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Environment variables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    /// Ports. `None` when no ports are declared; never `Some(vec![])` in output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<ContainerPort>>,
    /// Resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
    /// Readiness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<ProbeSpec>,
    /// Liveness probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_probe: Option<ProbeSpec>,
    /// Volume mounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mounts: Option<Vec<VolumeMount>>,
    /// Security context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_context: Option<SecurityContext>,
    /// Allocate a TTY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tty: Option<bool>,
    /// Keep stdin open
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<bool>,
}

/// Container port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Protocol
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Port number
    pub container_port: u16,
    /// Port exposed directly on the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

// =============================================================================
// Resource requirements
// =============================================================================

/// Resource requirements
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceRequirements {
    /// Requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantity>,
    /// Limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantity>,
}

/// Resource quantity
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ResourceQuantity {
    /// CPU, e.g. `10m`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory, e.g. `90Mi`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

// =============================================================================
// Probes
// =============================================================================

/// Probe specification. Exactly one of `http_get`, `exec`, `tcp_socket` is set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeSpec {
    /// HTTP GET probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetAction>,
    /// Exec probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecAction>,
    /// TCP socket probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_socket: Option<TcpSocketAction>,
    /// Seconds after container start before probes begin
    pub initial_delay_seconds: i32,
    /// Seconds between probe attempts
    pub period_seconds: i32,
    /// Seconds before the probe times out
    pub timeout_seconds: i32,
    /// Consecutive successes before marking healthy
    pub success_threshold: i32,
    /// Consecutive failures before marking unhealthy
    pub failure_threshold: i32,
}

impl ProbeSpec {
    /// Number of check types populated on this probe
    pub fn check_count(&self) -> usize {
        usize::from(self.http_get.is_some())
            + usize::from(self.exec.is_some())
            + usize::from(self.tcp_socket.is_some())
    }
}

/// HTTP GET action for probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HttpGetAction {
    /// Path
    pub path: String,
    /// Port number
    pub port: u16,
    /// Scheme (HTTP or HTTPS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// Exec action for probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecAction {
    /// Command
    pub command: Vec<String>,
}

/// TCP socket action for probe
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TcpSocketAction {
    /// Port number
    pub port: u16,
}

// =============================================================================
// Security context
// =============================================================================

/// Container security context
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityContext {
    /// Allow privilege escalation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_privilege_escalation: Option<bool>,
    /// Run container in privileged mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    /// Capabilities to add/drop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

/// Linux capabilities for containers
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Capabilities {
    /// Capabilities to add
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add: Option<Vec<String>>,
    /// Capabilities to drop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drop: Option<Vec<String>>,
}

/// Pod-level security context
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSecurityContext {
    /// UID for all containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_user: Option<i64>,
    /// GID for all containers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_as_group: Option<i64>,
    /// GID applied to mounted volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs_group: Option<i64>,
}

// =============================================================================
// Volumes
// =============================================================================

/// Pod volume: a name plus exactly one source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    /// Volume name
    pub name: String,
    /// Volume source
    #[serde(flatten)]
    pub source: VolumeSource,
}

impl Volume {
    /// Create a Volume backed by a host path
    pub fn from_host_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::HostPath(HostPathVolumeSource { path: path.into() }),
        }
    }

    /// Create a Volume backed by a PVC
    pub fn from_pvc(name: impl Into<String>, claim_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::PersistentVolumeClaim(PvcVolumeSource {
                claim_name: claim_name.into(),
            }),
        }
    }

    /// Create a Volume backed by a ConfigMap
    pub fn from_config_map(name: impl Into<String>, cm_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::ConfigMap(ConfigMapVolumeSource {
                name: cm_name.into(),
            }),
        }
    }

    /// Create a Volume backed by an emptyDir
    pub fn from_empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: VolumeSource::EmptyDir(EmptyDirVolumeSource {}),
        }
    }
}

/// Where a volume's data comes from
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum VolumeSource {
    /// Directory on the node
    HostPath(HostPathVolumeSource),
    /// PersistentVolumeClaim
    PersistentVolumeClaim(PvcVolumeSource),
    /// ConfigMap
    ConfigMap(ConfigMapVolumeSource),
    /// Scratch space that lives as long as the pod
    EmptyDir(EmptyDirVolumeSource),
}

/// Host path volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HostPathVolumeSource {
    /// Absolute path on the node
    pub path: String,
}

/// PVC volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PvcVolumeSource {
    /// PVC claim name
    pub claim_name: String,
}

/// ConfigMap volume source
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfigMapVolumeSource {
    /// ConfigMap name
    pub name: String,
}

/// EmptyDir volume source
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EmptyDirVolumeSource {}

/// Volume mount
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Volume name
    pub name: String,
    /// Mount path
    pub mount_path: String,
}

// =============================================================================
// Scheduling
// =============================================================================

/// Label selector
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Exact label matches
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,
    /// Set-based requirements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

/// Set-based label requirement
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LabelSelectorRequirement {
    /// Label key
    pub key: String,
    /// In, NotIn, Exists, DoesNotExist
    pub operator: String,
    /// Values for In/NotIn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

/// Pod affinity/anti-affinity settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Affinity {
    /// Anti-affinity rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_anti_affinity: Option<PodAntiAffinity>,
}

/// Pod anti-affinity rules
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodAntiAffinity {
    /// Soft preferences the scheduler tries to honour
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_during_scheduling_ignored_during_execution: Vec<WeightedPodAffinityTerm>,
}

/// Weighted affinity term
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeightedPodAffinityTerm {
    /// Weight in the range 1-100
    pub weight: i32,
    /// The term
    pub pod_affinity_term: PodAffinityTerm,
}

/// Pod affinity term
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodAffinityTerm {
    /// Pods this term applies to
    pub label_selector: LabelSelector,
    /// Topology domain, e.g. `kubernetes.io/hostname`
    pub topology_key: String,
}
