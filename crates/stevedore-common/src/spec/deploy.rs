//! The container deploy spec and its development-mode sub-specs.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::container::{
    CpuSpec, EnvValue, HealthCheckSpec, LimitsSpec, MemorySpec, PortSpec, VolumeSpec,
};

/// Update strategy for replica-counted workloads.
///
/// Deserialization rejects anything other than these two values, so the
/// builder's `match` over this enum is exhaustive by construction.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum DeploymentStrategy {
    /// Replace pods gradually
    #[default]
    RollingUpdate,
    /// Kill all pods before creating new ones
    Recreate,
}

/// Mode a Deploy action runs in
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionMode {
    /// Regular deployment
    #[default]
    Normal,
    /// Live file sync into the running container
    Sync,
    /// The process runs on the developer machine, proxied into the cluster
    Local,
}

impl ActionMode {
    /// Whether this is one of the development modes that pin replicas to one
    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::Sync | Self::Local)
    }

    /// Lowercase name as used in annotations and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Sync => "sync",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for ActionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" | "default" => Ok(Self::Normal),
            "sync" => Ok(Self::Sync),
            "local" => Ok(Self::Local),
            other => Err(format!(
                "unknown mode '{}', expected one of: normal, sync, local",
                other
            )),
        }
    }
}

/// Workload kinds a mode overlay can target
#[derive(Clone, Copy, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum SyncableKind {
    /// apps/v1 Deployment
    Deployment,
    /// apps/v1 DaemonSet
    DaemonSet,
}

impl SyncableKind {
    /// Kind as written in manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::DaemonSet => "DaemonSet",
        }
    }
}

/// Explicit overlay target
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct WorkloadTargetSpec {
    /// Target kind
    pub kind: SyncableKind,
    /// Target name
    pub name: String,
}

/// A single file-sync mapping
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SyncPathSpec {
    /// Path on the developer machine, relative to the action
    pub source: String,
    /// Absolute path inside the container
    pub target: String,
}

/// Sync mode configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncModeSpec {
    /// Paths to keep in sync
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<SyncPathSpec>,
    /// Command override while syncing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Args override while syncing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    /// Workload to apply the overlay to (defaults to the generated one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<WorkloadTargetSpec>,
}

/// A port forwarded from the cluster to the local process
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct LocalPortSpec {
    /// Port of the local process
    pub local: u16,
    /// Container port receiving traffic in the cluster
    pub remote: u16,
}

/// Local mode configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalModeSpec {
    /// Ports proxied to the local process
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<LocalPortSpec>,
    /// Command that starts the local process
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Workload to apply the overlay to (defaults to the generated one)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<WorkloadTargetSpec>,
}

/// Container deploy spec. Immutable input to the engine.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploySpec {
    /// Ports exposed by the container
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSpec>,
    /// User environment variables
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, EnvValue>,
    /// Volumes mounted into the container
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeSpec>,
    /// Health check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheckSpec>,
    /// CPU request/limit
    pub cpu: CpuSpec,
    /// Memory request/limit
    pub memory: MemorySpec,
    /// Legacy limits override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<LimitsSpec>,
    /// Command override
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Args override
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// Allocate a TTY (and stdin)
    pub tty: bool,
    /// Requested replicas; unset means "use the environment default"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replicas: Option<u32>,
    /// Run one pod per node (DaemonSet) instead of a Deployment
    pub daemon: bool,
    /// Update strategy for Deployments
    pub deployment_strategy: DeploymentStrategy,
    /// Run privileged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
    /// Linux capabilities to add
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_capabilities: Option<Vec<String>>,
    /// Linux capabilities to drop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_capabilities: Option<Vec<String>>,
    /// Annotations for the pod template
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    /// Sync mode configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncModeSpec>,
    /// Local mode configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_mode: Option<LocalModeSpec>,
    /// Seconds to wait for the rollout; falls back to the client default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_deployment_strategy_is_rejected() {
        let result: Result<DeploySpec, _> = serde_json::from_value(serde_json::json!({
            "deploymentStrategy": "BlueGreen"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn spec_defaults() {
        let spec: DeploySpec = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(spec.deployment_strategy, DeploymentStrategy::RollingUpdate);
        assert!(spec.replicas.is_none());
        assert!(!spec.daemon);
        assert!(spec.ports.is_empty());
        assert_eq!(spec.cpu.min, 10);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("sync".parse::<ActionMode>(), Ok(ActionMode::Sync));
        assert_eq!("local".parse::<ActionMode>(), Ok(ActionMode::Local));
        assert_eq!("normal".parse::<ActionMode>(), Ok(ActionMode::Normal));
        assert!("dev".parse::<ActionMode>().is_err());
        assert!(ActionMode::Sync.is_dev_mode());
        assert!(!ActionMode::Normal.is_dev_mode());
    }

    #[test]
    fn local_mode_spec_uses_camel_case_key() {
        let spec: DeploySpec = serde_json::from_value(serde_json::json!({
            "localMode": {"ports": [{"local": 3000, "remote": 8080}]}
        }))
        .unwrap();
        let local = spec.local_mode.expect("local mode should be parsed");
        assert_eq!(local.ports[0].remote, 8080);
    }
}
