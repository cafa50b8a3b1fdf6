//! Container-level pieces of a deploy spec: ports, env, health checks,
//! volumes, and compute resources.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Ports
// =============================================================================

/// Network protocol of a container port
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum PortProtocol {
    /// TCP
    #[default]
    Tcp,
    /// UDP
    Udp,
}

impl PortProtocol {
    /// Protocol as written in Kubernetes manifests
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
        }
    }
}

/// A port exposed by the container
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PortSpec {
    /// Port name, referenced by health checks
    pub name: String,
    /// Protocol
    #[serde(default)]
    pub protocol: PortProtocol,
    /// Port the container listens on
    pub container_port: u16,
    /// Host port; only honoured for daemon workloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

// =============================================================================
// Environment
// =============================================================================

/// Reference to a key inside a Kubernetes Secret
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct SecretKeyRef {
    /// Secret name
    pub name: String,
    /// Key within the secret
    pub key: String,
}

/// Value of a user-declared environment variable
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum EnvValue {
    /// Plain string value
    Text(String),
    /// Numeric value, rendered as its decimal string
    Number(serde_json::Number),
    /// Boolean value, rendered as `"true"` / `"false"`
    Bool(bool),
    /// Value read from a Secret at runtime
    Secret {
        /// The secret key to read
        #[serde(rename = "secretRef")]
        secret_ref: SecretKeyRef,
    },
}

impl EnvValue {
    /// The literal string value, or `None` for secret references
    pub fn literal(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Secret { .. } => None,
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

// =============================================================================
// Health checks
// =============================================================================

/// HTTP GET health check. The port is a named container port.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpGetCheck {
    /// Request path
    pub path: String,
    /// Name of the container port to probe
    pub port: String,
    /// HTTP or HTTPS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

/// Health check descriptor. At most one of `http_get`, `command`, or
/// `tcp_port` is honoured, in that order of preference.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckSpec {
    /// HTTP GET check
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_get: Option<HttpGetCheck>,
    /// Command to exec; tokens may be strings, numbers, or booleans
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<serde_json::Value>>,
    /// Name of the container port to open a TCP connection to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_port: Option<String>,
    /// Readiness probe timeout (defaults to 3s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness_timeout_seconds: Option<i32>,
    /// Liveness probe timeout (defaults to 3s)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liveness_timeout_seconds: Option<i32>,
}

// =============================================================================
// Volumes
// =============================================================================

/// Reference to another action by kind and name
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ActionReference {
    /// Action kind (e.g. "Deploy")
    pub kind: String,
    /// Action name
    pub name: String,
}

/// A declared volume. The source is a host path, another action, or (when
/// neither is set) an empty scratch directory.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    /// Volume name, unique within the workload
    #[serde(default)]
    pub name: String,
    /// Where the volume is mounted in the container
    pub container_path: String,
    /// Host path, relative to the action's base directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_path: Option<String>,
    /// Action providing the volume (a PVC or ConfigMap action)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionReference>,
}

// =============================================================================
// Compute resources
// =============================================================================

/// CPU request/limit in millicpu. Missing keys take the defaults.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct CpuSpec {
    /// Requested millicpu
    pub min: u32,
    /// Millicpu limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl Default for CpuSpec {
    fn default() -> Self {
        Self {
            min: 10,
            max: Some(1000),
        }
    }
}

/// Memory request/limit in MiB
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct MemorySpec {
    /// Requested MiB
    pub min: u32,
    /// MiB limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl Default for MemorySpec {
    fn default() -> Self {
        Self {
            min: 90,
            max: Some(1024),
        }
    }
}

/// Legacy limits block. Takes precedence over `cpu.max` / `memory.max`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct LimitsSpec {
    /// Millicpu limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// MiB limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
}

/// Convenience alias used by callers that build env maps by hand
pub type EnvMap = BTreeMap<String, EnvValue>;
