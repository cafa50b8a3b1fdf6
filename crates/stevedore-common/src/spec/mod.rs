//! Deploy spec types consumed by the workload engine.
//!
//! These are the user-facing building blocks: the container `DeploySpec`, the
//! resolved `DeployAction` wrapping it, and provider-wide configuration.

pub mod action;
pub mod container;
pub mod deploy;
pub mod provider;

pub use action::{DependencyAction, DeployAction, VolumeCapability};
pub use container::{
    ActionReference, CpuSpec, EnvMap, EnvValue, HealthCheckSpec, HttpGetCheck, LimitsSpec,
    MemorySpec, PortProtocol, PortSpec, SecretKeyRef, VolumeSpec,
};
pub use deploy::{
    ActionMode, DeploySpec, DeploymentStrategy, LocalModeSpec, LocalPortSpec, SyncModeSpec,
    SyncPathSpec, SyncableKind, WorkloadTargetSpec,
};
pub use provider::{ProviderConfig, ProviderDeploymentStrategy, ProviderSecretRef};
