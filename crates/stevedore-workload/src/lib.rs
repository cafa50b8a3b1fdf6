//! Workload rendering and deployment for container Deploy actions
//!
//! Renders a `DeployAction` into a Deployment or DaemonSet manifest and drives
//! the deploy against cluster collaborators, including deletion of resources
//! whose immutable selector changed.
//!
//! # Usage
//!
//! ```rust,ignore
//! let warnings = WarningRegistry::new();
//! let workload = WorkloadCompiler::new(&action, namespace, &warnings)
//!     .with_production(production)
//!     .with_image_pull_secrets(&pull_secrets)
//!     .compile()?;
//! ```

pub mod collaborators;
mod compiler;
pub mod deploy;
pub mod drift;
pub mod helpers;
pub mod k8s;
pub mod pipeline;
pub mod warnings;
pub mod workload;

pub use collaborators::{
    ClusterClient, DeployState, DeployStatus, ForwardablePort, NamespaceResolver, NamespaceStatus,
    PortForwardManager, SecretsProvider, SiblingManifestBuilder, StatusProvider,
};
pub use compiler::WorkloadCompiler;
pub use deploy::{ContainerDeployer, ContainerManifests, DeployContext};
pub use drift::{DriftDecision, SelectorDriftReconciler};
pub use pipeline::{ModeConverter, StandardModeConverter};
pub use warnings::WarningRegistry;
pub use workload::{DynamicResource, Manifest, Workload};
