//! Deploy orchestration for container actions
//!
//! Wires the pure compiler to the cluster collaborators: selector drift first,
//! then manifest creation, apply, wait, and port-forward cleanup.

use std::collections::BTreeMap;
use std::sync::Arc;

use stevedore_common::spec::{DeployAction, ProviderConfig, ProviderDeploymentStrategy};
use stevedore_common::{Result, LABEL_SERVICE};
use tracing::{debug, info, instrument};

use crate::collaborators::{
    ClusterClient, DeployState, DeployStatus, NamespaceResolver, PortForwardManager,
    SecretsProvider, SiblingManifestBuilder, StatusProvider,
};
use crate::compiler::WorkloadCompiler;
use crate::drift::SelectorDriftReconciler;
use crate::pipeline::ModeConverter;
use crate::warnings::WarningRegistry;
use crate::workload::{Manifest, Workload};

/// Seconds to wait for resources when the deploy spec sets no timeout
pub const DEFAULT_WAIT_TIMEOUT_SECONDS: u64 = 300;

/// Kinds removed when an action is deleted
pub const DELETE_OBJECT_KINDS: [&str; 6] = [
    "deployment",
    "replicaset",
    "pod",
    "service",
    "ingress",
    "daemonset",
];

const STRATEGY_DEPRECATION_KEY: &str = "provider-deployment-strategy";

/// Per-run settings for a deploy
#[derive(Clone, Debug, Default)]
pub struct DeployContext {
    /// Whether the environment is production
    pub production: bool,
    /// Whether the operator asked to force the deploy
    pub force: bool,
    /// Provider configuration
    pub provider: ProviderConfig,
}

/// Manifests rendered for one action
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerManifests {
    /// The workload as rendered by the compiler
    pub workload: Workload,
    /// Workload, services, then ingresses, with lineage stamped on each
    pub manifests: Vec<Manifest>,
}

/// Deploys and deletes container actions
pub struct ContainerDeployer {
    cluster: Arc<dyn ClusterClient>,
    namespaces: Arc<dyn NamespaceResolver>,
    secrets: Arc<dyn SecretsProvider>,
    status: Arc<dyn StatusProvider>,
    services: Arc<dyn SiblingManifestBuilder>,
    ingresses: Arc<dyn SiblingManifestBuilder>,
    port_forwards: Arc<dyn PortForwardManager>,
    converter: Arc<dyn ModeConverter>,
    warnings: Arc<WarningRegistry>,
}

impl ContainerDeployer {
    /// Create a deployer from its collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        namespaces: Arc<dyn NamespaceResolver>,
        secrets: Arc<dyn SecretsProvider>,
        status: Arc<dyn StatusProvider>,
        services: Arc<dyn SiblingManifestBuilder>,
        ingresses: Arc<dyn SiblingManifestBuilder>,
        port_forwards: Arc<dyn PortForwardManager>,
        converter: Arc<dyn ModeConverter>,
        warnings: Arc<WarningRegistry>,
    ) -> Self {
        Self {
            cluster,
            namespaces,
            secrets,
            status,
            services,
            ingresses,
            port_forwards,
            converter,
            warnings,
        }
    }

    /// Warnings raised by this deployer so far
    pub fn warnings(&self) -> &WarningRegistry {
        &self.warnings
    }

    /// Deploy `action` and return its status afterwards
    #[instrument(skip(self, action, ctx), fields(action = %action.name))]
    pub async fn deploy(&self, action: &DeployAction, ctx: &DeployContext) -> Result<DeployStatus> {
        let status = self.status.get_status(action).await?;

        if !status.selector_changed_resource_keys.is_empty() {
            let namespace = self.namespaces.namespace_status().await?;
            SelectorDriftReconciler::reconcile(
                self.cluster.as_ref(),
                action,
                &namespace.name,
                &status.selector_changed_resource_keys,
                ctx.production,
                ctx.force,
                &self.warnings,
            )
            .await?;
        }

        if ctx.provider.deployment_strategy == ProviderDeploymentStrategy::BlueGreen {
            self.warnings.emit_once(
                STRATEGY_DEPRECATION_KEY,
                &action.name,
                "The deploymentStrategy configuration option has been deprecated and has no effect. \
                 The \"rolling\" deployment strategy will be applied.",
            );
        }

        let namespace = self.namespaces.app_namespace().await?;
        let rendered = self.create_manifests(action, ctx, &namespace).await?;

        let prune_labels = BTreeMap::from([(LABEL_SERVICE.to_string(), action.name.clone())]);
        self.cluster
            .apply(&rendered.manifests, &namespace, &prune_labels)
            .await?;

        let timeout = action.spec.timeout.unwrap_or(DEFAULT_WAIT_TIMEOUT_SECONDS);
        self.cluster
            .wait_for_resources(&namespace, &rendered.manifests, timeout)
            .await?;

        let status = self.status.get_status(action).await?;
        self.port_forwards.kill(action, &status.forwardable_ports);

        info!(namespace = %namespace, state = ?status.state, "deployed");
        Ok(status)
    }

    /// Render every manifest for `action` in `namespace`.
    ///
    /// Prepares pull and copy secrets first, then builds ingresses, the
    /// workload, and services, and stamps lineage on all of them.
    pub async fn create_manifests(
        &self,
        action: &DeployAction,
        ctx: &DeployContext,
        namespace: &str,
    ) -> Result<ContainerManifests> {
        let pull_secrets = if ctx.provider.image_pull_secrets.is_empty() {
            Vec::new()
        } else {
            self.secrets
                .prepare_secrets(namespace, &ctx.provider.image_pull_secrets)
                .await?
        };
        if !ctx.provider.copy_secrets.is_empty() {
            self.secrets
                .prepare_secrets(namespace, &ctx.provider.copy_secrets)
                .await?;
        }

        let ingresses = self.ingresses.build(action, namespace).await?;
        let workload = WorkloadCompiler::new(action, namespace, &self.warnings)
            .with_production(ctx.production)
            .with_image_pull_secrets(&pull_secrets)
            .with_mode_converter(self.converter.as_ref())
            .compile()?;
        let services = self.services.build(action, namespace).await?;

        let lineage = action.lineage();
        let mut manifests = Vec::with_capacity(1 + services.len() + ingresses.len());
        manifests.push(Manifest::from(workload.clone()));
        manifests.extend(services);
        manifests.extend(ingresses);
        for manifest in &mut manifests {
            lineage.stamp(manifest.metadata_mut());
        }

        debug!(count = manifests.len(), "rendered manifests");
        Ok(ContainerManifests {
            workload,
            manifests,
        })
    }

    /// Delete everything deployed for `action`
    #[instrument(skip(self, action), fields(action = %action.name))]
    pub async fn delete(&self, action: &DeployAction) -> Result<DeployStatus> {
        let namespace = self.namespaces.app_namespace().await?;
        let selector = format!("{}={}", LABEL_SERVICE, action.name);
        let kinds: Vec<String> = DELETE_OBJECT_KINDS.iter().map(|k| k.to_string()).collect();

        self.cluster
            .delete_by_selector(&namespace, &selector, &kinds)
            .await?;

        info!(namespace = %namespace, "deleted");
        Ok(DeployStatus::with_state(DeployState::Missing))
    }
}
