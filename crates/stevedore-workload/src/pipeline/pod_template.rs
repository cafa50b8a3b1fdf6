//! Base workload assembly
//!
//! Picks the workload kind, wires the container into a pod template, and sets
//! the labels and selector. The selector carries only the action label: the
//! module label may change without the workload changing identity, and
//! selectors are immutable once applied.

use std::collections::BTreeMap;

use stevedore_common::spec::{DeployAction, DeploymentStrategy};
use stevedore_common::{
    ObjectMeta, Result, ANNOTATION_CONFIGURED_REPLICAS, LABEL_ACTION, LABEL_MODULE,
};
use tracing::debug;

use super::container::ContainerBuilder;
use super::probes::HealthProbeConfigurator;
use super::replicas::ReplicaPlan;
use super::volumes::VolumeResolver;
use crate::k8s::{LabelSelector, LocalObjectReference};
use crate::workload::{
    DaemonSet, DaemonSetSpec, Deployment, DeploymentSpec, PodMeta, PodSpec, PodTemplateSpec,
    UpdateStrategy, Workload, APPS_V1,
};

/// Restart policy for every rendered pod
pub const RESTART_POLICY: &str = "Always";

/// Grace period given to pods on shutdown
pub const TERMINATION_GRACE_PERIOD_SECONDS: i64 = 5;

/// DNS policy for every rendered pod
pub const DNS_POLICY: &str = "ClusterFirst";

/// Assembles the base workload object
pub struct WorkloadTemplateBuilder;

impl WorkloadTemplateBuilder {
    /// Labels attached to the workload and its pods
    pub fn labels(action: &DeployAction) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_MODULE.to_string(), action.module().to_string()),
            (LABEL_ACTION.to_string(), action.key()),
        ])
    }

    /// Selector matching the workload's pods: the action label only
    pub fn selector(action: &DeployAction) -> LabelSelector {
        LabelSelector {
            match_labels: BTreeMap::from([(LABEL_ACTION.to_string(), action.key())]),
            match_expressions: vec![],
        }
    }

    /// Build the workload for `action` in `namespace`
    pub fn build(
        action: &DeployAction,
        namespace: &str,
        plan: &ReplicaPlan,
        image_pull_secrets: &[LocalObjectReference],
    ) -> Result<Workload> {
        let spec = &action.spec;

        let mut container = ContainerBuilder::build(action);
        if let Some(health_check) = &spec.health_check {
            HealthProbeConfigurator::configure(
                &mut container,
                &action.long_description(),
                health_check,
                &spec.ports,
                action.mode,
            )?;
        }

        let volumes = VolumeResolver::resolve(action)?;
        let volumes = if volumes.is_empty() {
            None
        } else {
            container.volume_mounts = Some(volumes.mounts);
            Some(volumes.volumes)
        };

        let labels = Self::labels(action);
        let metadata = ObjectMeta {
            name: action.name.clone(),
            namespace: namespace.to_string(),
            labels: labels.clone(),
            annotations: BTreeMap::from([(
                ANNOTATION_CONFIGURED_REPLICAS.to_string(),
                plan.configured.to_string(),
            )]),
        };

        let template = PodTemplateSpec {
            metadata: PodMeta {
                labels,
                annotations: spec.annotations.clone(),
            },
            spec: PodSpec {
                containers: vec![container],
                volumes,
                affinity: None,
                security_context: None,
                image_pull_secrets: image_pull_secrets.to_vec(),
                restart_policy: RESTART_POLICY.to_string(),
                termination_grace_period_seconds: TERMINATION_GRACE_PERIOD_SECONDS,
                dns_policy: DNS_POLICY.to_string(),
            },
        };

        let selector = Self::selector(action);
        let workload = if spec.daemon {
            Workload::DaemonSet(DaemonSet {
                api_version: APPS_V1.to_string(),
                kind: "DaemonSet".to_string(),
                metadata,
                spec: DaemonSetSpec {
                    selector,
                    template,
                    update_strategy: UpdateStrategy::rolling_update(),
                },
            })
        } else {
            Workload::Deployment(Deployment {
                api_version: APPS_V1.to_string(),
                kind: "Deployment".to_string(),
                metadata,
                spec: DeploymentSpec {
                    replicas: plan.replicas,
                    selector,
                    template,
                    strategy: Self::strategy(spec.deployment_strategy),
                    revision_history_limit: plan.revision_history_limit,
                },
            })
        };

        debug!(
            action = %action.name,
            kind = workload.kind().as_str(),
            "built base workload"
        );
        Ok(workload)
    }

    fn strategy(strategy: DeploymentStrategy) -> UpdateStrategy {
        match strategy {
            DeploymentStrategy::RollingUpdate => UpdateStrategy::fast_rolling_update(),
            DeploymentStrategy::Recreate => UpdateStrategy::recreate(),
        }
    }
}
