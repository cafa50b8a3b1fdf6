//! Production-only scheduling and security settings

use stevedore_common::LABEL_ACTION;

use crate::k8s::{
    Affinity, LabelSelector, LabelSelectorRequirement, PodAffinityTerm, PodAntiAffinity,
    PodSecurityContext, WeightedPodAffinityTerm,
};
use crate::workload::Workload;

/// Topology used to spread replicas across nodes
pub const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

/// Weight of the anti-affinity preference
pub const ANTI_AFFINITY_WEIGHT: i32 = 100;

/// UID all containers run as in production
pub const RUN_AS_USER: i64 = 1000;
/// GID all containers run as in production
pub const RUN_AS_GROUP: i64 = 3000;
/// GID owning mounted volumes in production
pub const FS_GROUP: i64 = 2000;

/// Applies anti-affinity and a non-root pod security context
pub struct ProductionHardeningPolicy;

impl ProductionHardeningPolicy {
    /// Harden the workload's pod template. Purely additive.
    pub fn apply(mut workload: Workload, action_key: &str) -> Workload {
        let pod = &mut workload.template_mut().spec;
        pod.affinity = Some(Self::anti_affinity(action_key));
        pod.security_context = Some(PodSecurityContext {
            run_as_user: Some(RUN_AS_USER),
            run_as_group: Some(RUN_AS_GROUP),
            fs_group: Some(FS_GROUP),
        });
        workload
    }

    /// Prefer placing pods of the same action on different hosts
    pub fn anti_affinity(action_key: &str) -> Affinity {
        Affinity {
            pod_anti_affinity: Some(PodAntiAffinity {
                preferred_during_scheduling_ignored_during_execution: vec![
                    WeightedPodAffinityTerm {
                        weight: ANTI_AFFINITY_WEIGHT,
                        pod_affinity_term: PodAffinityTerm {
                            label_selector: LabelSelector {
                                match_labels: Default::default(),
                                match_expressions: vec![LabelSelectorRequirement {
                                    key: LABEL_ACTION.to_string(),
                                    operator: "In".to_string(),
                                    values: vec![action_key.to_string()],
                                }],
                            },
                            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
                        },
                    },
                ],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::replicas::ReplicaPlan;
    use crate::pipeline::WorkloadTemplateBuilder;
    use stevedore_common::spec::{DeployAction, DeploySpec};

    fn base(daemon: bool) -> Workload {
        let action = DeployAction::new(
            "api",
            "api:v1",
            DeploySpec {
                daemon,
                ..Default::default()
            },
        );
        let plan = ReplicaPlan {
            configured: 1,
            replicas: 3,
            revision_history_limit: 10,
        };
        WorkloadTemplateBuilder::build(&action, "prod", &plan, &[]).unwrap()
    }

    #[test]
    fn adds_soft_anti_affinity_on_action_label() {
        let hardened = ProductionHardeningPolicy::apply(base(false), "deploy.api");

        let json = serde_json::to_value(&hardened.template().spec.affinity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "podAntiAffinity": {
                    "preferredDuringSchedulingIgnoredDuringExecution": [{
                        "weight": 100,
                        "podAffinityTerm": {
                            "labelSelector": {
                                "matchExpressions": [{
                                    "key": "garden.io/action",
                                    "operator": "In",
                                    "values": ["deploy.api"]
                                }]
                            },
                            "topologyKey": "kubernetes.io/hostname"
                        }
                    }]
                }
            })
        );
    }

    #[test]
    fn sets_non_root_security_context() {
        let hardened = ProductionHardeningPolicy::apply(base(true), "deploy.api");
        assert_eq!(
            hardened.template().spec.security_context,
            Some(PodSecurityContext {
                run_as_user: Some(1000),
                run_as_group: Some(3000),
                fs_group: Some(2000),
            })
        );
    }

    #[test]
    fn leaves_everything_else_alone() {
        let original = base(false);
        let mut hardened = ProductionHardeningPolicy::apply(original.clone(), "deploy.api");
        let pod = &mut hardened.template_mut().spec;
        pod.affinity = None;
        pod.security_context = None;
        assert_eq!(hardened, original);
    }
}
