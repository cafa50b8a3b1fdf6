//! Main container assembly: env, ports, resources, security context

use std::collections::BTreeMap;

use stevedore_common::spec::{DeployAction, DeploySpec, EnvValue};

use crate::helpers::{cpu_quantity, memory_quantity};
use crate::k8s::{
    Capabilities, Container, ContainerPort, EnvVar, ResourceQuantity, ResourceRequirements,
    SecurityContext,
};

/// Image pull policy for every rendered container
pub const IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Identity variables injected ahead of user env, read from the downward API
pub const IDENTITY_ENV: [(&str, &str); 7] = [
    ("POD_HOST_IP", "status.hostIP"),
    ("POD_IP", "status.podIP"),
    ("POD_NAME", "metadata.name"),
    ("POD_NAMESPACE", "metadata.namespace"),
    ("POD_NODE_NAME", "spec.nodeName"),
    ("POD_SERVICE_ACCOUNT", "spec.serviceAccountName"),
    ("POD_UID", "metadata.uid"),
];

/// Builds the single container of the pod template
pub struct ContainerBuilder;

impl ContainerBuilder {
    /// Build the container without probes or volume mounts
    pub fn build(action: &DeployAction) -> Container {
        let spec = &action.spec;
        let ports = Self::ports(spec);

        Container {
            name: action.name.clone(),
            image: action.image_id.clone(),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_string()),
            command: (!spec.command.is_empty()).then(|| spec.command.clone()),
            args: (!spec.args.is_empty()).then(|| spec.args.clone()),
            env: Self::env(action),
            ports: (!ports.is_empty()).then_some(ports),
            resources: Some(Self::resources(spec)),
            readiness_probe: None,
            liveness_probe: None,
            volume_mounts: None,
            security_context: Some(Self::security_context(spec)),
            tty: spec.tty.then_some(true),
            stdin: spec.tty.then_some(true),
        }
    }

    /// Identity vars first, then runtime env overlaid by the deploy spec's env, sorted by name
    pub fn env(action: &DeployAction) -> Vec<EnvVar> {
        let mut env: Vec<EnvVar> = IDENTITY_ENV
            .iter()
            .map(|(name, path)| EnvVar::from_field(*name, *path))
            .collect();

        let mut merged: BTreeMap<&str, EnvVar> = action
            .runtime_env
            .iter()
            .map(|(k, v)| (k.as_str(), EnvVar::literal(k, v)))
            .collect();

        for (name, value) in &action.spec.env {
            let var = match value {
                EnvValue::Secret { secret_ref } => {
                    EnvVar::from_secret(name, &secret_ref.name, &secret_ref.key)
                }
                literal => EnvVar::literal(name, literal.literal().unwrap_or_default()),
            };
            merged.insert(name.as_str(), var);
        }

        env.extend(merged.into_values());
        env
    }

    /// Declared ports, plus host-bound copies for daemons.
    ///
    /// Daemon host ports are appended unnamed so they do not clash with the
    /// named container ports.
    pub fn ports(spec: &DeploySpec) -> Vec<ContainerPort> {
        let mut ports: Vec<ContainerPort> = spec
            .ports
            .iter()
            .map(|p| ContainerPort {
                name: Some(p.name.clone()),
                protocol: Some(p.protocol.as_str().to_string()),
                container_port: p.container_port,
                host_port: None,
            })
            .collect();

        if spec.daemon {
            ports.extend(spec.ports.iter().filter_map(|p| {
                p.host_port.map(|host_port| ContainerPort {
                    name: None,
                    protocol: Some(p.protocol.as_str().to_string()),
                    container_port: p.container_port,
                    host_port: Some(host_port),
                })
            }));
        }

        ports
    }

    /// Requests from the minimums, limits from the maximums or legacy limits
    pub fn resources(spec: &DeploySpec) -> ResourceRequirements {
        let legacy = spec.limits.clone().unwrap_or_default();
        let max_cpu = legacy.cpu.or(spec.cpu.max);
        let max_memory = legacy.memory.or(spec.memory.max);

        let limits = (max_cpu.is_some() || max_memory.is_some()).then(|| ResourceQuantity {
            cpu: max_cpu.map(cpu_quantity),
            memory: max_memory.map(memory_quantity),
        });

        ResourceRequirements {
            requests: Some(ResourceQuantity {
                cpu: Some(cpu_quantity(spec.cpu.min)),
                memory: Some(memory_quantity(spec.memory.min)),
            }),
            limits,
        }
    }

    /// Privilege escalation always follows `privileged`; the rest only when set
    pub fn security_context(spec: &DeploySpec) -> SecurityContext {
        let privileged = spec.privileged.unwrap_or(false);
        let capabilities = (spec.add_capabilities.is_some() || spec.drop_capabilities.is_some())
            .then(|| Capabilities {
                add: spec.add_capabilities.clone(),
                drop: spec.drop_capabilities.clone(),
            });

        SecurityContext {
            allow_privilege_escalation: Some(privileged),
            privileged: privileged.then_some(true),
            capabilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_common::spec::{
        CpuSpec, LimitsSpec, MemorySpec, PortProtocol, PortSpec, SecretKeyRef,
    };
    use stevedore_common::yaml::from_yaml;

    fn port(name: &str, container_port: u16, host_port: Option<u16>) -> PortSpec {
        PortSpec {
            name: name.to_string(),
            protocol: PortProtocol::Tcp,
            container_port,
            host_port,
        }
    }

    // =========================================================================
    // Story: environment
    // =========================================================================

    #[test]
    fn identity_vars_come_first() {
        let mut spec = DeploySpec::default();
        spec.env.insert("AAA".to_string(), EnvValue::from("first"));
        let action = DeployAction::new("api", "api:v1", spec);

        let env = ContainerBuilder::env(&action);
        let names: Vec<&str> = env.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "POD_HOST_IP",
                "POD_IP",
                "POD_NAME",
                "POD_NAMESPACE",
                "POD_NODE_NAME",
                "POD_SERVICE_ACCOUNT",
                "POD_UID",
                "AAA"
            ]
        );
        assert_eq!(
            env[1].value_from.as_ref().unwrap().field_ref.as_ref().unwrap().field_path,
            "status.podIP"
        );
    }

    #[test]
    fn spec_env_overrides_runtime_env() {
        let mut spec = DeploySpec::default();
        spec.env.insert("LOG_LEVEL".to_string(), EnvValue::from("debug"));
        spec.env.insert(
            "TOKEN".to_string(),
            EnvValue::Secret {
                secret_ref: SecretKeyRef {
                    name: "creds".to_string(),
                    key: "token".to_string(),
                },
            },
        );
        let mut action = DeployAction::new("api", "api:v1", spec);
        action
            .runtime_env
            .insert("LOG_LEVEL".to_string(), "info".to_string());
        action
            .runtime_env
            .insert("GARDEN_VERSION".to_string(), "v-1".to_string());

        let env = ContainerBuilder::env(&action);
        let user: Vec<&EnvVar> = env.iter().skip(IDENTITY_ENV.len()).collect();

        assert_eq!(user.len(), 3);
        assert_eq!(user[0].name, "GARDEN_VERSION");
        assert_eq!(user[1], &EnvVar::literal("LOG_LEVEL", "debug"));
        assert_eq!(user[2], &EnvVar::from_secret("TOKEN", "creds", "token"));
    }

    // =========================================================================
    // Story: ports
    // =========================================================================

    #[test]
    fn no_ports_means_no_ports_field() {
        let action = DeployAction::new("api", "api:v1", DeploySpec::default());
        assert!(ContainerBuilder::build(&action).ports.is_none());
    }

    #[test]
    fn host_ports_only_added_for_daemons() {
        let mut spec = DeploySpec {
            ports: vec![port("http", 8080, Some(80)), port("metrics", 9090, None)],
            ..Default::default()
        };
        assert_eq!(ContainerBuilder::ports(&spec).len(), 2);

        spec.daemon = true;
        let ports = ContainerBuilder::ports(&spec);
        assert_eq!(ports.len(), 3);
        assert_eq!(
            ports[2],
            ContainerPort {
                name: None,
                protocol: Some("TCP".to_string()),
                container_port: 8080,
                host_port: Some(80),
            }
        );
    }

    // =========================================================================
    // Story: resources and security
    // =========================================================================

    #[test]
    fn default_resources() {
        let resources = ContainerBuilder::resources(&DeploySpec::default());
        let requests = resources.requests.unwrap();
        let limits = resources.limits.unwrap();
        assert_eq!(requests.cpu.as_deref(), Some("10m"));
        assert_eq!(requests.memory.as_deref(), Some("90Mi"));
        assert_eq!(limits.cpu.as_deref(), Some("1000m"));
        assert_eq!(limits.memory.as_deref(), Some("1Gi"));
    }

    #[test]
    fn legacy_limits_override_maximums() {
        let spec = DeploySpec {
            cpu: CpuSpec {
                min: 100,
                max: None,
            },
            memory: MemorySpec {
                min: 256,
                max: None,
            },
            limits: Some(LimitsSpec {
                cpu: Some(500),
                memory: None,
            }),
            ..Default::default()
        };
        let limits = ContainerBuilder::resources(&spec).limits.unwrap();
        assert_eq!(limits.cpu.as_deref(), Some("500m"));
        assert_eq!(limits.memory, None);
    }

    #[test]
    fn no_maximums_means_no_limits() {
        let spec = DeploySpec {
            cpu: CpuSpec {
                min: 100,
                max: None,
            },
            memory: MemorySpec {
                min: 256,
                max: None,
            },
            ..Default::default()
        };
        assert!(ContainerBuilder::resources(&spec).limits.is_none());
    }

    #[test]
    fn partial_resource_blocks_keep_default_limits() {
        let spec: DeploySpec = from_yaml("cpu: {min: 100}\nmemory: {min: 256}").unwrap();
        let resources = ContainerBuilder::resources(&spec);
        let requests = resources.requests.unwrap();
        let limits = resources.limits.unwrap();
        assert_eq!(requests.cpu.as_deref(), Some("100m"));
        assert_eq!(requests.memory.as_deref(), Some("256Mi"));
        assert_eq!(limits.cpu.as_deref(), Some("1000m"));
        assert_eq!(limits.memory.as_deref(), Some("1Gi"));

        let spec: DeploySpec = from_yaml("cpu: {max: 2000}").unwrap();
        let resources = ContainerBuilder::resources(&spec);
        assert_eq!(resources.requests.unwrap().cpu.as_deref(), Some("10m"));
        assert_eq!(resources.limits.unwrap().cpu.as_deref(), Some("2000m"));
    }

    #[test]
    fn unprivileged_by_default() {
        let ctx = ContainerBuilder::security_context(&DeploySpec::default());
        assert_eq!(ctx.allow_privilege_escalation, Some(false));
        assert_eq!(ctx.privileged, None);
        assert_eq!(ctx.capabilities, None);
    }

    #[test]
    fn privileged_with_capabilities() {
        let spec = DeploySpec {
            privileged: Some(true),
            add_capabilities: Some(vec!["NET_ADMIN".to_string()]),
            ..Default::default()
        };
        let ctx = ContainerBuilder::security_context(&spec);
        assert_eq!(ctx.allow_privilege_escalation, Some(true));
        assert_eq!(ctx.privileged, Some(true));
        let caps = ctx.capabilities.unwrap();
        assert_eq!(caps.add, Some(vec!["NET_ADMIN".to_string()]));
        assert_eq!(caps.drop, None);
    }

    #[test]
    fn tty_also_opens_stdin() {
        let spec = DeploySpec {
            tty: true,
            command: vec!["sh".to_string()],
            ..Default::default()
        };
        let container = ContainerBuilder::build(&DeployAction::new("shell", "busybox", spec));
        assert_eq!(container.tty, Some(true));
        assert_eq!(container.stdin, Some(true));
        assert_eq!(container.command, Some(vec!["sh".to_string()]));
        assert_eq!(container.args, None);
        assert_eq!(container.image_pull_policy.as_deref(), Some("IfNotPresent"));
    }
}
