//! Volume resolution
//!
//! Turns declared volumes into pod volumes plus container mounts. The source is
//! chosen in order: host path, then another action (which must be a declared
//! dependency able to back a PVC or ConfigMap), then an empty scratch dir.

use std::collections::BTreeSet;

use stevedore_common::spec::{DeployAction, VolumeCapability, VolumeSpec};
use stevedore_common::{Error, Result};
use tracing::debug;

use crate::helpers::resolve_path;
use crate::k8s::{Volume, VolumeMount};

/// Volumes for the pod spec and mounts for the container, in declaration order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedVolumes {
    /// Pod volumes
    pub volumes: Vec<Volume>,
    /// Container mounts
    pub mounts: Vec<VolumeMount>,
}

impl ResolvedVolumes {
    /// Whether no volumes were declared
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

/// Resolves declared volumes into concrete sources
pub struct VolumeResolver;

impl VolumeResolver {
    /// Resolve all volumes declared on the action
    pub fn resolve(action: &DeployAction) -> Result<ResolvedVolumes> {
        let mut resolved = ResolvedVolumes::default();
        let mut names = BTreeSet::new();

        for spec in &action.spec.volumes {
            if spec.name.is_empty() {
                return Err(Error::configuration(
                    action.long_description(),
                    "Must specify volume name",
                ));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(Error::configuration(
                    action.long_description(),
                    format!("volume name '{}' is declared more than once", spec.name),
                ));
            }

            resolved.mounts.push(VolumeMount {
                name: spec.name.clone(),
                mount_path: spec.container_path.clone(),
            });
            resolved.volumes.push(Self::source(action, spec)?);
        }

        Ok(resolved)
    }

    fn source(action: &DeployAction, spec: &VolumeSpec) -> Result<Volume> {
        let host_path = spec.host_path.as_deref().filter(|path| !path.is_empty());
        if let Some(host_path) = host_path {
            let path = resolve_path(&action.base_path, host_path).map_err(|e| {
                Error::configuration(
                    action.long_description(),
                    format!("cannot resolve host path '{}': {}", host_path, e),
                )
            })?;
            debug!(volume = %spec.name, path = %path.display(), "host path volume");
            return Ok(Volume::from_host_path(
                &spec.name,
                path.to_string_lossy().into_owned(),
            ));
        }

        let Some(reference) = &spec.action else {
            return Ok(Volume::from_empty_dir(&spec.name));
        };

        let dependency = action.get_dependency(reference).ok_or_else(|| {
            Error::configuration(
                action.long_description(),
                format!(
                    "{} specifies action '{}' on volume '{}' but the Deploy action could not be found. \
                     Please make sure it is specified as a dependency on the action.",
                    action.long_description(),
                    reference.name,
                    spec.name
                ),
            )
        })?;

        if dependency.supports(VolumeCapability::PersistentVolumeClaim) {
            Ok(Volume::from_pvc(&spec.name, &dependency.name))
        } else if dependency.supports(VolumeCapability::ConfigMap) {
            Ok(Volume::from_config_map(&spec.name, &dependency.name))
        } else {
            Err(Error::configuration(
                action.long_description(),
                format!(
                    "{} specifies an unsupported config {} for volume mount {}. \
                     Only `persistentvolumeclaim` and `configmap` action are supported at this time.",
                    action.long_description(),
                    dependency.name,
                    spec.name
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use stevedore_common::spec::{ActionReference, DependencyAction, DeploySpec};

    use crate::k8s::VolumeSource;

    fn action_with(volumes: Vec<VolumeSpec>) -> DeployAction {
        let mut action = DeployAction::new(
            "api",
            "api:v1",
            DeploySpec {
                volumes,
                ..Default::default()
            },
        );
        action.base_path = PathBuf::from("/work/api");
        action
    }

    fn volume(name: &str, path: &str) -> VolumeSpec {
        VolumeSpec {
            name: name.to_string(),
            container_path: path.to_string(),
            ..Default::default()
        }
    }

    fn action_ref(name: &str) -> ActionReference {
        ActionReference {
            kind: "Deploy".to_string(),
            name: name.to_string(),
        }
    }

    // =========================================================================
    // Story: source precedence
    // =========================================================================

    #[test]
    fn host_path_resolves_against_base_path() {
        let mut spec = volume("data", "/data");
        spec.host_path = Some("./fixtures".to_string());
        spec.action = Some(action_ref("ignored"));

        let resolved = VolumeResolver::resolve(&action_with(vec![spec])).unwrap();

        assert_eq!(
            resolved.volumes[0].source,
            VolumeSource::HostPath(crate::k8s::HostPathVolumeSource {
                path: "/work/api/fixtures".to_string()
            })
        );
        assert_eq!(resolved.mounts[0].mount_path, "/data");
    }

    #[test]
    fn no_source_yields_empty_dir() {
        let action = action_with(vec![volume("scratch", "/tmp")]);
        let resolved = VolumeResolver::resolve(&action).unwrap();
        assert_eq!(resolved.volumes, vec![Volume::from_empty_dir("scratch")]);
        assert_eq!(resolved.mounts[0].name, "scratch");
    }

    #[test]
    fn empty_host_path_is_ignored() {
        let mut scratch = volume("scratch", "/tmp");
        scratch.host_path = Some(String::new());
        let mut data = volume("data", "/data");
        data.host_path = Some(String::new());
        data.action = Some(action_ref("data-store"));

        let mut action = action_with(vec![scratch, data]);
        action.dependencies.push(
            DependencyAction::new("Deploy", "data-store")
                .with_capability(VolumeCapability::PersistentVolumeClaim),
        );

        let resolved = VolumeResolver::resolve(&action).unwrap();
        assert_eq!(
            resolved.volumes,
            vec![
                Volume::from_empty_dir("scratch"),
                Volume::from_pvc("data", "data-store"),
            ]
        );
    }

    #[test]
    fn pvc_capable_dependency_becomes_claim() {
        let mut spec = volume("data", "/data");
        spec.action = Some(action_ref("data-store"));
        let mut action = action_with(vec![spec]);
        action.dependencies.push(
            DependencyAction::new("Deploy", "data-store")
                .with_capability(VolumeCapability::PersistentVolumeClaim),
        );

        let resolved = VolumeResolver::resolve(&action).unwrap();
        assert_eq!(resolved.volumes, vec![Volume::from_pvc("data", "data-store")]);
    }

    #[test]
    fn config_map_capable_dependency_becomes_config_map() {
        let mut spec = volume("settings", "/etc/app");
        spec.action = Some(action_ref("settings"));
        let mut action = action_with(vec![spec]);
        action.dependencies.push(
            DependencyAction::new("Deploy", "settings")
                .with_capability(VolumeCapability::ConfigMap),
        );

        let resolved = VolumeResolver::resolve(&action).unwrap();
        assert_eq!(
            resolved.volumes,
            vec![Volume::from_config_map("settings", "settings")]
        );
    }

    // =========================================================================
    // Story: configuration errors
    // =========================================================================

    #[test]
    fn missing_name_is_rejected() {
        let err = VolumeResolver::resolve(&action_with(vec![volume("", "/data")])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("Must specify volume name"));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let err = VolumeResolver::resolve(&action_with(vec![
            volume("data", "/a"),
            volume("data", "/b"),
        ]))
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn undeclared_dependency_is_rejected() {
        let mut spec = volume("data", "/data");
        spec.action = Some(action_ref("data-store"));

        let err = VolumeResolver::resolve(&action_with(vec![spec])).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("'data-store'"));
    }

    #[test]
    fn dependency_without_capability_is_rejected() {
        let mut spec = volume("data", "/data");
        spec.action = Some(action_ref("worker"));
        let mut action = action_with(vec![spec]);
        action
            .dependencies
            .push(DependencyAction::new("Deploy", "worker"));

        let err = VolumeResolver::resolve(&action).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("unsupported config worker"));
    }
}
