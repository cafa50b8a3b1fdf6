//! Development mode overlays
//!
//! The last pipeline stage. A [`ModeConverter`] turns the deploy spec's sync and local
//! sub-specs into overlays and applies them to a manifest list; the engine only
//! decides which overlay runs and takes the workload back out of the result.
//! Local mode wins whenever the action runs in local mode, even if a sync
//! overlay is also configured.

#[cfg(test)]
use mockall::automock;

use stevedore_common::spec::{
    ActionMode, DeployAction, LocalPortSpec, SyncPathSpec, SyncableKind, WorkloadTargetSpec,
};
use stevedore_common::{Error, Result, ANNOTATION_MODE};
use tracing::debug;

use crate::workload::{Manifest, Workload};

/// Image swapped in for the main container in local mode
pub const DEFAULT_LOCAL_PROXY_IMAGE: &str = "ghcr.io/stevedore-dev/local-proxy:latest";

// =============================================================================
// Overlay types
// =============================================================================

/// The workload an overlay applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkloadTarget {
    /// Workload kind
    pub kind: SyncableKind,
    /// Workload name
    pub name: String,
}

impl WorkloadTarget {
    /// Target the given workload
    pub fn of(workload: &Workload) -> Self {
        Self {
            kind: workload.kind(),
            name: workload.name().to_string(),
        }
    }

    /// Whether `workload` is this target
    pub fn matches(&self, workload: &Workload) -> bool {
        workload.kind() == self.kind && workload.name() == self.name
    }
}

impl From<&WorkloadTargetSpec> for WorkloadTarget {
    fn from(spec: &WorkloadTargetSpec) -> Self {
        Self {
            kind: spec.kind,
            name: spec.name.clone(),
        }
    }
}

impl std::fmt::Display for WorkloadTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.name)
    }
}

/// Sync overlay: keep files in sync and optionally replace the entrypoint
#[derive(Clone, Debug, PartialEq)]
pub struct SyncOverlay {
    /// Explicit target; defaults to the rendered workload
    pub target: Option<WorkloadTarget>,
    /// Paths kept in sync
    pub paths: Vec<SyncPathSpec>,
    /// Command override
    pub command: Option<Vec<String>>,
    /// Args override
    pub args: Option<Vec<String>>,
}

/// Local overlay: route traffic for the workload to a process on the developer machine
#[derive(Clone, Debug, PartialEq)]
pub struct LocalOverlay {
    /// Explicit target; defaults to the rendered workload
    pub target: Option<WorkloadTarget>,
    /// Ports proxied to the local process
    pub ports: Vec<LocalPortSpec>,
    /// Command starting the local process
    pub command: Option<Vec<String>>,
}

// =============================================================================
// Converter
// =============================================================================

/// Converts mode sub-specs into overlays and applies them to manifests
#[cfg_attr(test, automock)]
pub trait ModeConverter: Send + Sync {
    /// The sync overlay for `action`, if it configures one
    fn convert_sync(&self, action: &DeployAction) -> Option<SyncOverlay>;

    /// The local overlay for `action`, if it configures one
    fn convert_local(&self, action: &DeployAction) -> Option<LocalOverlay>;

    /// Apply a sync overlay, returning the updated manifest list
    fn configure_sync(
        &self,
        action: &DeployAction,
        overlay: &SyncOverlay,
        default_target: &WorkloadTarget,
        manifests: Vec<Manifest>,
    ) -> Result<Vec<Manifest>>;

    /// Apply a local overlay, returning the updated manifest list
    fn configure_local(
        &self,
        action: &DeployAction,
        overlay: &LocalOverlay,
        default_target: &WorkloadTarget,
        manifests: Vec<Manifest>,
    ) -> Result<Vec<Manifest>>;
}

/// Built-in converter reading `sync` and `localMode` from the deploy spec
#[derive(Clone, Debug)]
pub struct StandardModeConverter {
    proxy_image: String,
}

impl Default for StandardModeConverter {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_PROXY_IMAGE)
    }
}

impl StandardModeConverter {
    /// Create a converter using `proxy_image` for local mode
    pub fn new(proxy_image: impl Into<String>) -> Self {
        Self {
            proxy_image: proxy_image.into(),
        }
    }

    fn find_target<'a>(
        action: &DeployAction,
        target: &WorkloadTarget,
        manifests: &'a mut [Manifest],
        mode: ActionMode,
    ) -> Result<&'a mut Workload> {
        manifests
            .iter_mut()
            .filter_map(Manifest::as_workload_mut)
            .find(|w| target.matches(w))
            .ok_or_else(|| {
                Error::configuration(
                    action.long_description(),
                    format!(
                        "{} mode target {} does not match any rendered workload",
                        mode, target
                    ),
                )
            })
    }

    fn annotate(workload: &mut Workload, mode: ActionMode) {
        workload
            .metadata_mut()
            .annotations
            .insert(ANNOTATION_MODE.to_string(), mode.as_str().to_string());
        workload
            .template_mut()
            .metadata
            .annotations
            .insert(ANNOTATION_MODE.to_string(), mode.as_str().to_string());
    }
}

impl ModeConverter for StandardModeConverter {
    fn convert_sync(&self, action: &DeployAction) -> Option<SyncOverlay> {
        let sync = action.spec.sync.as_ref()?;
        Some(SyncOverlay {
            target: sync.target.as_ref().map(WorkloadTarget::from),
            paths: sync.paths.clone(),
            command: sync.command.clone(),
            args: sync.args.clone(),
        })
    }

    fn convert_local(&self, action: &DeployAction) -> Option<LocalOverlay> {
        let local = action.spec.local_mode.as_ref()?;
        Some(LocalOverlay {
            target: local.target.as_ref().map(WorkloadTarget::from),
            ports: local.ports.clone(),
            command: local.command.clone(),
        })
    }

    fn configure_sync(
        &self,
        action: &DeployAction,
        overlay: &SyncOverlay,
        default_target: &WorkloadTarget,
        mut manifests: Vec<Manifest>,
    ) -> Result<Vec<Manifest>> {
        let target = overlay.target.as_ref().unwrap_or(default_target);
        let workload = Self::find_target(action, target, &mut manifests, ActionMode::Sync)?;

        if let Some(container) = workload.main_container_mut() {
            if let Some(command) = &overlay.command {
                container.command = Some(command.clone());
            }
            if let Some(args) = &overlay.args {
                container.args = Some(args.clone());
            }
        }
        Self::annotate(workload, ActionMode::Sync);
        Ok(manifests)
    }

    fn configure_local(
        &self,
        action: &DeployAction,
        overlay: &LocalOverlay,
        default_target: &WorkloadTarget,
        mut manifests: Vec<Manifest>,
    ) -> Result<Vec<Manifest>> {
        let target = overlay.target.as_ref().unwrap_or(default_target);
        let workload = Self::find_target(action, target, &mut manifests, ActionMode::Local)?;

        if let Some(container) = workload.main_container_mut() {
            container.image = self.proxy_image.clone();
            container.readiness_probe = None;
            container.liveness_probe = None;
        }
        Self::annotate(workload, ActionMode::Local);
        Ok(manifests)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// Chooses and applies at most one overlay
pub struct ModeOverlayEngine;

impl ModeOverlayEngine {
    /// Apply the overlay for the action's mode, returning the resulting workload
    pub fn apply(
        workload: Workload,
        action: &DeployAction,
        converter: &dyn ModeConverter,
    ) -> Result<Workload> {
        let default_target = WorkloadTarget::of(&workload);
        let manifests = vec![Manifest::from(workload)];

        let updated = match action.mode {
            ActionMode::Local => match converter.convert_local(action) {
                Some(overlay) => {
                    debug!(action = %action.name, "configuring local mode");
                    converter.configure_local(action, &overlay, &default_target, manifests)?
                }
                None => manifests,
            },
            ActionMode::Sync => match converter.convert_sync(action) {
                Some(overlay) => {
                    debug!(action = %action.name, "configuring sync mode");
                    converter.configure_sync(action, &overlay, &default_target, manifests)?
                }
                None => manifests,
            },
            ActionMode::Normal => manifests,
        };

        match updated.into_iter().next() {
            Some(Manifest::Workload(workload)) => Ok(*workload),
            Some(other) => Err(Error::internal(
                "mode-overlay",
                format!(
                    "overlay for {} returned a {} where a workload was expected",
                    action.name,
                    other.kind()
                ),
            )),
            None => Err(Error::internal(
                "mode-overlay",
                format!("overlay for {} returned no manifests", action.name),
            )),
        }
    }
}
