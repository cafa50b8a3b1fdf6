//! The resolved Deploy action handed to the engine.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::container::ActionReference;
use super::deploy::{ActionMode, DeploySpec};
use crate::meta::Lineage;

/// The kinds of volume backing another action can provide.
///
/// Closed set: a dependency either advertises one of these or cannot back a volume.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum VolumeCapability {
    /// Backed by a PersistentVolumeClaim named after the action
    PersistentVolumeClaim,
    /// Backed by a ConfigMap named after the action
    ConfigMap,
}

/// A resolved dependency of the Deploy action
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DependencyAction {
    /// Action kind (e.g. "Deploy")
    pub kind: String,
    /// Action name
    pub name: String,
    /// Volume capabilities this action provides
    #[serde(default)]
    pub capabilities: BTreeSet<VolumeCapability>,
}

impl DependencyAction {
    /// Create a dependency with no capabilities
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    /// Add a capability
    pub fn with_capability(mut self, capability: VolumeCapability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Whether this action can back the given kind of volume
    pub fn supports(&self, capability: VolumeCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    fn matches(&self, reference: &ActionReference) -> bool {
        self.kind.eq_ignore_ascii_case(&reference.kind) && self.name == reference.name
    }
}

/// A fully resolved container Deploy action
#[derive(Clone, Debug, PartialEq)]
pub struct DeployAction {
    /// Action name
    pub name: String,
    /// Owning module, if any
    pub module_name: Option<String>,
    /// Version string of the action
    pub version: String,
    /// Directory the action was declared in; host paths resolve against it
    pub base_path: PathBuf,
    /// Image reference to deploy
    pub image_id: String,
    /// Mode this action runs in
    pub mode: ActionMode,
    /// The deploy spec
    pub spec: DeploySpec,
    /// Env vars provided by the runtime; the deploy spec's env overrides them
    pub runtime_env: BTreeMap<String, String>,
    /// Resolved dependencies
    pub dependencies: Vec<DependencyAction>,
}

impl DeployAction {
    /// Create an action in normal mode with no dependencies
    pub fn new(name: impl Into<String>, image_id: impl Into<String>, spec: DeploySpec) -> Self {
        Self {
            name: name.into(),
            module_name: None,
            version: String::new(),
            base_path: PathBuf::from("."),
            image_id: image_id.into(),
            mode: ActionMode::Normal,
            spec,
            runtime_env: BTreeMap::new(),
            dependencies: Vec::new(),
        }
    }

    /// Action key, e.g. `deploy.api`
    pub fn key(&self) -> String {
        format!("deploy.{}", self.name)
    }

    /// Human-readable description used in error messages
    pub fn long_description(&self) -> String {
        format!("Deploy type=container name={}", self.name)
    }

    /// Module name, or the empty string
    pub fn module(&self) -> &str {
        self.module_name.as_deref().unwrap_or("")
    }

    /// Look up a declared dependency by reference
    pub fn get_dependency(&self, reference: &ActionReference) -> Option<&DependencyAction> {
        self.dependencies.iter().find(|d| d.matches(reference))
    }

    /// Lineage identity stamped onto every generated manifest
    pub fn lineage(&self) -> Lineage {
        Lineage {
            module: self.module().to_string(),
            service: self.name.clone(),
            version: self.version.clone(),
        }
    }
}
