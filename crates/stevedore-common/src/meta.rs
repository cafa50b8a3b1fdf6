//! Object metadata and lineage stamping
//!
//! Every manifest produced for a Deploy action carries four lineage entries:
//! module and service labels, plus generated and version annotations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{ANNOTATION_GENERATED, ANNOTATION_VERSION, LABEL_MODULE, LABEL_SERVICE};

/// Kubernetes object metadata (the subset the engine produces)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Create metadata with a name and namespace and no labels
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add an annotation
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }
}

/// The lineage identity of a Deploy action, stamped onto every generated manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lineage {
    /// Module name, empty when the action does not belong to a module
    pub module: String,
    /// Deploy action name
    pub service: String,
    /// Action version string
    pub version: String,
}

impl Lineage {
    /// Stamp the four lineage keys onto the given metadata.
    ///
    /// Existing values under the same keys are overwritten; all other labels
    /// and annotations are left alone.
    pub fn stamp(&self, meta: &mut ObjectMeta) {
        meta.labels
            .insert(LABEL_MODULE.to_string(), self.module.clone());
        meta.labels
            .insert(LABEL_SERVICE.to_string(), self.service.clone());
        meta.annotations
            .insert(ANNOTATION_GENERATED.to_string(), "true".to_string());
        meta.annotations
            .insert(ANNOTATION_VERSION.to_string(), self.version.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_sets_all_four_keys() {
        let lineage = Lineage {
            module: "backend".to_string(),
            service: "api".to_string(),
            version: "v-abc123".to_string(),
        };
        let mut meta = ObjectMeta::new("api", "dev").with_label("app", "api");

        lineage.stamp(&mut meta);

        assert_eq!(meta.labels.get(LABEL_MODULE), Some(&"backend".to_string()));
        assert_eq!(meta.labels.get(LABEL_SERVICE), Some(&"api".to_string()));
        assert_eq!(meta.labels.get("app"), Some(&"api".to_string()));
        assert_eq!(
            meta.annotations.get(ANNOTATION_GENERATED),
            Some(&"true".to_string())
        );
        assert_eq!(
            meta.annotations.get(ANNOTATION_VERSION),
            Some(&"v-abc123".to_string())
        );
    }

    #[test]
    fn empty_namespace_is_not_serialized() {
        let json = serde_json::to_value(ObjectMeta::new("api", "")).unwrap();
        assert!(json.get("namespace").is_none());
        assert!(json.get("labels").is_none());
    }
}
