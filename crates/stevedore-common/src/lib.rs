//! Common types for stevedore: deploy specs, lineage metadata, errors, and utilities

pub mod error;
pub mod meta;
pub mod spec;
pub mod telemetry;
pub mod yaml;

pub use error::Error;
pub use meta::{Lineage, ObjectMeta};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix shared by every lineage label and annotation key.
///
/// Status matching and delete-by-selector logic in other tools read these keys,
/// so the prefix must not change.
pub const LINEAGE_KEY_PREFIX: &str = "garden.io";

/// Label carrying the owning module name (empty string when the action has no module)
pub const LABEL_MODULE: &str = "garden.io/module";

/// Label carrying the action key; the only key used in workload selectors
pub const LABEL_ACTION: &str = "garden.io/action";

/// Label carrying the Deploy action name; used for pruning and deletion
pub const LABEL_SERVICE: &str = "garden.io/service";

/// Annotation marking a resource as generated (value is always `"true"`)
pub const ANNOTATION_GENERATED: &str = "garden.io/generated";

/// Annotation carrying the action version string
pub const ANNOTATION_VERSION: &str = "garden.io/version";

/// Annotation recording the configured replica count before any adjustment
pub const ANNOTATION_CONFIGURED_REPLICAS: &str = "garden.io/configured.replicas";

/// Annotation recording which development mode overlay was applied
pub const ANNOTATION_MODE: &str = "garden.io/mode";

/// Build a lineage key from a short name, e.g. `"action"` -> `"garden.io/action"`
pub fn lineage_key(name: &str) -> String {
    format!("{}/{}", LINEAGE_KEY_PREFIX, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lineage_keys_match_constants() {
        assert_eq!(lineage_key("module"), LABEL_MODULE);
        assert_eq!(lineage_key("action"), LABEL_ACTION);
        assert_eq!(lineage_key("service"), LABEL_SERVICE);
        assert_eq!(lineage_key("generated"), ANNOTATION_GENERATED);
        assert_eq!(lineage_key("version"), ANNOTATION_VERSION);
    }
}
