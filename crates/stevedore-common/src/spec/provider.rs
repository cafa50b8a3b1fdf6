//! Provider-level configuration shared by every Deploy action.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Provider-wide deployment strategy flag.
///
/// Deprecated: accepted for compatibility, has no effect. Rolling updates are
/// always used.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderDeploymentStrategy {
    /// Rolling updates
    #[default]
    Rolling,
    /// Blue/green (no longer implemented)
    BlueGreen,
}

/// Reference to a secret in a given namespace
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub struct ProviderSecretRef {
    /// Secret name
    pub name: String,
    /// Namespace the secret lives in
    #[serde(default = "default_secret_namespace")]
    pub namespace: String,
}

fn default_secret_namespace() -> String {
    "default".to_string()
}

/// Provider configuration
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Deprecated deployment strategy flag
    pub deployment_strategy: ProviderDeploymentStrategy,
    /// Secrets used to pull images, copied into the app namespace
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_pull_secrets: Vec<ProviderSecretRef>,
    /// Arbitrary secrets copied into the app namespace
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub copy_secrets: Vec<ProviderSecretRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blue_green_is_still_accepted() {
        let config: ProviderConfig = serde_json::from_value(serde_json::json!({
            "deploymentStrategy": "blue-green",
            "imagePullSecrets": [{"name": "registry"}]
        }))
        .unwrap();
        assert_eq!(
            config.deployment_strategy,
            ProviderDeploymentStrategy::BlueGreen
        );
        assert_eq!(config.image_pull_secrets[0].namespace, "default");
    }
}
