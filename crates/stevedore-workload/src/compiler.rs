//! WorkloadCompiler: runs the rendering pipeline for one Deploy action
//!
//! The single entry point for turning a `DeployAction` into its workload. Pure
//! and deterministic: the same action and options always render the same
//! workload. Nothing here talks to a cluster.

use stevedore_common::spec::DeployAction;
use stevedore_common::Result;
use tracing::debug;

use crate::k8s::LocalObjectReference;
use crate::pipeline::{
    ModeConverter, ModeOverlayEngine, ProductionHardeningPolicy, SpecNormalizer,
    StandardModeConverter, WorkloadTemplateBuilder,
};
use crate::warnings::WarningRegistry;
use crate::workload::Workload;

/// Renders the workload for a Deploy action.
///
/// Uses a builder pattern for optional settings:
///
/// ```rust,ignore
/// let workload = WorkloadCompiler::new(&action, "my-app", &warnings)
///     .with_production(true)
///     .with_image_pull_secrets(&pull_secrets)
///     .with_mode_converter(&converter)
///     .compile()?;
/// ```
pub struct WorkloadCompiler<'a> {
    action: &'a DeployAction,
    namespace: &'a str,
    warnings: &'a WarningRegistry,
    production: bool,
    image_pull_secrets: &'a [LocalObjectReference],
    converter: Option<&'a dyn ModeConverter>,
}

impl<'a> WorkloadCompiler<'a> {
    /// Create a compiler for a non-production environment with no pull secrets
    pub fn new(
        action: &'a DeployAction,
        namespace: &'a str,
        warnings: &'a WarningRegistry,
    ) -> Self {
        Self {
            action,
            namespace,
            warnings,
            production: false,
            image_pull_secrets: &[],
            converter: None,
        }
    }

    /// Mark the target environment as production
    pub fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Attach image pull secrets to the pod spec
    pub fn with_image_pull_secrets(mut self, secrets: &'a [LocalObjectReference]) -> Self {
        self.image_pull_secrets = secrets;
        self
    }

    /// Use a custom converter for sync and local mode overlays
    pub fn with_mode_converter(mut self, converter: &'a dyn ModeConverter) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Render the workload.
    ///
    /// Runs: replica normalization → base workload (container, probes,
    /// volumes) → production hardening → mode overlay.
    pub fn compile(self) -> Result<Workload> {
        let action = self.action;
        debug!(
            action = %action.name,
            mode = %action.mode,
            production = self.production,
            "compiling workload"
        );

        // 1. Replicas and revision history
        let plan = SpecNormalizer::normalize(
            &action.name,
            action.spec.replicas,
            self.production,
            action.mode,
            self.warnings,
        );

        // 2. Base workload
        let mut workload = WorkloadTemplateBuilder::build(
            action,
            self.namespace,
            &plan,
            self.image_pull_secrets,
        )?;

        // 3. Production hardening
        if self.production {
            workload = ProductionHardeningPolicy::apply(workload, &action.key());
        }

        // 4. Mode overlay
        let standard = StandardModeConverter::default();
        let converter: &dyn ModeConverter = match self.converter {
            Some(converter) => converter,
            None => &standard,
        };
        ModeOverlayEngine::apply(workload, action, converter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stevedore_common::spec::{
        ActionMode, DeploySpec, HealthCheckSpec, HttpGetCheck, PortProtocol, PortSpec,
    };

    fn http_action() -> DeployAction {
        DeployAction::new(
            "api",
            "api:v1",
            DeploySpec {
                ports: vec![PortSpec {
                    name: "http".to_string(),
                    protocol: PortProtocol::Tcp,
                    container_port: 8080,
                    host_port: None,
                }],
                health_check: Some(HealthCheckSpec {
                    http_get: Some(HttpGetCheck {
                        path: "/".to_string(),
                        port: "http".to_string(),
                        scheme: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        )
    }

    // =========================================================================
    // Story: production rendering
    // =========================================================================

    #[test]
    fn production_defaults_and_hardening() {
        let warnings = WarningRegistry::new();
        let action = http_action();
        let workload = WorkloadCompiler::new(&action, "prod", &warnings)
            .with_production(true)
            .compile()
            .unwrap();

        assert_eq!(workload.replicas(), Some(3));
        let pod = &workload.template().spec;
        assert!(pod.affinity.is_some());
        assert!(pod.security_context.is_some());
        assert!(warnings.is_empty());
    }

    #[test]
    fn zero_replicas_count_as_unset_in_production() {
        let mut action = http_action();
        action.spec.replicas = Some(0);
        let workload = WorkloadCompiler::new(&action, "prod", &WarningRegistry::new())
            .with_production(true)
            .compile()
            .unwrap();

        assert_eq!(workload.replicas(), Some(3));
        assert_eq!(
            workload
                .metadata()
                .annotations
                .get(stevedore_common::ANNOTATION_CONFIGURED_REPLICAS),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn non_production_is_not_hardened() {
        let warnings = WarningRegistry::new();
        let action = http_action();
        let workload = WorkloadCompiler::new(&action, "dev", &warnings)
            .compile()
            .unwrap();

        assert_eq!(workload.replicas(), Some(1));
        assert!(workload.template().spec.affinity.is_none());
        assert!(workload.template().spec.security_context.is_none());
    }

    // =========================================================================
    // Story: development modes
    // =========================================================================

    #[test]
    fn sync_mode_in_production_clamps_and_warns() {
        let warnings = WarningRegistry::new();
        let mut action = http_action();
        action.mode = ActionMode::Sync;
        action.spec.replicas = Some(4);

        let workload = WorkloadCompiler::new(&action, "prod", &warnings)
            .with_production(true)
            .compile()
            .unwrap();

        assert_eq!(workload.replicas(), Some(1));
        assert_eq!(warnings.warnings().len(), 1);
        let liveness = workload.main_container().unwrap().liveness_probe.as_ref();
        assert_eq!(liveness.unwrap().failure_threshold, 30);
    }

    #[test]
    fn compiling_twice_is_identical() {
        let action = http_action();
        let first = WorkloadCompiler::new(&action, "prod", &WarningRegistry::new())
            .with_production(true)
            .compile()
            .unwrap();
        let second = WorkloadCompiler::new(&action, "prod", &WarningRegistry::new())
            .with_production(true)
            .compile()
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
