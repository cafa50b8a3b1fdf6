//! Render command

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use stevedore_common::spec::{ActionMode, DeployAction, DeploySpec};
use stevedore_common::yaml::from_yaml;
use stevedore_workload::k8s::LocalObjectReference;
use stevedore_workload::pipeline::overlay::DEFAULT_LOCAL_PROXY_IMAGE;
use stevedore_workload::{Manifest, StandardModeConverter, WarningRegistry, WorkloadCompiler};
use tracing::info;

#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the deploy spec YAML
    #[arg(long)]
    pub spec: PathBuf,

    /// Deploy action name
    #[arg(long)]
    pub name: String,

    /// Module the action belongs to
    #[arg(long)]
    pub module: Option<String>,

    /// Action version string
    #[arg(long, default_value = "")]
    pub version: String,

    /// Image to deploy (defaults to the action name)
    #[arg(long)]
    pub image: Option<String>,

    /// Namespace to render into
    #[arg(long, env = "STEVEDORE_NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Mode to render: normal, sync or local
    #[arg(long, default_value = "normal")]
    pub mode: ActionMode,

    /// Render for a production environment
    #[arg(long, env = "STEVEDORE_PRODUCTION")]
    pub production: bool,

    /// Directory host paths resolve against (defaults to the deploy spec's directory)
    #[arg(long)]
    pub base_path: Option<PathBuf>,

    /// Image pull secret to attach to the pod (repeatable)
    #[arg(long = "image-pull-secret")]
    pub image_pull_secrets: Vec<String>,

    /// Image used in place of the container in local mode
    #[arg(long, default_value = DEFAULT_LOCAL_PROXY_IMAGE)]
    pub local_proxy_image: String,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.spec)
        .with_context(|| format!("failed to read {}", args.spec.display()))?;
    let spec: DeploySpec =
        from_yaml(&raw).with_context(|| format!("invalid deploy spec {}", args.spec.display()))?;

    let warnings = WarningRegistry::new();
    let manifests = render(&args, spec, &warnings)?;

    println!("{}", serde_json::to_string_pretty(&manifests)?);
    info!(
        action = %args.name,
        warnings = warnings.warnings().len(),
        "rendered"
    );
    Ok(())
}

/// Render the lineage-stamped workload for `spec`
pub fn render(
    args: &RenderArgs,
    spec: DeploySpec,
    warnings: &WarningRegistry,
) -> anyhow::Result<Vec<Manifest>> {
    let action = build_action(args, spec);
    let pull_secrets: Vec<LocalObjectReference> = args
        .image_pull_secrets
        .iter()
        .map(|name| LocalObjectReference { name: name.clone() })
        .collect();
    let converter = StandardModeConverter::new(&args.local_proxy_image);

    let workload = WorkloadCompiler::new(&action, &args.namespace, warnings)
        .with_production(args.production)
        .with_image_pull_secrets(&pull_secrets)
        .with_mode_converter(&converter)
        .compile()?;

    let mut manifest = Manifest::from(workload);
    action.lineage().stamp(manifest.metadata_mut());
    Ok(vec![manifest])
}

fn build_action(args: &RenderArgs, spec: DeploySpec) -> DeployAction {
    let image = args.image.clone().unwrap_or_else(|| args.name.clone());
    let mut action = DeployAction::new(&args.name, image, spec);
    action.module_name = args.module.clone();
    action.version = args.version.clone();
    action.mode = args.mode;
    action.base_path = args
        .base_path
        .clone()
        .unwrap_or_else(|| spec_dir(&args.spec));
    action
}

fn spec_dir(spec: &Path) -> PathBuf {
    match spec.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
