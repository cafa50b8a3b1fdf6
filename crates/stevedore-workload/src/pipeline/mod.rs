//! Compilation pipeline stages
//!
//! Each stage is a unit struct with associated functions. The order they run in
//! lives in [`crate::compiler::WorkloadCompiler`].

pub mod container;
pub mod hardening;
pub mod overlay;
pub mod pod_template;
pub mod probes;
pub mod replicas;
pub mod volumes;

pub use container::ContainerBuilder;
pub use hardening::ProductionHardeningPolicy;
pub use overlay::{
    LocalOverlay, ModeConverter, ModeOverlayEngine, StandardModeConverter, SyncOverlay,
    WorkloadTarget,
};
pub use pod_template::WorkloadTemplateBuilder;
pub use probes::HealthProbeConfigurator;
pub use replicas::{ReplicaPlan, SpecNormalizer};
pub use volumes::{ResolvedVolumes, VolumeResolver};
