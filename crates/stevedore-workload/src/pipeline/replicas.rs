//! Replica count and revision history defaults

use stevedore_common::spec::ActionMode;
use tracing::debug;

use crate::warnings::WarningRegistry;

/// Replicas when nothing is requested
pub const DEFAULT_REPLICAS: u32 = 1;

/// Replicas in production when nothing is requested
pub const PRODUCTION_MINIMUM_REPLICAS: u32 = 3;

/// Old ReplicaSets kept in production
pub const PRODUCTION_REVISION_HISTORY_LIMIT: u32 = 10;

/// Old ReplicaSets kept everywhere else
pub const DEFAULT_REVISION_HISTORY_LIMIT: u32 = 3;

/// Normalized replica settings for one render
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplicaPlan {
    /// The requested count, or 1. Recorded before any production or mode adjustment.
    pub configured: u32,
    /// The count actually rendered
    pub replicas: u32,
    /// Revision history retention
    pub revision_history_limit: u32,
}

/// Applies environment and mode dependent defaults
pub struct SpecNormalizer;

impl SpecNormalizer {
    /// Compute the replica plan.
    ///
    /// An explicit request always wins over the production minimum; sync and
    /// local mode then pin the count to one, with a warning when that lowers it.
    /// A request of zero counts as no request.
    pub fn normalize(
        action: &str,
        requested: Option<u32>,
        production: bool,
        mode: ActionMode,
        warnings: &WarningRegistry,
    ) -> ReplicaPlan {
        let requested = requested.filter(|count| *count > 0);
        let configured = requested.unwrap_or(DEFAULT_REPLICAS);
        let mut replicas = configured;

        if production && requested.is_none() {
            replicas = PRODUCTION_MINIMUM_REPLICAS;
        }

        if mode.is_dev_mode() && replicas > 1 {
            warnings.emit(
                action,
                format!(
                    "Deploy {} is running in {} mode, so replicas are capped at 1 (would otherwise be {})",
                    action, mode, replicas
                ),
            );
            replicas = 1;
        }

        let revision_history_limit = if production {
            PRODUCTION_REVISION_HISTORY_LIMIT
        } else {
            DEFAULT_REVISION_HISTORY_LIMIT
        };

        debug!(action = %action, configured, replicas, "normalized replicas");

        ReplicaPlan {
            configured,
            replicas,
            revision_history_limit,
        }
    }
}
