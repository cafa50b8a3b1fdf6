//! Selector drift reconciliation
//!
//! Workload selectors are immutable. When the status provider reports deployed
//! resources whose selector no longer matches the one about to be applied, those
//! resources have to be deleted before the new manifests can go out. Production
//! environments only allow that with an explicit force flag.

use stevedore_common::spec::DeployAction;
use stevedore_common::{Error, Result};
use tracing::{debug, instrument};

use crate::collaborators::ClusterClient;
use crate::warnings::WarningRegistry;

/// What to do about reported selector drift
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriftDecision {
    /// Nothing was reported
    NoDrift,
    /// Refuse to deploy; nothing is deleted
    Abort,
    /// Delete exactly these keys, then deploy
    DeleteAndProceed {
        /// Resource keys to delete
        keys: Vec<String>,
    },
}

/// Decides and carries out deletion of resources with a stale selector
pub struct SelectorDriftReconciler;

impl SelectorDriftReconciler {
    /// Pure decision table over the reported keys and environment flags
    pub fn decide(changed_keys: &[String], production: bool, force: bool) -> DriftDecision {
        if changed_keys.is_empty() {
            return DriftDecision::NoDrift;
        }
        if production && !force {
            return DriftDecision::Abort;
        }
        DriftDecision::DeleteAndProceed {
            keys: changed_keys.to_vec(),
        }
    }

    /// Decide, warn, and delete the reported keys when allowed.
    ///
    /// Returns a deployment error without touching the cluster when the
    /// environment is production and `force` is not set.
    #[instrument(skip(cluster, action, warnings), fields(action = %action.name))]
    pub async fn reconcile(
        cluster: &dyn ClusterClient,
        action: &DeployAction,
        namespace: &str,
        changed_keys: &[String],
        production: bool,
        force: bool,
        warnings: &WarningRegistry,
    ) -> Result<()> {
        let prefix = format!(
            "Deploy {} was deployed with a different spec.selector and needs to be deleted before redeploying.",
            action.name
        );

        match Self::decide(changed_keys, production, force) {
            DriftDecision::NoDrift => Ok(()),
            DriftDecision::Abort => Err(Error::deployment(
                &action.name,
                format!(
                    "{} Since this environment has production = true, stevedore won't automatically delete \
                     this resource. To do so, use the --force flag when deploying. You can also delete the \
                     resource from your cluster manually and try again.",
                    prefix
                ),
            )),
            DriftDecision::DeleteAndProceed { keys } => {
                let reason = if production {
                    "Since we're deploying with force = true, we'll now delete it before redeploying."
                } else {
                    "Since this environment does not have production = true, we'll now delete it before redeploying."
                };
                warnings.emit(&action.name, format!("{} {}", prefix, reason));
                debug!(keys = ?keys, "deleting resources with stale selector");
                cluster.delete_by_keys(namespace, &keys).await
            }
        }
    }
}
