//! The stretch-cluster aggregate root.
//!
//! One [`StretchCluster`] exists per test run. It owns the in-memory
//! workload and log-file state explicitly — every update goes through a
//! method that mutates a clearly-owned field, so no list is ever shared
//! between labels behind the caller's back. Pod, deployment, and job
//! objects are referenced, never owned: their lifecycle belongs to the
//! cluster's own controllers (or to the recovery orchestrator when it
//! forces a recreate).

pub mod ledger;
pub mod registry;

use std::collections::HashMap;

use k8s_openapi::api::core::v1::Pod;
use kube::{Api, Client};

use crate::config::{VerifierConfig, Workload};
use crate::error::{Error, Result};

pub use ledger::{LedgerDiff, LogLedger};
pub use registry::PodRef;

/// Snapshot of the pods currently representing one workload.
#[derive(Debug, Clone, Default)]
pub struct WorkloadPods {
    pub pods: Vec<PodRef>,
}

/// Resolve a workload's snapshot, requiring a prior enumeration.
///
/// Every checker takes its pod set from the registry; running one
/// against a workload that was never enumerated is a caller bug, not an
/// empty result.
pub(crate) fn require_enumerated(
    snapshot: Option<&WorkloadPods>,
    workload: Workload,
) -> Result<&WorkloadPods> {
    snapshot.ok_or_else(|| {
        Error::Validation(format!(
            "no pod snapshot for {}; enumerate the workload first",
            workload.label()
        ))
    })
}

/// Aggregate root for one verification run.
pub struct StretchCluster {
    pub(crate) client: Client,
    pub(crate) pods: Api<Pod>,
    pub config: VerifierConfig,
    pub(crate) workload_map: HashMap<Workload, WorkloadPods>,
    pub(crate) ledgers: HashMap<Workload, LogLedger>,
}

impl StretchCluster {
    pub fn new(client: Client, config: VerifierConfig) -> Self {
        let pods = Api::namespaced(client.clone(), &config.namespace);
        let ledgers = Workload::ALL
            .into_iter()
            .filter_map(|w| w.retention().map(|n| (w, LogLedger::new(n))))
            .collect();
        Self {
            client,
            pods,
            config,
            workload_map: HashMap::new(),
            ledgers,
        }
    }

    /// The most recent pod snapshot for a workload, if one was taken.
    pub fn workload_pods(&self, workload: Workload) -> Option<&WorkloadPods> {
        self.workload_map.get(&workload)
    }

    /// The log-file ledger for a writer workload.
    pub fn ledger(&self, workload: Workload) -> Option<&LogLedger> {
        self.ledgers.get(&workload)
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }
}
