//! stretch-verifier
//!
//! Failure-injection and recovery-verification orchestrator for a
//! stretched Ceph cluster running on Kubernetes. A disaster-recovery
//! test injects a bounded failure (network split, zone shutdown, mon
//! crash) through external tooling, then hands this crate the failure
//! window: the workload pod registry, log-file ledger, pause checkers,
//! accessibility prober, and quorum validator verify the cluster healed
//! without losing or corrupting data, and the recovery orchestrator
//! clears the known ways pods get stuck on the way back.
//!
//! There is no CLI surface; test harnesses construct a
//! [`StretchCluster`] and compose the pieces directly.

pub mod ceph;
pub mod checks;
pub mod cluster;
pub mod config;
pub mod error;
pub mod exec;
pub mod nodes;
pub mod recovery;
pub mod retry;
pub mod window;

pub use ceph::conn_score::{collect_conn_scores, mon_quorum_ranks, validate_conn_score};
pub use ceph::health::{CephHealth, ProbeOutcome, classify_health, wait_for_health_ok};
pub use ceph::prober::{
    check_ceph_accessibility, check_ceph_accessibility_default, check_ceph_accessibility_with_retry,
};
pub use ceph::toolbox::Toolbox;
pub use checks::{PauseReport, StorageType};
pub use cluster::StretchCluster;
pub use config::{VerifierConfig, Workload};
pub use error::{Error, Result};
pub use window::FailureWindow;

/// Initialize tracing for a test harness run.
///
/// Honors `RUST_LOG`; defaults to info-level output for this crate.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("stretch_verifier=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
