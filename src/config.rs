//! Workload definitions and verifier tunables.
//!
//! The synthetic workloads (logwriters and logreaders on CephFS and RBD
//! volumes) act as liveness and durability probes during failure
//! injection. Their labels, nominal replica counts, acceptable pod
//! statuses, owning controllers, and log-rotation retention are fixed
//! properties of the test deployment and live here as a single table.

use std::time::Duration;

/// Label selector for Ceph monitor pods.
pub const MON_APP_LABEL: &str = "app=rook-ceph-mon";

/// Label selector for the Ceph tools pod.
pub const TOOLS_APP_LABEL: &str = "app=rook-ceph-tools";

/// Node label key carrying the failure-domain zone.
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Expected monitor count for a healthy stretched quorum (2 + 2 + arbiter).
pub const STRETCH_MON_COUNT: usize = 5;

/// A synthetic workload tracked by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workload {
    /// CephFS logwriter Deployment; all replicas share one RWX volume.
    CephFsWriter,
    /// CephFS logreader Job, validating previously written logs.
    CephFsReader,
    /// RBD logwriter StatefulSet; each replica has a private RWO volume.
    RbdWriter,
}

/// The Kubernetes controller owning a workload's pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    Deployment,
    StatefulSet,
    Job,
}

impl Workload {
    pub const ALL: [Workload; 3] = [
        Workload::CephFsWriter,
        Workload::CephFsReader,
        Workload::RbdWriter,
    ];

    /// Label selector matching this workload's pods.
    pub fn label(&self) -> &'static str {
        match self {
            Workload::CephFsWriter => "app=logwriter-cephfs",
            Workload::CephFsReader => "app=logreader-cephfs",
            Workload::RbdWriter => "app=logwriter-rbd",
        }
    }

    /// Name of the owning controller object.
    pub fn controller_name(&self) -> &'static str {
        match self {
            Workload::CephFsWriter => "logwriter-cephfs",
            Workload::CephFsReader => "logreader-cephfs",
            Workload::RbdWriter => "logwriter-rbd",
        }
    }

    pub fn controller_kind(&self) -> ControllerKind {
        match self {
            Workload::CephFsWriter => ControllerKind::Deployment,
            Workload::CephFsReader => ControllerKind::Job,
            Workload::RbdWriter => ControllerKind::StatefulSet,
        }
    }

    /// Replica count the controller is expected to converge to.
    pub fn nominal_replicas(&self) -> usize {
        match self {
            Workload::CephFsWriter => 4,
            Workload::CephFsReader => 4,
            Workload::RbdWriter => 2,
        }
    }

    /// Pod statuses considered acceptable when enumerating this workload.
    ///
    /// Readers may legitimately run to completion; writers must stay up.
    pub fn acceptable_statuses(&self) -> &'static [&'static str] {
        match self {
            Workload::CephFsWriter | Workload::RbdWriter => &["Running"],
            Workload::CephFsReader => &["Running", "Completed", "Succeeded"],
        }
    }

    /// Log-rotation retention for writer workloads (None for readers).
    ///
    /// The CephFS writers rotate within a shared volume and keep 4 files;
    /// each RBD writer keeps a single file on its private volume.
    pub fn retention(&self) -> Option<usize> {
        match self {
            Workload::CephFsWriter => Some(4),
            Workload::RbdWriter => Some(1),
            Workload::CephFsReader => None,
        }
    }

    /// Directory inside the pod holding the workload's log files.
    pub fn log_dir(&self) -> &'static str {
        match self {
            Workload::CephFsWriter | Workload::CephFsReader => "/mnt/log",
            Workload::RbdWriter => "/mnt/log",
        }
    }

    /// Whether every pod sees the same files (shared RWX volume).
    ///
    /// When true, scanning one pod is enough; the others are redundant.
    pub fn shared_volume(&self) -> bool {
        matches!(self, Workload::CephFsWriter | Workload::CephFsReader)
    }
}

/// Runtime configuration for a verification run.
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// Namespace hosting the workloads and the Ceph cluster.
    pub namespace: String,
    /// Seconds a zone or node shutdown is held before recovery begins.
    /// Scenario code shortens this for "immediate" shutdown variants.
    pub default_shutdown_duration: u64,
    /// Paused pod instances tolerated by the read-pause check before a
    /// warning is raised (zones unaffected by the failure add noise).
    pub read_pause_tolerance: u32,
    /// Paused (pod, file) pairs tolerated by the write-pause check,
    /// per storage type.
    pub cephfs_write_pause_tolerance: u32,
    pub rbd_write_pause_tolerance: u32,
    /// Bound on how long a recovery scale-cycle waits for pods to
    /// terminate.
    pub scale_down_wait: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            namespace: "openshift-storage".to_string(),
            default_shutdown_duration: 600,
            read_pause_tolerance: 2,
            cephfs_write_pause_tolerance: 2,
            rbd_write_pause_tolerance: 0,
            scale_down_wait: Duration::from_secs(300),
        }
    }
}
