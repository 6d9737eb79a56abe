//! Ceph control-plane access and invariant checks.
//!
//! Everything here talks to Ceph through command execution inside cluster
//! pods: `ceph` subcommands via the tools pod, and per-monitor admin
//! socket commands via the monitor pods themselves.

pub mod conn_score;
pub mod health;
pub mod prober;
pub mod toolbox;

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::ListParams;

use crate::config::MON_APP_LABEL;
use crate::error::{Error, Result};

/// List the monitor pods in the namespace.
pub(crate) async fn list_mon_pods(pods: &Api<Pod>) -> Result<Vec<Pod>> {
    let listed = pods
        .list(&ListParams::default().labels(MON_APP_LABEL))
        .await?;
    Ok(listed.items)
}

/// The monitor's daemon id (`a`, `b`, ...) from its pod labels.
pub(crate) fn mon_daemon_id(pod: &Pod) -> Result<String> {
    pod.metadata
        .labels
        .as_ref()
        .and_then(|l| l.get("ceph_daemon_id"))
        .cloned()
        .ok_or_else(|| Error::MissingField("ceph_daemon_id label on mon pod".to_string()))
}
