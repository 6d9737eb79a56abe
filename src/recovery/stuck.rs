//! Ceph-stuck recovery.
//!
//! When the command path stays unreachable after a partition heals, the
//! monitors can be wedged on stale connection scores. The workaround is
//! to reset every monitor's scores through its admin socket and confirm
//! the command path comes back.

use kube::ResourceExt;
use tracing::{info, instrument, warn};

use crate::ceph::prober::check_ceph_accessibility_default;
use crate::ceph::toolbox::Toolbox;
use crate::ceph::{list_mon_pods, mon_daemon_id};
use crate::cluster::StretchCluster;
use crate::error::{Error, Result};
use crate::exec::exec_in_pod;

/// Probe duration used to confirm the reset took effect.
const POST_RESET_PROBE_SECS: u64 = 60;

impl StretchCluster {
    /// Reset every monitor's connection scores and confirm `ceph -s`
    /// responds again.
    #[instrument(skip(self, toolbox))]
    pub async fn recover_from_ceph_stuck(&self, toolbox: &Toolbox) -> Result<()> {
        for pod in list_mon_pods(&self.pods).await? {
            let mon_id = mon_daemon_id(&pod)?;
            let command = format!("ceph daemon mon.{mon_id} connection scores reset");
            info!(mon = %mon_id, "Resetting monitor connection scores");
            exec_in_pod(&self.pods, &pod.name_any(), &command)
                .await?
                .require_success(&command)?;
        }

        if check_ceph_accessibility_default(toolbox, POST_RESET_PROBE_SECS).await? {
            info!("Ceph command path recovered after connection score reset");
            Ok(())
        } else {
            warn!("Ceph still unreachable after connection score reset");
            Err(Error::HealthDegraded(
                "ceph unreachable after connection score reset".to_string(),
            ))
        }
    }
}
