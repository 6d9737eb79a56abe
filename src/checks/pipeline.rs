//! Post-failure validation pipeline.
//!
//! After the injected failure window closes, this pipeline composes the
//! pause checkers, the log-file ledger, the corruption scan, and the
//! Ceph health wait into one pass. Pause detection is advisory — counts
//! above tolerance are logged, not asserted, since unaffected zones add
//! noise — but data loss, corruption, and a dirty final health state
//! terminate the run.

use std::time::Duration;

use kube::api::ListParams;
use tracing::{info, instrument, warn};

use crate::ceph::health::wait_for_health_ok;
use crate::ceph::toolbox::Toolbox;
use crate::cluster::StretchCluster;
use crate::cluster::registry::display_status;
use crate::config::Workload;
use crate::error::{Error, Result};
use crate::window::FailureWindow;

/// How long the final health check waits for Ceph to settle.
const HEALTH_RECOVERY_TIMEOUT: Duration = Duration::from_secs(600);

/// How long to wait for logreader jobs to run to completion.
const READ_COMPLETION_TIMEOUT: Duration = Duration::from_secs(900);
const READ_COMPLETION_POLL: Duration = Duration::from_secs(15);

/// Storage types covered by a failure scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    CephFs,
    Rbd,
}

impl StretchCluster {
    /// Wait for every logreader pod to finish its verification pass.
    async fn wait_for_read_completion(&self) -> Result<()> {
        let workload = Workload::CephFsReader;
        let params = ListParams::default().labels(workload.label());
        let mut waited = Duration::ZERO;
        loop {
            let listed = self.pods.list(&params).await?;
            let done = listed
                .items
                .iter()
                .filter(|p| {
                    let status = display_status(p);
                    status == "Completed" || status == "Succeeded"
                })
                .count();
            if !listed.items.is_empty() && done == listed.items.len() {
                info!(count = done, "All reader pods completed");
                return Ok(());
            }
            if waited >= READ_COMPLETION_TIMEOUT {
                return Err(Error::Timeout {
                    what: format!(
                        "logreader completion ({done}/{} done)",
                        listed.items.len()
                    ),
                    after: READ_COMPLETION_TIMEOUT,
                });
            }
            tokio::time::sleep(READ_COMPLETION_POLL).await;
            waited += READ_COMPLETION_POLL;
        }
    }

    async fn cephfs_failure_checks(
        &mut self,
        window: &FailureWindow,
        wait_for_read_completion: bool,
    ) -> Result<()> {
        let read = self
            .check_for_read_pause(Workload::CephFsReader, window)
            .await?;
        if read.paused > self.config.read_pause_tolerance {
            warn!(
                paused = read.paused,
                tolerance = self.config.read_pause_tolerance,
                "Read pause exceeded tolerance during the failure window"
            );
        }

        let write = self
            .check_for_write_pause(Workload::CephFsWriter, window)
            .await?;
        if write.paused > self.config.cephfs_write_pause_tolerance {
            warn!(
                paused = write.paused,
                tolerance = self.config.cephfs_write_pause_tolerance,
                "CephFS write pause exceeded tolerance during the failure window"
            );
        }

        if wait_for_read_completion {
            self.wait_for_read_completion().await?;
        }

        self.assert_no_data_loss(Workload::CephFsWriter).await?;
        self.check_for_data_corruption(Workload::CephFsReader).await
    }

    async fn rbd_failure_checks(&mut self, window: &FailureWindow) -> Result<()> {
        let write = self
            .check_for_write_pause(Workload::RbdWriter, window)
            .await?;
        if write.paused > self.config.rbd_write_pause_tolerance {
            warn!(
                paused = write.paused,
                tolerance = self.config.rbd_write_pause_tolerance,
                "RBD write pause exceeded tolerance during the failure window"
            );
        }
        self.assert_no_data_loss(Workload::RbdWriter).await
    }

    /// Run the full post-failure validation pass.
    ///
    /// Per-type pause detection is observational; data loss, corruption,
    /// and a Ceph health state that never settles clean are hard
    /// failures. A crash-only health warning is archived instead of
    /// failed on.
    #[instrument(skip(self, toolbox, window))]
    pub async fn post_failure_checks(
        &mut self,
        toolbox: &Toolbox,
        window: &FailureWindow,
        types: &[StorageType],
        wait_for_read_completion: bool,
    ) -> Result<()> {
        info!(
            start = %window.start(),
            end = %window.end(),
            ?types,
            "Starting post-failure checks"
        );

        for storage in types {
            match storage {
                StorageType::CephFs => {
                    self.cephfs_failure_checks(window, wait_for_read_completion)
                        .await?;
                }
                StorageType::Rbd => {
                    self.rbd_failure_checks(window).await?;
                }
            }
        }

        wait_for_health_ok(toolbox, HEALTH_RECOVERY_TIMEOUT).await
    }
}
