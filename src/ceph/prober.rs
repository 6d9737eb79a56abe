//! Ceph accessibility probing.
//!
//! During a zone outage the `ceph` command path can degrade in two
//! tolerable ways: the client hunts for a reachable monitor until its
//! authentication times out, or the command hangs past its deadline.
//! Both are reported as `false` rather than raised, since a transient
//! mon-hunting state during an outage is expected and recoverable.
//! Anything else propagates.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::retry::{self, retry};

use super::toolbox::Toolbox;

/// Output signature of a client that never reached the monitor quorum.
pub const MON_HUNTING_SIGNATURE: &str = "monclient(hunting): authenticate timed out";

/// Seconds between `ceph -s` invocations inside the probe loop.
pub const DEFAULT_DELAY_SECS: u64 = 5;

/// Slack added on top of the probe duration before the command is
/// declared hung.
pub const DEFAULT_GRACE_SECS: u64 = 15;

/// Classify probe output: `false` if the mon-hunting signature appears.
pub fn output_indicates_accessible(stdout: &str, stderr: &str) -> bool {
    !stdout.contains(MON_HUNTING_SIGNATURE) && !stderr.contains(MON_HUNTING_SIGNATURE)
}

/// Poll `ceph -s` inside the tools pod every `delay_secs` for
/// `timeout_secs`, with an overall deadline of `timeout_secs + grace_secs`.
///
/// Returns `Ok(false)` when the cluster command path was unreachable for
/// the duration (mon hunting or a hung command); `Ok(true)` when every
/// invocation came back. The tools pod is verified live first — it can be
/// a casualty of the same zone failure.
///
/// Callers wrap this in [`crate::retry::ACCESSIBILITY`], since even
/// reaching the tools pod can transiently fail mid-partition.
pub async fn check_ceph_accessibility(
    toolbox: &Toolbox,
    timeout_secs: u64,
    delay_secs: u64,
    grace_secs: u64,
) -> Result<bool> {
    let command = format!(
        "deadline=$(($(date +%s) + {timeout_secs})); \
         while [ $(date +%s) -lt $deadline ]; do ceph -s; sleep {delay_secs}; done"
    );
    let deadline = Duration::from_secs(timeout_secs + grace_secs);

    match toolbox.exec_with_deadline(&command, deadline).await {
        Ok(output) => {
            if output_indicates_accessible(&output.stdout, &output.stderr) {
                info!(timeout_secs, "Ceph stayed accessible for the probe window");
                Ok(true)
            } else {
                warn!("Ceph probe hit monitor authentication timeout, cluster may be unreachable");
                Ok(false)
            }
        }
        Err(Error::Timeout { after, .. }) => {
            warn!(?after, "Ceph probe command timed out, ceph may be hung");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// [`check_ceph_accessibility`] with the default probe cadence.
pub async fn check_ceph_accessibility_default(
    toolbox: &Toolbox,
    timeout_secs: u64,
) -> Result<bool> {
    check_ceph_accessibility(toolbox, timeout_secs, DEFAULT_DELAY_SECS, DEFAULT_GRACE_SECS).await
}

/// Probe accessibility under the 15×5s retry policy.
///
/// Mid-partition, even reaching the tools pod can fail transiently;
/// those failures are retried here rather than surfaced.
pub async fn check_ceph_accessibility_with_retry(
    toolbox: &Toolbox,
    timeout_secs: u64,
) -> Result<bool> {
    retry(&retry::ACCESSIBILITY, "ceph accessibility probe", || {
        check_ceph_accessibility_default(toolbox, timeout_secs)
    })
    .await
}
