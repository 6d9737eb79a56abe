//! Ceph health classification and recovery waiting.
//!
//! Health polling is an explicit loop over a typed outcome instead of
//! exception-driven retries: each poll classifies the `ceph health`
//! report and the loop decides whether to finish, keep waiting, or give
//! up. The only tolerated deviation from `HEALTH_OK` is a warning whose
//! sole complaint is recently crashed daemons; those crash reports are
//! archived rather than failed on.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};

use super::toolbox::Toolbox;

const HEALTH_POLL: Duration = Duration::from_secs(10);

/// Detail string Ceph emits for archivable daemon crashes.
pub const RECENT_CRASH_DETAIL: &str = "daemons have recently crashed";

/// Classified `ceph health` report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CephHealth {
    /// `HEALTH_OK`.
    Ok,
    /// `HEALTH_WARN` whose only detail is recently crashed daemons.
    RecentCrashOnly,
    /// Any other health state, with the raw report.
    Degraded(String),
}

/// Result of one health poll in a recovery wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Recovering,
    Failed,
}

/// Classify a `ceph health` report string.
pub fn classify_health(report: &str) -> CephHealth {
    let report = report.trim();
    if report.starts_with("HEALTH_OK") {
        return CephHealth::Ok;
    }
    if let Some(detail) = report.strip_prefix("HEALTH_WARN") {
        let only_crashes = detail
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .all(|s| s.contains(RECENT_CRASH_DETAIL));
        if only_crashes && detail.contains(RECENT_CRASH_DETAIL) {
            return CephHealth::RecentCrashOnly;
        }
    }
    CephHealth::Degraded(report.to_string())
}

impl CephHealth {
    pub fn outcome(&self) -> ProbeOutcome {
        match self {
            CephHealth::Ok => ProbeOutcome::Healthy,
            CephHealth::RecentCrashOnly | CephHealth::Degraded(_) => ProbeOutcome::Recovering,
        }
    }
}

/// Whether a failed health poll should be absorbed into the wait.
///
/// Even reaching the tools pod can transiently fail while the cluster
/// is still settling; only non-retryable errors cut the wait short.
fn tolerate_poll_failure(e: &Error) -> bool {
    e.is_retryable()
}

/// Poll `ceph health` until it reaches `HEALTH_OK` or `timeout` elapses.
///
/// A crash-only warning triggers `ceph crash archive-all` and another
/// poll; a transient exec failure counts as still recovering; any other
/// deviation keeps waiting until the deadline, then surfaces as
/// [`Error::HealthDegraded`] with the last report.
pub async fn wait_for_health_ok(toolbox: &Toolbox, timeout: Duration) -> Result<()> {
    let mut waited = Duration::ZERO;

    loop {
        let report = match toolbox.ceph("health").await {
            Ok(report) => report,
            Err(e) if tolerate_poll_failure(&e) && waited < timeout => {
                warn!(error = %e, "Health poll failed, will poll again");
                tokio::time::sleep(HEALTH_POLL).await;
                waited += HEALTH_POLL;
                continue;
            }
            Err(e) => return Err(e),
        };
        let health = classify_health(&report);

        if health == CephHealth::RecentCrashOnly {
            warn!(report = %report.trim(), "Only crash warnings remain, archiving crash reports");
            toolbox.ceph("crash archive-all").await?;
        }

        let outcome = if waited >= timeout && health.outcome() != ProbeOutcome::Healthy {
            ProbeOutcome::Failed
        } else {
            health.outcome()
        };

        match outcome {
            ProbeOutcome::Healthy => {
                info!("Ceph health is clean");
                return Ok(());
            }
            ProbeOutcome::Failed => {
                return Err(Error::HealthDegraded(report.trim().to_string()));
            }
            ProbeOutcome::Recovering => {
                tokio::time::sleep(HEALTH_POLL).await;
                waited += HEALTH_POLL;
            }
        }
    }
}
