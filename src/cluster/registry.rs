//! Workload pod registry.
//!
//! The single source of truth for "which pods currently represent this
//! workload". No other component enumerates workload pods directly;
//! everything goes through [`StretchCluster::get_logwriter_reader_pods`],
//! which filters by acceptable status, enforces the expected replica
//! count, and updates the in-memory snapshot. Pod status transitions are
//! eventually consistent after a disruption, so the count check retries
//! before it is allowed to fail.

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use kube::api::ListParams;
use tracing::{debug, info, instrument};

use crate::config::Workload;
use crate::error::{Error, Result};
use crate::retry::{self, retry};

use super::{StretchCluster, WorkloadPods};

const LABEL_COUNT_POLL: Duration = Duration::from_secs(10);

/// A referenced (not owned) workload pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodRef {
    pub name: String,
    pub status: String,
}

/// Render the status a `kubectl get pods` column would show.
///
/// Terminated and waiting container reasons (`Error`, `Completed`,
/// `ContainerStatusUnknown`, `CrashLoopBackOff`, ...) are more specific
/// than the pod phase and take precedence over it.
pub fn display_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }
    if let Some(statuses) = pod.status.as_ref().and_then(|s| s.container_statuses.as_ref()) {
        for container in statuses {
            if let Some(state) = &container.state {
                if let Some(terminated) = &state.terminated
                    && let Some(reason) = &terminated.reason
                {
                    return reason.clone();
                }
                if let Some(waiting) = &state.waiting
                    && let Some(reason) = &waiting.reason
                {
                    return reason.clone();
                }
            }
        }
    }
    pod.status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

impl StretchCluster {
    /// One enumeration pass: list, filter by status, enforce the count.
    async fn enumerate_workload(
        &self,
        workload: Workload,
        expected: usize,
        statuses: &[&str],
    ) -> Result<Vec<PodRef>> {
        let params = ListParams::default().labels(workload.label());
        let listed = self.pods.list(&params).await?;

        let all: Vec<PodRef> = listed
            .items
            .iter()
            .map(|p| PodRef {
                name: p.name_any(),
                status: display_status(p),
            })
            .collect();
        let matching: Vec<PodRef> = all
            .iter()
            .filter(|p| statuses.contains(&p.status.as_str()))
            .cloned()
            .collect();

        if matching.len() != expected {
            return Err(Error::UnexpectedPodCount {
                label: workload.label().to_string(),
                expected,
                actual: matching.len(),
                names: all
                    .iter()
                    .map(|p| format!("{} ({})", p.name, p.status))
                    .collect(),
            });
        }
        debug!(label = workload.label(), count = matching.len(), "Workload pods enumerated");
        Ok(matching)
    }

    /// Enumerate the pods representing `workload` and update the registry.
    ///
    /// `expected` and `statuses` default to the workload's canonical
    /// values. Retries for up to 20×10s before surfacing the count
    /// mismatch, since controllers need time to converge after a
    /// disruption.
    #[instrument(skip(self, statuses))]
    pub async fn get_logwriter_reader_pods(
        &mut self,
        workload: Workload,
        expected: Option<usize>,
        statuses: Option<&[&str]>,
    ) -> Result<Vec<PodRef>> {
        let expected = expected.unwrap_or_else(|| workload.nominal_replicas());
        let statuses = statuses.unwrap_or_else(|| workload.acceptable_statuses());

        let pods = retry(&retry::POD_ENUMERATION, workload.label(), || {
            self.enumerate_workload(workload, expected, statuses)
        })
        .await?;

        info!(label = workload.label(), count = pods.len(), "Workload registry updated");
        self.workload_map
            .insert(workload, WorkloadPods { pods: pods.clone() });
        Ok(pods)
    }

    /// Wait until exactly `expected_count` pods matching `label` are
    /// running, polling every 10s up to `timeout`.
    pub async fn wait_for_pods_by_label_count(
        &self,
        label: &str,
        expected_count: usize,
        timeout: Duration,
    ) -> Result<()> {
        let params = ListParams::default().labels(label);
        let mut waited = Duration::ZERO;
        loop {
            let listed = self.pods.list(&params).await?;
            let running = listed
                .items
                .iter()
                .filter(|p| display_status(p) == "Running")
                .count();
            if running == expected_count {
                info!(label, count = running, "Expected pod count reached");
                return Ok(());
            }
            if waited >= timeout {
                return Err(Error::Timeout {
                    what: format!("{expected_count} running pods with label {label} (saw {running})"),
                    after: timeout,
                });
            }
            debug!(label, running, expected_count, "Waiting for pod count");
            tokio::time::sleep(LABEL_COUNT_POLL).await;
            waited += LABEL_COUNT_POLL;
        }
    }
}
