//! Stuck-workload recovery via controller scale-cycles.
//!
//! For each workload pod that failed to come back after a disruption:
//! pods in a terminal broken state (`Error`, `ContainerStatusUnknown`)
//! are deleted outright and left to their controller to recreate; pods
//! stuck with a known CSI mount-race signature trigger a scale-cycle of
//! the owning controller (to zero, wait out termination, back to
//! nominal). One scale-cycle per pass — the caller re-enters with a
//! fresh snapshot if the registry still cannot enumerate cleanly.

use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{DeleteParams, ListParams, Patch, PatchParams};
use kube::{Api, ResourceExt};
use tracing::{info, instrument, warn};

use crate::cluster::StretchCluster;
use crate::cluster::registry::display_status;
use crate::config::{ControllerKind, Workload};
use crate::error::{Error, Result};
use crate::retry;

use super::signatures::match_signature;

/// Pod statuses handled by immediate deletion rather than diagnosis.
const DELETE_ON_SIGHT: [&str; 2] = ["Error", "ContainerStatusUnknown"];

const SCALE_POLL: std::time::Duration = std::time::Duration::from_secs(10);

/// Whether a pod still counts against a scale-down wait.
///
/// Scaling a Job to `parallelism: 0` terminates its running pods but
/// never removes already-completed ones, so terminal successes must not
/// hold the wait open.
fn blocks_scale_down(status: &str) -> bool {
    status != "Completed" && status != "Succeeded"
}

/// Flatten a pod's status and events into one searchable text, the way
/// `describe pod` would present them.
pub fn describe_text(pod: &Pod, events: &[Event]) -> String {
    let mut text = String::new();
    if let Some(status) = &pod.status {
        if let Some(reason) = &status.reason {
            text.push_str(reason);
            text.push('\n');
        }
        if let Some(message) = &status.message {
            text.push_str(message);
            text.push('\n');
        }
        for container in status.container_statuses.as_deref().unwrap_or_default() {
            if let Some(state) = &container.state {
                if let Some(waiting) = &state.waiting {
                    if let Some(reason) = &waiting.reason {
                        text.push_str(reason);
                        text.push('\n');
                    }
                    if let Some(message) = &waiting.message {
                        text.push_str(message);
                        text.push('\n');
                    }
                }
                if let Some(terminated) = &state.terminated {
                    if let Some(message) = &terminated.message {
                        text.push_str(message);
                        text.push('\n');
                    }
                }
            }
        }
    }
    for event in events {
        if let Some(reason) = &event.reason {
            text.push_str(reason);
            text.push_str(": ");
        }
        if let Some(message) = &event.message {
            text.push_str(message);
        }
        text.push('\n');
    }
    text
}

impl StretchCluster {
    async fn pod_events(&self, pod_name: &str) -> Result<Vec<Event>> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), &self.config.namespace);
        let params = ListParams::default()
            .fields(&format!("involvedObject.name={pod_name},involvedObject.kind=Pod"));
        Ok(events.list(&params).await?.items)
    }

    async fn scale_controller(&self, workload: Workload, replicas: usize) -> Result<()> {
        let name = workload.controller_name();
        let params = PatchParams::default();
        info!(controller = name, replicas, "Scaling workload controller");
        match workload.controller_kind() {
            ControllerKind::Deployment => {
                let api: Api<Deployment> =
                    Api::namespaced(self.client.clone(), &self.config.namespace);
                let patch = serde_json::json!({"spec": {"replicas": replicas}});
                api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            ControllerKind::StatefulSet => {
                let api: Api<StatefulSet> =
                    Api::namespaced(self.client.clone(), &self.config.namespace);
                let patch = serde_json::json!({"spec": {"replicas": replicas}});
                api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
            ControllerKind::Job => {
                // Jobs have no replica field; parallelism drives pod count.
                let api: Api<Job> = Api::namespaced(self.client.clone(), &self.config.namespace);
                let patch = serde_json::json!({"spec": {"parallelism": replicas}});
                api.patch(name, &params, &Patch::Merge(&patch)).await?;
            }
        }
        Ok(())
    }

    /// Wait until no terminating-eligible pods remain under the
    /// workload's label. Completed pods are left alone.
    async fn wait_for_scale_down(&self, workload: Workload) -> Result<()> {
        let params = ListParams::default().labels(workload.label());
        let bound = self.config.scale_down_wait;
        let mut waited = std::time::Duration::ZERO;
        loop {
            let remaining = self
                .pods
                .list(&params)
                .await?
                .items
                .iter()
                .filter(|p| blocks_scale_down(&display_status(p)))
                .count();
            if remaining == 0 {
                return Ok(());
            }
            if waited >= bound {
                return Err(Error::Timeout {
                    what: format!("{} pods to terminate ({remaining} left)", workload.label()),
                    after: bound,
                });
            }
            tokio::time::sleep(SCALE_POLL).await;
            waited += SCALE_POLL;
        }
    }

    async fn scale_cycle(&self, workload: Workload) -> Result<()> {
        self.scale_controller(workload, 0).await?;
        let waited = self.wait_for_scale_down(workload).await;
        // Restore nominal replicas even when the wait timed out; a
        // controller left at zero can never enumerate cleanly again.
        let restored = self
            .scale_controller(workload, workload.nominal_replicas())
            .await;
        waited.and(restored)
    }

    /// One recovery pass over all workload pods.
    ///
    /// Terminal success requires the registry to enumerate all three
    /// workloads cleanly afterwards; a failure there surfaces retryable
    /// so [`recover_workload_pods_with_retry`] re-enters with a fresh
    /// snapshot.
    ///
    /// [`recover_workload_pods_with_retry`]: StretchCluster::recover_workload_pods_with_retry
    #[instrument(skip(self))]
    pub async fn recover_workload_pods(&mut self) -> Result<()> {
        let mut cycled = false;

        'workloads: for workload in Workload::ALL {
            let params = ListParams::default().labels(workload.label());
            let listed = self.pods.list(&params).await?;

            for pod in &listed.items {
                let status = display_status(pod);
                if workload.acceptable_statuses().contains(&status.as_str())
                    || status == "Terminating"
                {
                    continue;
                }
                let name = pod.name_any();

                if DELETE_ON_SIGHT.contains(&status.as_str()) {
                    // No diagnosis needed; the controller recreates it.
                    warn!(pod = %name, status = %status, "Deleting broken pod");
                    match self.pods.delete(&name, &DeleteParams::default()).await {
                        Ok(_) => {}
                        Err(kube::Error::Api(e)) if e.code == 404 => {}
                        Err(e) => return Err(e.into()),
                    }
                    continue;
                }

                if cycled {
                    continue;
                }
                let events = self.pod_events(&name).await?;
                let describe = describe_text(pod, &events);
                if let Some(signature) = match_signature(&describe) {
                    warn!(
                        pod = %name,
                        ?signature,
                        label = workload.label(),
                        "Known mount-race signature, scale-cycling the controller"
                    );
                    self.scale_cycle(workload).await?;
                    cycled = true;
                    // First match wins for this pass; further labels get a
                    // fresh look on the next retry if still broken.
                    continue 'workloads;
                }
            }
        }

        for workload in Workload::ALL {
            self.get_logwriter_reader_pods(workload, None, None).await?;
        }
        Ok(())
    }

    /// [`recover_workload_pods`] under the recovery retry policy
    /// (5×10s) — one scale-cycle may not be enough while the underlying
    /// CSI race is still clearing.
    ///
    /// [`recover_workload_pods`]: StretchCluster::recover_workload_pods
    pub async fn recover_workload_pods_with_retry(&mut self) -> Result<()> {
        let policy = retry::RECOVERY;
        let mut attempt = 1;
        loop {
            match self.recover_workload_pods().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < policy.attempts && e.is_retryable() => {
                    warn!(attempt, error = %e, "Recovery pass failed, retrying");
                    tokio::time::sleep(policy.delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
