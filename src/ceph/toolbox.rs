//! Ceph tools pod access.
//!
//! The tools pod is a singleton resource that can itself become a
//! casualty of the zone failure under test, so a live reference is
//! re-fetched on every use and never cached. A tools pod stuck outside
//! `Running` is force-deleted and its controller-recreated replacement is
//! awaited before any command runs.

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::api::{DeleteParams, ListParams};
use kube::{Api, Client, ResourceExt};
use tracing::{info, instrument, warn};

use crate::config::TOOLS_APP_LABEL;
use crate::error::{Error, Result};
use crate::exec::{CommandOutput, exec_in_pod, exec_in_pod_with_deadline};

/// How long to wait for a replacement tools pod after a force-delete.
const REPLACEMENT_WAIT: Duration = Duration::from_secs(120);
const REPLACEMENT_POLL: Duration = Duration::from_secs(5);

/// Handle to the Ceph tools pod in a namespace.
#[derive(Clone)]
pub struct Toolbox {
    pods: Api<Pod>,
}

fn is_running(pod: &Pod) -> bool {
    pod.metadata.deletion_timestamp.is_none()
        && pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .is_some_and(|p| p == "Running")
}

impl Toolbox {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
        }
    }

    /// Fetch a live tools pod, recovering one if necessary.
    #[instrument(skip(self))]
    pub async fn ensure_running(&self) -> Result<Pod> {
        let params = ListParams::default().labels(TOOLS_APP_LABEL);
        let listed = self.pods.list(&params).await?;

        if let Some(pod) = listed.items.iter().find(|p| is_running(p)) {
            return Ok(pod.clone());
        }

        // The tools pod went down with the failure; force a fresh one.
        for pod in &listed.items {
            let name = pod.name_any();
            warn!(pod = %name, "Tools pod is not running, force-deleting");
            match self
                .pods
                .delete(&name, &DeleteParams::default().grace_period(0))
                .await
            {
                Ok(_) => {}
                Err(e) if matches!(&e, kube::Error::Api(a) if a.code == 404) => {}
                Err(e) => return Err(e.into()),
            }
        }

        let mut waited = Duration::ZERO;
        while waited < REPLACEMENT_WAIT {
            tokio::time::sleep(REPLACEMENT_POLL).await;
            waited += REPLACEMENT_POLL;
            let listed = self.pods.list(&params).await?;
            if let Some(pod) = listed.items.iter().find(|p| is_running(p)) {
                info!(pod = %pod.name_any(), "Replacement tools pod is running");
                return Ok(pod.clone());
            }
        }

        Err(Error::Timeout {
            what: "replacement tools pod".to_string(),
            after: REPLACEMENT_WAIT,
        })
    }

    /// Run a shell command inside the tools pod.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        let pod = self.ensure_running().await?;
        exec_in_pod(&self.pods, &pod.name_any(), command).await
    }

    /// Run a shell command inside the tools pod with a hard deadline.
    pub async fn exec_with_deadline(
        &self,
        command: &str,
        deadline: Duration,
    ) -> Result<CommandOutput> {
        let pod = self.ensure_running().await?;
        exec_in_pod_with_deadline(&self.pods, &pod.name_any(), command, deadline).await
    }

    /// Run a `ceph` subcommand and return its stdout.
    pub async fn ceph(&self, subcommand: &str) -> Result<String> {
        let command = format!("ceph {subcommand}");
        let output = self.exec(&command).await?;
        output.require_success(&command)
    }
}
