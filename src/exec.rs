//! In-pod command execution over the Kubernetes exec subresource.
//!
//! All Ceph control-plane access and in-pod file inspection goes through
//! `sh -c` invocations against a pod's exec endpoint, with stdout and
//! stderr captured in full. Commands carrying a deadline are cut off with
//! a [`Error::Timeout`] rather than left to hang.

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use kube::Api;
use kube::api::AttachParams;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{Error, Result};

/// Captured output of an in-pod command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Whether the exec subresource reported success.
    pub success: bool,
}

impl CommandOutput {
    /// Return stdout, or a [`Error::CommandFailed`] carrying stderr.
    pub fn require_success(self, command: &str) -> Result<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                stderr: if self.stderr.is_empty() {
                    self.stdout
                } else {
                    self.stderr
                },
            })
        }
    }
}

/// Run `sh -c <command>` inside `pod_name` and capture its output.
pub async fn exec_in_pod(pods: &Api<Pod>, pod_name: &str, command: &str) -> Result<CommandOutput> {
    debug!(pod = pod_name, command, "Executing in pod");

    let params = AttachParams::default().stdout(true).stderr(true);
    let mut attached = pods
        .exec(pod_name, vec!["sh", "-c", command], &params)
        .await?;

    let mut stdout_reader = attached
        .stdout()
        .ok_or_else(|| Error::MissingField("exec stdout stream".to_string()))?;
    let mut stderr_reader = attached
        .stderr()
        .ok_or_else(|| Error::MissingField("exec stderr stream".to_string()))?;
    let status = attached.take_status();

    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();
    let (out, err) = tokio::join!(
        stdout_reader.read_to_end(&mut stdout_buf),
        stderr_reader.read_to_end(&mut stderr_buf),
    );
    out?;
    err?;

    // No status frame means the stream closed without a verdict; score
    // it as failure so truncated output is never mistaken for a clean
    // run.
    let success = match status {
        Some(fut) => fut
            .await
            .map(|s| s.status.as_deref() == Some("Success"))
            .unwrap_or(false),
        None => false,
    };
    let _ = attached.join().await;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
        stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
        success,
    })
}

/// Like [`exec_in_pod`], but abandoned with [`Error::Timeout`] once
/// `deadline` elapses.
pub async fn exec_in_pod_with_deadline(
    pods: &Api<Pod>,
    pod_name: &str,
    command: &str,
    deadline: Duration,
) -> Result<CommandOutput> {
    match tokio::time::timeout(deadline, exec_in_pod(pods, pod_name, command)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            what: format!("command `{command}` in pod {pod_name}"),
            after: deadline,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_require_success_returns_stdout() {
        let output = CommandOutput {
            stdout: "HEALTH_OK\n".to_string(),
            stderr: String::new(),
            success: true,
        };
        assert_eq!(output.require_success("ceph health").unwrap(), "HEALTH_OK\n");
    }

    #[test]
    fn test_missing_verdict_is_a_command_failure() {
        // A stream that closed without a status frame builds with
        // success = false; partial output must surface in the error, not
        // be handed to the caller as a clean result.
        let output = CommandOutput {
            stdout: "partial line".to_string(),
            stderr: String::new(),
            success: false,
        };
        let err = output.require_success("cat /mnt/log/a.log").unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
        assert!(err.to_string().contains("partial line"));
    }

    #[test]
    fn test_failure_prefers_stderr() {
        let output = CommandOutput {
            stdout: "noise".to_string(),
            stderr: "cat: /mnt/log/a.log: No such file or directory".to_string(),
            success: false,
        };
        let err = output.require_success("cat /mnt/log/a.log").unwrap_err();
        assert!(err.to_string().contains("No such file or directory"));
    }
}
