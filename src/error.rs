//! Error types for the verifier.
//!
//! Defines custom error types with classification for retry behavior.
//! Probes that detect conditions the caller is expected to tolerate
//! (accessibility, pause counts) return booleans or reports instead of
//! errors; the variants here cover broken invariants and I/O failures.

use std::time::Duration;

use thiserror::Error;

/// Error type for verifier operations
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// I/O error while streaming exec output
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Missing required field in a cluster object
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Validation error in a caller-supplied value
    #[error("Validation error: {0}")]
    Validation(String),

    /// Workload pod count did not settle at the expected value
    #[error(
        "Unexpected pod count for {label}: expected {expected}, found {actual} \
         (pods seen: {names:?})"
    )]
    UnexpectedPodCount {
        label: String,
        expected: usize,
        actual: usize,
        names: Vec<String>,
    },

    /// Connection-score invariant violation (quorum membership view corrupt)
    #[error("Connection score is messed up: {0}")]
    ConnectionScore(String),

    /// Log-file ledger mismatch against the observed file set
    #[error("Data loss detected for {label}: missing {missing:?}, unexpected {unexpected:?}")]
    DataLoss {
        label: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Data corruption reported by a reader workload
    #[error("Data corruption detected in pod {pod}: {line}")]
    DataCorruption { pod: String, line: String },

    /// A command executed inside a cluster pod failed
    #[error("Command `{command}` failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// A bounded wait expired before the condition was met
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    /// Ceph health did not return to a clean state
    #[error("Ceph health did not recover: {0}")]
    HealthDegraded(String),

    /// Retry loop refused to start: worst-case runtime exceeds the ceiling
    #[error("Retry budget for {op} exceeds ceiling: worst case {worst_case:?} > {ceiling:?}")]
    RetryBudget {
        op: String,
        worst_case: Duration,
        ceiling: Duration,
    },
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Kube(kube::Error::Api(e)) if e.code == 404)
    }

    /// Check if this error should be retried.
    ///
    /// Transient conditions (API throttling, server errors, in-pod command
    /// failures, expired waits) are retryable; structural violations
    /// (pod counts, connection scores, data loss) are not — they are the
    /// defects the checks exist to catch.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube(e) => {
                matches!(
                    e,
                    kube::Error::Api(api_err) if api_err.code >= 500 || api_err.code == 429 || api_err.code == 404
                ) || matches!(e, kube::Error::Service(_))
            }
            Error::Io(_) | Error::CommandFailed { .. } | Error::Timeout { .. } => true,
            Error::UnexpectedPodCount { .. } => true,
            Error::ConnectionScore(_)
            | Error::DataLoss { .. }
            | Error::DataCorruption { .. }
            | Error::HealthDegraded(_)
            | Error::MissingField(_)
            | Error::Validation(_)
            | Error::Serialization(_)
            | Error::RetryBudget { .. } => false,
        }
    }
}

/// Result type alias for verifier operations
pub type Result<T> = std::result::Result<T, Error>;
