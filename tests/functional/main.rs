// Test code is allowed to panic on failure
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Functional tests for stretch-verifier.
//!
//! These run without a Kubernetes cluster: they exercise the pure cores
//! the cluster-facing wrappers are built on — the log-file ledger, the
//! minute-scan pause detection, and the connection-score validator.

mod conn_score_props;
mod ledger_scenarios;
mod pause_scenarios;
