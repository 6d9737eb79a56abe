//! Recovery procedures for stuck workloads and a wedged Ceph cluster.

pub mod orchestrator;
pub mod signatures;
pub mod stuck;

pub use orchestrator::describe_text;
pub use signatures::{FailureSignature, match_signature};
