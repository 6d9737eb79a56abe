//! Zone-aware node operations.
//!
//! Stretched deployments label nodes with their failure-domain zone
//! (`data-1`, `data-2`, `arbiter`). Scenario code crashes or reboots all
//! of a zone's nodes at once; the parallelism here is a plain join over
//! independent futures with no shared mutable state — all operations are
//! issued before the post-condition checks begin, with no ordering
//! guaranteed among them.

use futures::future::join_all;
use k8s_openapi::api::core::v1::Node;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::info;

use crate::config::ZONE_LABEL;
use crate::error::Result;

/// Zone label value for the arbiter (tie-breaking monitor only).
pub const ARBITER_ZONE: &str = "arbiter";

/// Zone label values for the two data zones.
pub const DATA_ZONES: [&str; 2] = ["data-1", "data-2"];

/// List the nodes labeled with `zone`.
pub async fn nodes_in_zone(client: Client, zone: &str) -> Result<Vec<Node>> {
    let nodes: Api<Node> = Api::all(client);
    let params = ListParams::default().labels(&format!("{ZONE_LABEL}={zone}"));
    let listed = nodes.list(&params).await?;
    info!(zone, count = listed.items.len(), "Enumerated zone nodes");
    Ok(listed.items)
}

/// Issue `op` against every item in parallel and join all results.
///
/// This is a join, not an ordering barrier: every operation has been
/// issued once this returns, nothing more.
pub async fn join_node_ops<I, T, F, Fut>(items: Vec<I>, op: F) -> Vec<Result<T>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    join_all(items.into_iter().map(op)).await
}
