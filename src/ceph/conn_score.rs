//! Monitor connection-score validation.
//!
//! Each monitor in a healthy 5-mon stretched quorum publishes a
//! connection-score blob describing how it ranks its peers. This module
//! decodes that blob into a typed structure and audits the peer-ranking
//! invariant externally: every monitor sees every other monitor exactly
//! once, never itself, and the blocks arrive in ranked order. Exactly 5
//! validated blocks (the self-report plus 4 peer corroborations) are
//! required per monitor; anything less is treated as a corrupted view of
//! quorum membership.
//!
//! Peer entries carry indices into the monitor's peer list, which skips
//! the monitor itself; indices at or above the monitor's own rank shift
//! up by one to recover absolute ranks.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Pod;
use kube::{Api, ResourceExt};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::STRETCH_MON_COUNT;
use crate::error::{Error, Result};
use crate::exec::exec_in_pod;

use super::toolbox::Toolbox;
use super::{list_mon_pods, mon_daemon_id};

/// A monitor's connection-score blob.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionScore {
    /// This monitor's own quorum rank.
    pub rank: i64,
    /// Peer report blocks, expected in ranked order.
    #[serde(default)]
    pub reports: Vec<PeerReport>,
}

/// One peer's corroboration block inside a connection score.
#[derive(Debug, Clone, Deserialize)]
pub struct PeerReport {
    /// The block's position in the peer list (0..=3).
    pub rank: i64,
    /// Peer entries inside the block.
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeerEntry {
    pub peer_rank: i64,
}

#[derive(Debug, Deserialize)]
struct QuorumStatus {
    quorum: Vec<i64>,
    monmap: MonMap,
}

#[derive(Debug, Deserialize)]
struct MonMap {
    mons: Vec<MonInfo>,
}

#[derive(Debug, Deserialize)]
struct MonInfo {
    name: String,
    rank: i64,
}

/// Parse `ceph quorum_status --format json` into mon-id → rank for the
/// monitors currently in quorum.
pub fn parse_quorum_ranks(json: &str) -> Result<BTreeMap<String, i64>> {
    let status: QuorumStatus = serde_json::from_str(json)?;
    Ok(status
        .monmap
        .mons
        .into_iter()
        .filter(|m| status.quorum.contains(&m.rank))
        .map(|m| (m.name, m.rank))
        .collect())
}

/// Fetch the current quorum ranks through the tools pod.
pub async fn mon_quorum_ranks(toolbox: &Toolbox) -> Result<BTreeMap<String, i64>> {
    let json = toolbox.ceph("quorum_status --format json").await?;
    parse_quorum_ranks(&json)
}

/// Collect each monitor's connection-score blob via its admin socket.
///
/// The admin socket lives inside the mon pod, so the dump runs there
/// rather than in the tools pod.
pub async fn collect_conn_scores(pods: &Api<Pod>) -> Result<BTreeMap<String, String>> {
    let mut scores = BTreeMap::new();
    for pod in list_mon_pods(pods).await? {
        let mon_id = mon_daemon_id(&pod)?;
        let command = format!("ceph daemon mon.{mon_id} connection scores dump");
        let output = exec_in_pod(pods, &pod.name_any(), &command)
            .await?
            .require_success(&command)?;
        debug!(mon = %mon_id, "Collected connection scores");
        scores.insert(mon_id, output);
    }
    Ok(scores)
}

fn messed_up(mon_id: &str, detail: String) -> Error {
    Error::ConnectionScore(format!("mon.{mon_id}: {detail}"))
}

/// Recover a peer entry's absolute quorum rank.
///
/// Peer indices skip the reporting monitor, so indices at or above its
/// own rank shift up by one. The encoding cannot express the monitor
/// itself; a duplicated or missing peer surfaces in the bijection check.
fn absolute_peer_rank(own: i64, peer_rank: i64) -> i64 {
    if peer_rank >= own { peer_rank + 1 } else { peer_rank }
}

/// Validate one monitor's decoded connection score.
fn validate_one(mon_id: &str, score: &ConnectionScore, expected_rank: i64) -> Result<()> {
    let own = score.rank;
    if own != expected_rank {
        return Err(messed_up(
            mon_id,
            format!("reports rank {own} but quorum expects rank {expected_rank}"),
        ));
    }

    // The self-report counts as the first validated block.
    let mut validated = 1usize;
    let mut peer_ranks = Vec::new();

    for (idx, block) in score.reports.iter().enumerate() {
        if block.rank != idx as i64 || block.rank > 4 {
            return Err(messed_up(
                mon_id,
                format!("report block {idx} carries rank {}", block.rank),
            ));
        }
        for peer in &block.peers {
            peer_ranks.push(absolute_peer_rank(own, peer.peer_rank));
        }
        validated += 1;
    }

    let expected: Vec<i64> = (0..STRETCH_MON_COUNT as i64).filter(|r| *r != own).collect();
    peer_ranks.sort_unstable();
    if peer_ranks != expected {
        return Err(messed_up(
            mon_id,
            format!("peer ranks {peer_ranks:?} do not form the expected set {expected:?}"),
        ));
    }

    if validated != STRETCH_MON_COUNT {
        return Err(messed_up(
            mon_id,
            format!("found {validated} validated report blocks, expected {STRETCH_MON_COUNT}"),
        ));
    }

    Ok(())
}

/// Validate every quorum monitor's connection-score blob.
///
/// `scores` maps mon id → raw JSON blob; `quorum_ranks` maps mon id → the
/// rank the test expects it to hold. A malformed blob is a fatal decode
/// error; a structurally wrong one fails with a "Connection score is
/// messed up" message carrying the offending detail.
pub fn validate_conn_score(
    scores: &BTreeMap<String, String>,
    quorum_ranks: &BTreeMap<String, i64>,
) -> Result<()> {
    for (mon_id, expected_rank) in quorum_ranks {
        let blob = scores
            .get(mon_id)
            .ok_or_else(|| messed_up(mon_id, "no connection score collected".to_string()))?;
        let score: ConnectionScore = serde_json::from_str(blob)?;
        validate_one(mon_id, &score, *expected_rank)?;
        info!(mon = %mon_id, rank = expected_rank, "Connection score validated");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    /// Build a well-formed blob for a monitor at `rank` in a 5-mon quorum.
    fn healthy_blob(rank: i64) -> String {
        let reports: Vec<String> = (0..4)
            .map(|j| format!(r#"{{"rank": {j}, "peers": [{{"peer_rank": {j}}}]}}"#))
            .collect();
        format!(
            r#"{{"rank": {rank}, "reports": [{}]}}"#,
            reports.join(", ")
        )
    }

    fn quorum() -> BTreeMap<String, i64> {
        ["a", "b", "c", "d", "e"]
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as i64))
            .collect()
    }

    fn scores_from<F: Fn(i64) -> String>(f: F) -> BTreeMap<String, String> {
        quorum().into_iter().map(|(n, r)| (n, f(r))).collect()
    }

    #[test]
    fn test_healthy_quorum_validates() {
        let scores = scores_from(healthy_blob);
        assert!(validate_conn_score(&scores, &quorum()).is_ok());
    }

    #[test]
    fn test_rank_disagreement_fails() {
        let mut scores = scores_from(healthy_blob);
        scores.insert("c".to_string(), healthy_blob(4));
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn test_missing_peer_block_fails() {
        // Drop one of the 4 peer blocks: only 4 validated blocks remain.
        let mut scores = scores_from(healthy_blob);
        let truncated = r#"{"rank": 0, "reports": [
            {"rank": 0, "peers": [{"peer_rank": 0}]},
            {"rank": 1, "peers": [{"peer_rank": 1}]},
            {"rank": 2, "peers": [{"peer_rank": 2}]}
        ]}"#;
        scores.insert("a".to_string(), truncated.to_string());
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn test_duplicate_peer_rank_fails() {
        let mut scores = scores_from(healthy_blob);
        let duplicated = r#"{"rank": 2, "reports": [
            {"rank": 0, "peers": [{"peer_rank": 0}]},
            {"rank": 1, "peers": [{"peer_rank": 0}]},
            {"rank": 2, "peers": [{"peer_rank": 2}]},
            {"rank": 3, "peers": [{"peer_rank": 3}]}
        ]}"#;
        scores.insert("c".to_string(), duplicated.to_string());
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn test_peer_index_shift_never_yields_own_rank() {
        // The shifted indices of a full peer list recover exactly the
        // other four ranks, for every possible reporting monitor.
        for own in 0..5i64 {
            let mut absolute: Vec<i64> = (0..4).map(|p| absolute_peer_rank(own, p)).collect();
            assert!(!absolute.contains(&own));
            absolute.sort_unstable();
            let expected: Vec<i64> = (0..5).filter(|r| *r != own).collect();
            assert_eq!(absolute, expected);
        }
    }

    #[test]
    fn test_out_of_order_blocks_fail() {
        let mut scores = scores_from(healthy_blob);
        let reordered = r#"{"rank": 1, "reports": [
            {"rank": 1, "peers": [{"peer_rank": 1}]},
            {"rank": 0, "peers": [{"peer_rank": 0}]},
            {"rank": 2, "peers": [{"peer_rank": 2}]},
            {"rank": 3, "peers": [{"peer_rank": 3}]}
        ]}"#;
        scores.insert("b".to_string(), reordered.to_string());
        assert!(validate_conn_score(&scores, &quorum()).is_err());
    }

    #[test]
    fn test_malformed_blob_is_fatal_decode_error() {
        let mut scores = scores_from(healthy_blob);
        scores.insert("a".to_string(), "{not json".to_string());
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_missing_mon_blob_fails() {
        let mut scores = scores_from(healthy_blob);
        scores.remove("e");
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn test_parse_quorum_ranks() {
        let json = r#"{
            "quorum": [0, 1, 2, 3, 4],
            "quorum_names": ["a", "b", "c", "d", "e"],
            "monmap": {"mons": [
                {"name": "a", "rank": 0},
                {"name": "b", "rank": 1},
                {"name": "c", "rank": 2},
                {"name": "d", "rank": 3},
                {"name": "e", "rank": 4}
            ]}
        }"#;
        let ranks = parse_quorum_ranks(json).unwrap();
        assert_eq!(ranks.len(), 5);
        assert_eq!(ranks.get("c"), Some(&2));
    }

    #[test]
    fn test_parse_quorum_ranks_excludes_out_of_quorum_mon() {
        let json = r#"{
            "quorum": [0, 1, 3, 4],
            "monmap": {"mons": [
                {"name": "a", "rank": 0},
                {"name": "b", "rank": 1},
                {"name": "c", "rank": 2},
                {"name": "d", "rank": 3},
                {"name": "e", "rank": 4}
            ]}
        }"#;
        let ranks = parse_quorum_ranks(json).unwrap();
        assert_eq!(ranks.len(), 4);
        assert!(!ranks.contains_key("c"));
    }
}
