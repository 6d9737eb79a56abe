//! Property-based tests for the connection-score peer-ranking invariant.
//!
//! For every monitor rank in a 5-mon quorum: a blob whose 4 peer blocks
//! carry the peer indices exactly once must validate, and any blob with
//! a dropped block, a duplicated peer, or a shuffled block order must
//! fail.

use std::collections::BTreeMap;

use proptest::prelude::*;

use stretch_verifier::validate_conn_score;

const MON_NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

fn quorum() -> BTreeMap<String, i64> {
    MON_NAMES
        .iter()
        .enumerate()
        .map(|(i, n)| (n.to_string(), i as i64))
        .collect()
}

/// Render a blob for `rank` whose block `j` carries peer index `peers[j]`.
fn blob(rank: i64, peers: &[i64]) -> String {
    let reports: Vec<String> = peers
        .iter()
        .enumerate()
        .map(|(j, p)| format!(r#"{{"rank": {j}, "peers": [{{"peer_rank": {p}}}]}}"#))
        .collect();
    format!(r#"{{"rank": {rank}, "reports": [{}]}}"#, reports.join(", "))
}

fn healthy_scores() -> BTreeMap<String, String> {
    quorum()
        .into_iter()
        .map(|(n, r)| (n, blob(r, &[0, 1, 2, 3])))
        .collect()
}

/// Strategy: a valid monitor rank in a 5-mon quorum.
fn any_rank() -> impl Strategy<Value = i64> {
    0..5i64
}

/// Strategy: a permutation of the 4 peer indices.
fn peer_permutation() -> impl Strategy<Value = Vec<i64>> {
    Just(vec![0i64, 1, 2, 3]).prop_shuffle()
}

proptest! {
    #[test]
    fn healthy_quorum_always_validates(_seed in any::<u8>()) {
        let scores = healthy_scores();
        prop_assert!(validate_conn_score(&scores, &quorum()).is_ok());
    }

    #[test]
    fn any_peer_assignment_covering_all_indices_validates(
        rank in any_rank(),
        peers in peer_permutation(),
    ) {
        let mut scores = healthy_scores();
        let name = MON_NAMES[rank as usize];
        scores.insert(name.to_string(), blob(rank, &peers));
        prop_assert!(validate_conn_score(&scores, &quorum()).is_ok());
    }

    #[test]
    fn duplicated_peer_index_fails(
        rank in any_rank(),
        kept in 0usize..4,
        replaced in 0usize..4,
    ) {
        prop_assume!(kept != replaced);
        let mut peers = vec![0i64, 1, 2, 3];
        peers[replaced] = peers[kept];
        let mut scores = healthy_scores();
        let name = MON_NAMES[rank as usize];
        scores.insert(name.to_string(), blob(rank, &peers));
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        prop_assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn dropped_block_fails(rank in any_rank(), dropped in 0usize..4) {
        let mut peers = vec![0i64, 1, 2, 3];
        peers.remove(dropped);
        let mut scores = healthy_scores();
        let name = MON_NAMES[rank as usize];
        scores.insert(name.to_string(), blob(rank, &peers));
        let err = validate_conn_score(&scores, &quorum()).unwrap_err();
        prop_assert!(err.to_string().contains("Connection score is messed up"));
    }

    #[test]
    fn rank_disagreement_fails(rank in any_rank(), claimed in any_rank()) {
        prop_assume!(rank != claimed);
        let mut scores = healthy_scores();
        let name = MON_NAMES[rank as usize];
        scores.insert(name.to_string(), blob(claimed, &[0, 1, 2, 3]));
        prop_assert!(validate_conn_score(&scores, &quorum()).is_err());
    }
}
