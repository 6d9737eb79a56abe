//! Log-file ledger scenarios: rotation sequences interleaved with scans.
//!
//! The invariant under test: after any sequence of scans interleaved
//! with rotation, everything the ledger has ever observed must still be
//! found on disk — a vanished file is data loss, regardless of where in
//! the rotation it sat.

use std::collections::BTreeSet;

use stretch_verifier::cluster::LogLedger;

fn listing(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn disk(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// A CephFS writer rotates through many files with retention 4.
#[test]
fn cephfs_rotation_sequence_stays_clean() {
    let mut ledger = LogLedger::new(4);

    // Files appear newest-first; the writer adds one per scan.
    let history = [
        vec!["a.log"],
        vec!["b.log", "a.log"],
        vec!["c.log", "b.log", "a.log"],
        vec!["d.log", "c.log", "b.log", "a.log"],
        vec!["e.log", "d.log", "c.log", "b.log", "a.log"],
        vec!["f.log", "e.log", "d.log", "c.log", "b.log", "a.log"],
    ];
    for scan in &history {
        ledger.observe(&listing(scan));
    }

    // Everything ever seen is still on disk.
    let present = disk(&["a.log", "b.log", "c.log", "d.log", "e.log", "f.log"]);
    assert!(ledger.diff(&present).is_clean());

    // a.log and b.log fell past retention and are tracked as rotated.
    assert!(ledger.rotated().contains("a.log"));
    assert!(ledger.rotated().contains("b.log"));
    assert_eq!(ledger.known().len(), 4);
}

#[test]
fn rbd_single_file_retention() {
    let mut ledger = LogLedger::new(1);
    ledger.observe(&listing(&["writer.log"]));
    ledger.observe(&listing(&["writer.log"]));

    assert_eq!(ledger.known().len(), 1);
    assert!(ledger.rotated().is_empty());
    assert!(ledger.diff(&disk(&["writer.log"])).is_clean());
}

#[test]
fn vanished_rotated_file_is_data_loss() {
    let mut ledger = LogLedger::new(2);
    ledger.observe(&listing(&["c.log", "b.log", "a.log"]));

    // a.log rotated out, then someone deleted it.
    let present = disk(&["b.log", "c.log"]);
    let diff = ledger.diff(&present);
    assert_eq!(diff.missing, vec!["a.log".to_string()]);
}

#[test]
fn vanished_current_file_is_data_loss() {
    let mut ledger = LogLedger::new(4);
    ledger.observe(&listing(&["b.log", "a.log"]));

    let diff = ledger.diff(&disk(&["b.log"]));
    assert_eq!(diff.missing, vec!["a.log".to_string()]);
    assert!(diff.unexpected.is_empty());
}

/// Scans from multiple pods with private volumes merge into one ledger.
#[test]
fn per_pod_listings_merge() {
    let mut ledger = LogLedger::new(1);
    // Two RBD pods write to the same in-pod path on private volumes,
    // so their listings deduplicate to a single tracked file.
    ledger.observe(&listing(&["writer.log"]));
    ledger.observe(&listing(&["writer.log"]));
    assert_eq!(ledger.expected().len(), 1);
}

/// Re-scanning after a loss keeps reporting the loss (idempotence).
#[test]
fn loss_report_is_stable_across_rescans() {
    let mut ledger = LogLedger::new(2);
    ledger.observe(&listing(&["b.log", "a.log"]));

    let present = disk(&["b.log"]);
    let first = ledger.diff(&present);
    ledger.observe(&listing(&["b.log"]));
    let second = ledger.diff(&present);
    assert_eq!(first, second);
    assert!(!second.is_clean());
}
