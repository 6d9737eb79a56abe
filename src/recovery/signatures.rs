//! Known failure signatures in pod describe output.
//!
//! After a node or zone disruption, CSI mount races leave workload pods
//! stuck with one of a small set of recognizable complaints. The
//! orchestrator only recognizes these five strings — this is a targeted
//! workaround for a known upstream bug pattern, not a general
//! self-healing controller. Describe output genuinely is unstructured
//! text, so an enum-keyed string table is the right shape here.

use std::sync::OnceLock;

use regex::Regex;

/// A recognizable stuck-pod condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSignature {
    /// Volume path exists but nothing is mounted on it.
    StaleMount,
    /// CSI driver re-registration has not caught up after a node restart.
    CsiDriverUnregistered,
    /// Kubelet gave up waiting for mount preconditions.
    MountConditionTimeout,
    /// Device symlink left dangling by an unclean detach.
    SymlinkResolveFailed,
    /// Remount came back with wrong credentials or context.
    PermissionDenied,
}

impl FailureSignature {
    pub const ALL: [FailureSignature; 5] = [
        FailureSignature::StaleMount,
        FailureSignature::CsiDriverUnregistered,
        FailureSignature::MountConditionTimeout,
        FailureSignature::SymlinkResolveFailed,
        FailureSignature::PermissionDenied,
    ];

    /// The literal substring this signature matches in describe output.
    pub fn pattern(&self) -> &'static str {
        match self {
            FailureSignature::StaleMount => "is not a mountpoint",
            FailureSignature::CsiDriverUnregistered => {
                "not found in the list of registered CSI drivers"
            }
            FailureSignature::MountConditionTimeout => "timed out waiting for the condition",
            FailureSignature::SymlinkResolveFailed => "Error: failed to resolve symlink",
            FailureSignature::PermissionDenied => "permission denied",
        }
    }
}

/// Combined alternation over all known signatures, compiled once.
fn combined() -> &'static Regex {
    static COMBINED: OnceLock<Regex> = OnceLock::new();
    COMBINED.get_or_init(|| {
        let alternation = FailureSignature::ALL
            .iter()
            .map(|s| regex::escape(s.pattern()))
            .collect::<Vec<_>>()
            .join("|");
        #[allow(clippy::expect_used)]
        Regex::new(&alternation).expect("static signature alternation compiles")
    })
}

/// Match describe output against the known signatures.
///
/// The combined alternation runs first so clean output costs one scan;
/// only a hit is narrowed down to its variant.
pub fn match_signature(describe: &str) -> Option<FailureSignature> {
    let hit = combined().find(describe)?;
    FailureSignature::ALL
        .into_iter()
        .find(|s| s.pattern() == hit.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_describe_matches_nothing() {
        let describe = "Events:\n  Normal  Scheduled  pod assigned to node-3\n";
        assert_eq!(match_signature(describe), None);
    }

    #[test]
    fn test_each_signature_is_recognized() {
        for sig in FailureSignature::ALL {
            let describe = format!("Warning FailedMount ... {} ...", sig.pattern());
            assert_eq!(match_signature(&describe), Some(sig));
        }
    }

    #[test]
    fn test_csi_registration_race() {
        let describe = "MountVolume.MountDevice failed: driver name rbd.csi.ceph.com \
                        not found in the list of registered CSI drivers";
        assert_eq!(
            match_signature(describe),
            Some(FailureSignature::CsiDriverUnregistered)
        );
    }

    #[test]
    fn test_first_hit_wins_in_mixed_output() {
        let describe = "staging path is not a mountpoint; later: permission denied";
        assert_eq!(match_signature(describe), Some(FailureSignature::StaleMount));
    }
}
