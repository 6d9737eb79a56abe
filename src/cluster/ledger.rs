//! Log file ledger.
//!
//! Tracks, per writer workload, which log files exist and which have
//! rotated past the retention threshold. The ledger is a safety net for
//! log-rotation races: after any sequence of scans interleaved with
//! rotation, everything the ledger has ever seen (`known ∪ rotated`) must
//! still be present on disk. A file that vanishes entirely is silent
//! data loss.

use std::collections::BTreeSet;

use tracing::{debug, error, info, instrument, warn};

use crate::config::Workload;
use crate::error::{Error, Result};
use crate::exec::exec_in_pod;

use super::{StretchCluster, require_enumerated};

/// Pure ledger state for one writer workload.
#[derive(Debug, Clone)]
pub struct LogLedger {
    retention: usize,
    known: BTreeSet<String>,
    rotated: BTreeSet<String>,
}

/// Difference between the ledger's expectation and the observed file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerDiff {
    /// Expected files no longer present anywhere: data loss.
    pub missing: Vec<String>,
    /// Present files the ledger never observed.
    pub unexpected: Vec<String>,
}

impl LedgerDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl LogLedger {
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            known: BTreeSet::new(),
            rotated: BTreeSet::new(),
        }
    }

    /// Absorb one pod's file listing, sorted newest-first.
    ///
    /// Files beyond the retention threshold move to the rotated set (and
    /// out of the known set); the newest `retention` files merge into the
    /// known set. Both sets deduplicate. After each call the known
    /// portion of this listing is at most `retention` entries.
    pub fn observe(&mut self, listing_newest_first: &[String]) {
        let cutoff = self.retention.min(listing_newest_first.len());
        for old in &listing_newest_first[cutoff..] {
            self.known.remove(old);
            self.rotated.insert(old.clone());
        }
        for current in &listing_newest_first[..cutoff] {
            if !self.rotated.contains(current) {
                self.known.insert(current.clone());
            }
        }
    }

    /// Everything the ledger expects to still exist on disk.
    pub fn expected(&self) -> BTreeSet<String> {
        self.known.union(&self.rotated).cloned().collect()
    }

    /// Compare an observed file set against the expectation.
    pub fn diff(&self, present: &BTreeSet<String>) -> LedgerDiff {
        let expected = self.expected();
        LedgerDiff {
            missing: expected.difference(present).cloned().collect(),
            unexpected: present.difference(&expected).cloned().collect(),
        }
    }

    pub fn known(&self) -> &BTreeSet<String> {
        &self.known
    }

    pub fn rotated(&self) -> &BTreeSet<String> {
        &self.rotated
    }
}

impl StretchCluster {
    /// List one pod's `*.log` files, newest first.
    async fn list_log_files(&self, pod_name: &str, log_dir: &str) -> Result<Vec<String>> {
        let command = format!("ls -1t {log_dir}/*.log");
        let output = exec_in_pod(&self.pods, pod_name, &command)
            .await?
            .require_success(&command)?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Collect every log file currently present across a workload's pods.
    async fn collect_present_files(&self, workload: Workload) -> Result<BTreeSet<String>> {
        let snapshot = require_enumerated(self.workload_map.get(&workload), workload)?.clone();

        let mut present = BTreeSet::new();
        for pod in &snapshot.pods {
            present.extend(self.list_log_files(&pod.name, workload.log_dir()).await?);
            if workload.shared_volume() {
                // Every pod sees the same RWX volume.
                break;
            }
        }
        Ok(present)
    }

    /// Scan the workload's pods and fold their file listings into the
    /// ledger, producing the baseline a later data-loss check verifies.
    #[instrument(skip(self))]
    pub async fn get_logfile_map(&mut self, workload: Workload) -> Result<()> {
        if workload.retention().is_none() {
            return Err(Error::Validation(format!(
                "{} has no log ledger (reader workload)",
                workload.label()
            )));
        }

        let snapshot = require_enumerated(self.workload_map.get(&workload), workload)?.clone();
        let mut listings = Vec::new();
        for pod in &snapshot.pods {
            let listing = self.list_log_files(&pod.name, workload.log_dir()).await?;
            debug!(pod = %pod.name, files = listing.len(), "Listed log files");
            listings.push(listing);
            if workload.shared_volume() {
                break;
            }
        }

        if let Some(ledger) = self.ledgers.get_mut(&workload) {
            for listing in &listings {
                ledger.observe(listing);
            }
            info!(
                label = workload.label(),
                known = ledger.known().len(),
                rotated = ledger.rotated().len(),
                "Log file ledger updated"
            );
        }
        Ok(())
    }

    /// Verify that every file the ledger has observed still exists.
    ///
    /// Re-scans first so freshly rotated files are absorbed, then
    /// compares the on-disk set against `known ∪ rotated`. Returns
    /// `false` with a full diff logged when files have vanished.
    #[instrument(skip(self))]
    pub async fn check_for_data_loss(&mut self, workload: Workload) -> Result<bool> {
        self.get_logfile_map(workload).await?;
        let present = self.collect_present_files(workload).await?;
        let ledger = self.ledgers.get(&workload).ok_or_else(|| {
            Error::Validation(format!("no log ledger for {}", workload.label()))
        })?;

        let diff = ledger.diff(&present);
        if diff.is_clean() {
            info!(label = workload.label(), files = present.len(), "No data loss");
            return Ok(true);
        }
        error!(
            label = workload.label(),
            missing = ?diff.missing,
            unexpected = ?diff.unexpected,
            known = ?ledger.known(),
            rotated = ?ledger.rotated(),
            "Log file set diverged from ledger"
        );
        Ok(false)
    }

    /// Like [`check_for_data_loss`], but data loss is an error.
    ///
    /// [`check_for_data_loss`]: StretchCluster::check_for_data_loss
    pub async fn assert_no_data_loss(&mut self, workload: Workload) -> Result<()> {
        self.get_logfile_map(workload).await?;
        let present = self.collect_present_files(workload).await?;
        let ledger = self.ledgers.get(&workload).ok_or_else(|| {
            Error::Validation(format!("no log ledger for {}", workload.label()))
        })?;
        let diff = ledger.diff(&present);
        if diff.is_clean() {
            return Ok(());
        }
        warn!(label = workload.label(), "Data loss check failed");
        Err(Error::DataLoss {
            label: workload.label().to_string(),
            missing: diff.missing,
            unexpected: diff.unexpected,
        })
    }
}
