//! Data corruption scan.
//!
//! The logreader workload re-reads everything the writers produced and
//! complains loudly when content does not match what was written. Any
//! corruption complaint in a reader's output is a structural violation —
//! there is no tolerance threshold here.

use kube::api::LogParams;
use tracing::{error, info, instrument};

use crate::cluster::{StretchCluster, require_enumerated};
use crate::config::Workload;
use crate::error::{Error, Result};

/// Find the first corruption complaint in a reader's log output.
pub fn find_corruption_line(logs: &str) -> Option<&str> {
    logs.lines()
        .map(str::trim)
        .find(|line| line.to_ascii_lowercase().contains("corrupt"))
}

impl StretchCluster {
    /// Assert no reader pod reported corrupted data.
    #[instrument(skip(self))]
    pub async fn check_for_data_corruption(&self, workload: Workload) -> Result<()> {
        let snapshot = require_enumerated(self.workload_map.get(&workload), workload)?;

        for pod in &snapshot.pods {
            let logs = self.pods.logs(&pod.name, &LogParams::default()).await?;
            if let Some(line) = find_corruption_line(&logs) {
                error!(pod = %pod.name, line, "Reader reported corrupted data");
                return Err(Error::DataCorruption {
                    pod: pod.name.clone(),
                    line: line.to_string(),
                });
            }
        }
        info!(label = workload.label(), "No data corruption reported");
        Ok(())
    }
}
