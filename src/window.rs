//! Failure window modeling.
//!
//! A failure window is the `(start, end)` UTC timestamp pair bracketing an
//! injected failure (netsplit, zone shutdown, mon crash). It is fixed
//! before recovery checks run; all pause-detection scans iterate it
//! minute-by-minute. No sub-minute granularity is modeled — the probes are
//! deliberately coarse so they can run immediately after a multi-minute
//! injection and tolerate clock skew at minute boundaries.

use jiff::{SignedDuration, Timestamp};

use crate::error::{Error, Result};

const MINUTE: SignedDuration = SignedDuration::from_secs(60);

/// An immutable `(start, end)` pair bracketing an injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureWindow {
    start: Timestamp,
    end: Timestamp,
}

/// Which timestamp rendering a workload's log lines use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinutePattern {
    /// Reader logs carry `" HH:MM"` (space-separated wall clock).
    ReadLog,
    /// Writer log files carry ISO-8601 lines, so `"THH:MM"`.
    WriteLog,
}

impl MinutePattern {
    /// Render the substring expected in a log covering minute `t`.
    pub fn render(&self, t: Timestamp) -> String {
        match self {
            MinutePattern::ReadLog => format!(" {}", t.strftime("%H:%M")),
            MinutePattern::WriteLog => format!("T{}", t.strftime("%H:%M")),
        }
    }
}

impl FailureWindow {
    /// Create a window; `end` must not precede `start`.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self> {
        if end < start {
            return Err(Error::Validation(format!(
                "failure window end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Iterate every minute from `start` through `end + 1 minute`.
    ///
    /// The extra trailing minute covers activity that lands just after the
    /// window closes, matching the minute-granularity scan convention.
    pub fn minutes(&self) -> impl Iterator<Item = Timestamp> + use<> {
        let mut t = self.start;
        let last = self.end + MINUTE;
        std::iter::from_fn(move || {
            if t > last {
                return None;
            }
            let current = t;
            t += MINUTE;
            Some(current)
        })
    }
}
