//! Pause-detection scenarios over a realistic failure window.
//!
//! Models a 15-minute netsplit: workloads in the partitioned zone go
//! silent mid-window, workloads elsewhere keep writing. The same scan
//! over the same window must always produce the same counts.

use jiff::Timestamp;

use stretch_verifier::FailureWindow;
use stretch_verifier::checks::{MAX_SILENT_MINUTES, silent_minutes};
use stretch_verifier::window::MinutePattern;

fn ts(s: &str) -> Timestamp {
    s.parse().unwrap()
}

fn netsplit_window() -> FailureWindow {
    FailureWindow::new(ts("2026-08-30T14:00:00Z"), ts("2026-08-30T14:15:00Z")).unwrap()
}

/// A writer log with ISO-8601 lines covering `minutes` past 14:00.
fn writer_log(minutes: &[u32]) -> String {
    minutes
        .iter()
        .map(|m| format!("2026-08-30T14:{m:02}:07.113Z wrote 4096 bytes\n"))
        .collect()
}

#[test]
fn unaffected_writer_is_never_paused() {
    let log = writer_log(&(0..=16).collect::<Vec<_>>());
    let silent = silent_minutes(&log, &netsplit_window(), MinutePattern::WriteLog);
    assert_eq!(silent, 0);
}

#[test]
fn partitioned_writer_crosses_the_pause_threshold() {
    // Silent from 14:04 through 14:12 — nine missing minutes.
    let active: Vec<u32> = (0..=16).filter(|m| !(4..=12).contains(m)).collect();
    let log = writer_log(&active);
    let silent = silent_minutes(&log, &netsplit_window(), MinutePattern::WriteLog);
    assert_eq!(silent, 9);
    assert!(silent > MAX_SILENT_MINUTES);
}

#[test]
fn short_stall_stays_under_threshold() {
    // A brief mon-election stall: four silent minutes is tolerated.
    let active: Vec<u32> = (0..=16).filter(|m| !(6..=9).contains(m)).collect();
    let log = writer_log(&active);
    let silent = silent_minutes(&log, &netsplit_window(), MinutePattern::WriteLog);
    assert_eq!(silent, 4);
    assert!(silent <= MAX_SILENT_MINUTES);
}

#[test]
fn reader_pattern_matches_space_separated_timestamps() {
    let window =
        FailureWindow::new(ts("2026-08-30T14:00:00Z"), ts("2026-08-30T14:02:00Z")).unwrap();
    let log = "verified at 2026-08-30 14:00:10\n\
               verified at 2026-08-30 14:01:55\n\
               verified at 2026-08-30 14:02:31\n\
               verified at 2026-08-30 14:03:02\n";
    assert_eq!(silent_minutes(log, &window, MinutePattern::ReadLog), 0);
}

#[test]
fn scan_is_idempotent_over_fixed_window() {
    let active: Vec<u32> = (0..=16).filter(|m| *m % 2 == 0).collect();
    let log = writer_log(&active);
    let window = netsplit_window();
    let first = silent_minutes(&log, &window, MinutePattern::WriteLog);
    let second = silent_minutes(&log, &window, MinutePattern::WriteLog);
    assert_eq!(first, second);
}

#[test]
fn empty_log_is_fully_silent() {
    let silent = silent_minutes("", &netsplit_window(), MinutePattern::WriteLog);
    // 14:00 through 14:16 inclusive.
    assert_eq!(silent, 17);
}
