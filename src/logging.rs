//! JSONL journals for trial outcomes and help digressions.
//!
//! The engine itself owns no files; the presentation layer calls these free
//! functions after each verdict or help digression to append one line per
//! event under `logs/`.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::assistant::HelpReport;
use crate::color::Rgb;
use crate::engine::VerdictOutcome;

fn ensure_log_dir() -> io::Result<()> {
    fs::create_dir_all("logs")
}

fn append_json_line<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    serde_json::to_writer(&mut file, value)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;
    file.write_all(b"\n")
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}

/// One scored verdict.
#[derive(Debug, Serialize)]
pub struct TrialLogEntry {
    /// Epoch of the upcoming trial (the outcome's post-increment value).
    pub epoch: u32,
    pub color: [u8; 3],
    pub user_says_green: bool,
    pub truth: bool,
    pub correct: bool,
    /// Tolerance after this verdict's decay.
    pub tolerance: i32,
    pub timestamp_ms: u128,
}

pub fn log_trial(color: Rgb, user_says_green: bool, outcome: &VerdictOutcome) -> io::Result<()> {
    ensure_log_dir()?;
    let entry = TrialLogEntry {
        epoch: outcome.epoch,
        color: color.channels(),
        user_says_green,
        truth: outcome.truth,
        correct: outcome.correct,
        tolerance: outcome.tolerance,
        timestamp_ms: now_ms(),
    };
    append_json_line("logs/trials.jsonl", &entry)
}

/// One help digression.
#[derive(Debug, Serialize)]
pub struct HelpLogEntry {
    pub epoch: u32,
    pub stages_completed: usize,
    pub failure: Option<String>,
    pub timestamp_ms: u128,
}

pub fn log_help(epoch: u32, report: &HelpReport) -> io::Result<()> {
    ensure_log_dir()?;
    let entry = HelpLogEntry {
        epoch,
        stages_completed: report.completed.len(),
        failure: report
            .failure
            .as_ref()
            .map(|failure| format!("{:?}: {}", failure.stage, failure.reason)),
        timestamp_ms: now_ms(),
    };
    append_json_line("logs/help.jsonl", &entry)
}
