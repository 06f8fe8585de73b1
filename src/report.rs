//! Step-level reporting
//!
//! Workers report two kinds of events once a case has been isolated:
//! hard failures (counted, fail the run) and unknown fingerprints
//! (informational, for out-of-band review). Reporters are shared by every
//! worker thread.

use crate::classify::Fingerprint;
use crate::error::{SetupError, SetupResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// A single case whose runner invocation failed
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Full command line of the failing invocation
    pub command: String,
    /// Why it failed
    pub reason: String,
    /// Captured stderr, line by line
    pub stderr: Vec<String>,
}

/// A single case that ran cleanly but produced an unrecognized fingerprint
#[derive(Debug, Clone)]
pub struct UnknownReport {
    pub command: String,
    pub fingerprint: Fingerprint,
}

/// Receives isolated per-case events
pub trait Reporter: Send + Sync {
    fn on_failure(&self, report: &FailureReport);

    fn on_unknown_fingerprint(&self, report: &UnknownReport);
}

/// Prints events to the console.
///
/// Failures go to stderr with their captured error output, unknown
/// fingerprints go to stdout.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }
}

/// Render a failure the way it is printed: command, marker, indented stderr
pub fn format_failure(report: &FailureReport) -> String {
    format!("{} #failed:\n\t{}", report.command, report.stderr.join("\n\t"))
}

/// Render an unknown-fingerprint event as printed
pub fn format_unknown(report: &UnknownReport) -> String {
    format!("{} #{}", report.command, report.fingerprint)
}

impl Reporter for ConsoleReporter {
    fn on_failure(&self, report: &FailureReport) {
        eprintln!("{}", format_failure(report));
    }

    fn on_unknown_fingerprint(&self, report: &UnknownReport) {
        println!("{}", format_unknown(report));
    }
}

/// One recorded step in the JSON log
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRecord {
    Failure {
        command: String,
        reason: String,
        stderr: Vec<String>,
        at: DateTime<Utc>,
    },
    UnknownFingerprint {
        command: String,
        fingerprint: String,
        at: DateTime<Utc>,
    },
}

/// Whole-run document written by `StepLog::write`
#[derive(Debug, Serialize)]
struct StepLogDocument<'a> {
    runner: &'a str,
    bot: Option<&'a str>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    failures: usize,
    steps: &'a [StepRecord],
}

/// Collects events in memory for a JSON step log
#[derive(Debug)]
pub struct StepLog {
    path: PathBuf,
    started_at: DateTime<Utc>,
    steps: Mutex<Vec<StepRecord>>,
}

impl StepLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            started_at: Utc::now(),
            steps: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of recorded steps
    pub fn steps(&self) -> Vec<StepRecord> {
        self.steps.lock().clone()
    }

    /// Write the log as pretty JSON (`-` for stdout)
    pub fn write(&self, runner: &str, bot: Option<&str>) -> SetupResult<()> {
        let steps = self.steps.lock();
        let failures = steps
            .iter()
            .filter(|s| matches!(s, StepRecord::Failure { .. }))
            .count();
        let document = StepLogDocument {
            runner,
            bot,
            started_at: self.started_at,
            finished_at: Utc::now(),
            failures,
            steps: &steps,
        };

        let report_error = |reason: String| SetupError::Report {
            path: self.path.clone(),
            reason,
        };

        let mut out: Box<dyn Write> = if self.path == Path::new("-") {
            Box::new(std::io::stdout().lock())
        } else {
            let file = File::create(&self.path).map_err(|e| report_error(e.to_string()))?;
            Box::new(BufWriter::new(file))
        };

        serde_json::to_writer_pretty(&mut out, &document)
            .map_err(|e| report_error(e.to_string()))?;
        writeln!(out).map_err(|e| report_error(e.to_string()))?;
        out.flush().map_err(|e| report_error(e.to_string()))
    }
}

impl Reporter for StepLog {
    fn on_failure(&self, report: &FailureReport) {
        self.steps.lock().push(StepRecord::Failure {
            command: report.command.clone(),
            reason: report.reason.clone(),
            stderr: report.stderr.clone(),
            at: Utc::now(),
        });
    }

    fn on_unknown_fingerprint(&self, report: &UnknownReport) {
        self.steps.lock().push(StepRecord::UnknownFingerprint {
            command: report.command.clone(),
            fingerprint: report.fingerprint.to_string(),
            at: Utc::now(),
        });
    }
}

/// Forwards every event to each wrapped reporter in turn
#[derive(Default)]
pub struct Reporters(Vec<std::sync::Arc<dyn Reporter>>);

impl Reporters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: std::sync::Arc<dyn Reporter>) -> Self {
        self.0.push(reporter);
        self
    }
}

impl Reporter for Reporters {
    fn on_failure(&self, report: &FailureReport) {
        for reporter in &self.0 {
            reporter.on_failure(report);
        }
    }

    fn on_unknown_fingerprint(&self, report: &UnknownReport) {
        for reporter in &self.0 {
            reporter.on_unknown_fingerprint(report);
        }
    }
}
