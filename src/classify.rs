//! Output classification against the oracle
//!
//! Runner output lines of the shape `<status> <fingerprint> <case>` carry one
//! fingerprint each. Anything else on stdout is ignored.

use crate::oracle::Oracle;
use crate::runner::RunOutcome;
use std::fmt;

/// Content hash reported for one case
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(fingerprint: impl Into<String>) -> Self {
        Self(fingerprint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extract the fingerprint from one output line, if it has exactly three fields
pub fn fingerprint_of(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let (_status, fingerprint, _case) = (fields.next()?, fields.next()?, fields.next()?);
    if fields.next().is_some() {
        return None;
    }
    Some(fingerprint)
}

/// First fingerprint in `stdout` the oracle does not know
pub fn first_unknown(stdout: &str, oracle: &Oracle) -> Option<Fingerprint> {
    stdout
        .lines()
        .filter_map(fingerprint_of)
        .find(|fingerprint| !oracle.contains(fingerprint))
        .map(Fingerprint::new)
}

/// Classify a finished run.
///
/// Only clean runs are inspected, and only when gating is on.
pub fn classify(outcome: &RunOutcome, oracle: &Oracle, gating: bool) -> Option<Fingerprint> {
    if !gating || !outcome.succeeded() {
        return None;
    }
    first_unknown(&outcome.stdout_text(), oracle)
}
