//! Known-good fingerprint set
//!
//! Filled during single-threaded setup (sentinel, then an optional download),
//! then shared read-only with every worker through an `Arc`.

use crate::error::{SetupError, SetupResult};
use std::collections::HashSet;
use std::io::BufRead;
use std::time::Duration;
use tracing::{debug, info};

/// Fingerprint of the trivially passing unit test output
pub const PASSING_TEST_FINGERPRINT: &str = "0832f708a97acc6da385446384647a8f";

/// Default location of the production known-hash list
pub const DEFAULT_KNOWN_HASHES_URL: &str =
    "https://storage.googleapis.com/skia-infra-gm/hash_files/gold-prod-hashes.txt";

/// Download timeout for the known-hash list
const FETCH_TIMEOUT: Duration = Duration::from_secs(300);

/// Set of fingerprints whose output is known to be good
#[derive(Debug, Clone)]
pub struct Oracle {
    known: HashSet<String>,
}

impl Oracle {
    /// Create an oracle holding only the sentinel fingerprint
    pub fn new() -> Self {
        let mut known = HashSet::new();
        known.insert(PASSING_TEST_FINGERPRINT.to_string());
        Self { known }
    }

    /// Is this fingerprint known?
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.known.contains(fingerprint)
    }

    /// Add one fingerprint
    pub fn insert(&mut self, fingerprint: impl Into<String>) -> bool {
        self.known.insert(fingerprint.into())
    }

    /// Number of distinct known fingerprints
    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Add every non-blank line of a newline-delimited list.
    ///
    /// Returns the number of lines read.
    pub fn extend_from_reader<R: BufRead>(&mut self, reader: R) -> std::io::Result<usize> {
        let mut lines = 0;
        for line in reader.lines() {
            let line = line?;
            let fingerprint = line.trim();
            if !fingerprint.is_empty() {
                self.known.insert(fingerprint.to_string());
                lines += 1;
            }
        }
        Ok(lines)
    }

    /// Download a newline-delimited fingerprint list and add it.
    ///
    /// Any transport error or non-success status is fatal.
    pub fn hydrate(&mut self, url: &str) -> SetupResult<usize> {
        let hydration_error = |reason: String| SetupError::Hydration {
            url: url.to_string(),
            reason,
        };

        info!(url = %url, "Fetching known hashes");

        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| hydration_error(e.to_string()))?;

        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| hydration_error(e.to_string()))?;

        let lines = self
            .extend_from_reader(std::io::BufReader::new(response))
            .map_err(|e| hydration_error(e.to_string()))?;

        debug!(lines, "Known-hash list read");
        info!(known = self.len(), "Known hashes loaded");
        Ok(lines)
    }
}

impl Default for Oracle {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Into<String>> FromIterator<S> for Oracle {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut oracle = Self::new();
        for fingerprint in iter {
            oracle.insert(fingerprint);
        }
        oracle
    }
}
