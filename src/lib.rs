//! case-harness - Batch Test Harness with Failure Bisection
//!
//! Runs an external test executable (the *runner*) over many cases in
//! parallel. Cases are shuffled into one batch per worker; a batch that
//! fails, or whose output contains an unrecognized fingerprint, is rerun one
//! case at a time so every failure is attributed to a single case.
//!
//! # Features
//!
//! - **Batching**: one runner process per batch instead of per case.
//!
//! - **Bisection**: inconclusive batches are split into singletons and
//!   requeued. Singletons are never split again.
//!
//! - **Hash Gating**: in bot mode, every output fingerprint is checked against
//!   a downloaded list of known-good hashes.
//!
//! - **Deterministic Planning**: a fixed-seed shuffle gives the same batches
//!   for the same inputs on every run.
//!
//! # Architecture
//!
//! ```text
//!  CLI tokens ─┐
//!  job script ─┼──► job::parse ──► Job ──► BatchPlanner ──► WorkItems
//!  bot name ───┘        ▲                                      │
//!                       │                                      ▼
//!               runner::Inventory              ┌──────────────────────────┐
//!               (--listGMs/--listTests)        │   harness::Harness       │
//!                                              │   WorkQueue + N workers  │
//!                                              └─────────────┬────────────┘
//!                                                            │ per item
//!                                                            ▼
//!                             runner ──► classify (Oracle) ──► judge
//!                                                            │
//!                              ┌─────────────────────────────┼──────────┐
//!                              ▼                             ▼          ▼
//!                       bisect: requeue             report failure    clean
//!                       singletons                  / unknown hash
//! ```
//!
//! # Example
//!
//! ```bash
//! # All visual cases in the 8888 config
//! case-harness out/fm gms ct=8888
//!
//! # One job per line from a file, 16 workers
//! case-harness out/fm --script jobs.txt -j 16
//!
//! # A bot's standard jobs, with a JSON step log
//! case-harness out/fm --bot Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All -o steps.json
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod harness;
pub mod job;
pub mod oracle;
pub mod progress;
pub mod report;
pub mod runner;

pub use config::{CliArgs, HarnessConfig};
pub use error::{HarnessError, Result};
pub use harness::{Harness, HarnessProgress, HarnessResult};
