//! Error types for case-harness
//!
//! This module defines the error hierarchy that covers:
//! - Setup failures (runner inventory, known-hash download, job scripts)
//! - Configuration and CLI errors
//! - Runner spawn/exit failures
//! - Worker thread errors
//!
//! Only setup and configuration errors abort a run. A `SpawnError` is carried
//! inside a `RunOutcome` and resolved by bisection, never propagated.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the harness
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Fatal setup errors
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised before or around the concurrent phase. All are fatal.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The runner could not list its cases
    #[error("Runner inventory query '{flag}' failed: {source}")]
    InventoryQuery { flag: String, source: SpawnError },

    /// Known-hash list could not be fetched
    #[error("Failed to fetch known hashes from '{url}': {reason}")]
    Hydration { url: String, reason: String },

    /// Job script could not be opened or read
    #[error("Failed to read jobs from '{path}': {source}")]
    JobSource {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Step log could not be written
    #[error("Failed to write step log '{path}': {reason}")]
    Report { path: PathBuf, reason: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Bot name does not have the expected dash-separated fields
    #[error("Invalid bot name '{name}': {reason}")]
    InvalidBotName { name: String, reason: String },

    /// Runner binary missing
    #[error("Runner '{path}' not found")]
    RunnerNotFound { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },
}

/// A runner invocation that did not exit cleanly
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The process could not be started
    #[error("failed to start '{program}': {reason}")]
    Start { program: String, reason: String },

    /// The process exited with a non-zero status
    #[error("exited with status {code}")]
    Exit { code: i32 },

    /// The process was killed before it could exit
    #[error("terminated by signal")]
    Signaled,
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker thread could not be spawned
    #[error("Failed to initialize worker {id}: {reason}")]
    InitFailed { id: usize, reason: String },

    /// Every receiver of the work queue is gone
    #[error("Work queue closed")]
    QueueClosed,
}

/// Result type alias for HarnessError
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Result type alias for SetupError
pub type SetupResult<T> = std::result::Result<T, SetupError>;
