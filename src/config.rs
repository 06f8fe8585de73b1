//! Configuration types for case-harness
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use crate::job::BotName;
use crate::oracle::DEFAULT_KNOWN_HASHES_URL;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch test harness with failure bisection
#[derive(Parser, Debug, Clone)]
#[command(
    name = "case-harness",
    version,
    about = "Runs a test executable over many cases in parallel batches, bisecting failures",
    long_about = "Runs a test executable over many cases in parallel batches.\n\n\
                  A batch that fails, or that produces an output hash not in the known-hash list,\n\
                  is rerun one case at a time so every failure is attributed to a single case.",
    after_help = "JOB TOKENS:\n    \
        gm, gms          all visual cases\n    \
        test, tests      all unit tests\n    \
        key=value        runner flag (-k value, or --key value for longer keys)\n    \
        #...             comment, ignores the rest of the line\n    \
        anything else    a single case name or file path\n\n\
        EXAMPLES:\n    \
        case-harness out/fm gms b=cpu ct=8888\n    \
        case-harness out/fm --script jobs.txt -j 16\n    \
        case-harness out/fm --bot Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All -o steps.json"
)]
pub struct CliArgs {
    /// Runner executable
    #[arg(value_name = "RUNNER")]
    pub runner: PathBuf,

    /// One job, as tokens (see JOB TOKENS)
    #[arg(value_name = "JOB", trailing_var_arg = true, allow_hyphen_values = true)]
    pub job: Vec<String>,

    /// Resources directory passed to the runner with -i
    #[arg(long, default_value = "resources", value_name = "DIR")]
    pub resources: PathBuf,

    /// File with one job per line (- for stdin)
    #[arg(long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Bot name: runs the bot's standard jobs and checks hashes against the known list
    #[arg(long, value_name = "NAME")]
    pub bot: Option<String>,

    /// Number of worker threads (and target batches per job)
    #[arg(
        short = 'j',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub jobs: usize,

    /// Known-hash list fetched in bot mode
    #[arg(long, default_value = DEFAULT_KNOWN_HASHES_URL, value_name = "URL")]
    pub known_hashes_url: String,

    /// Write a JSON step log to FILE (- for stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (per-batch logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    num_cpus::get()
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Runner executable
    pub runner: PathBuf,

    /// Resources directory passed with -i
    pub resources: PathBuf,

    /// Job from the command line (raw tokens)
    pub job: Vec<String>,

    /// Job script, if any
    pub script: Option<PathBuf>,

    /// Parsed bot name (enables hash gating)
    pub bot: Option<BotName>,

    /// Number of worker threads
    pub worker_count: usize,

    /// Known-hash list location
    pub known_hashes_url: String,

    /// JSON step log destination
    pub output: Option<PathBuf>,

    /// Show progress indicator
    pub show_progress: bool,
}

impl HarnessConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Validate worker count
        if args.jobs == 0 || args.jobs > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.jobs,
                max: MAX_WORKERS,
            });
        }

        // A bare program name is resolved through PATH at spawn time
        let has_dir = args
            .runner
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty());
        if has_dir && !args.runner.exists() {
            return Err(ConfigError::RunnerNotFound { path: args.runner });
        }

        let bot = args.bot.as_deref().map(BotName::parse).transpose()?;

        // Validate output path
        if let Some(output) = &args.output {
            // Unknown-fingerprint lines already go to stdout in bot mode
            if bot.is_some() && output.as_path() == Path::new("-") {
                return Err(ConfigError::InvalidOutputPath {
                    path: output.clone(),
                    reason: "stdout is reserved for unknown-fingerprint lines in bot mode"
                        .to_string(),
                });
            }
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        Ok(Self {
            runner: args.runner,
            resources: args.resources,
            job: args.job,
            script: args.script,
            bot,
            worker_count: args.jobs,
            known_hashes_url: args.known_hashes_url,
            output: args.output,
            show_progress: !args.quiet,
        })
    }

    /// Minimal configuration for an ad hoc run of `runner` with no jobs yet
    pub fn local(runner: impl Into<PathBuf>, worker_count: usize) -> Self {
        Self {
            runner: runner.into(),
            resources: PathBuf::from("resources"),
            job: Vec::new(),
            script: None,
            bot: None,
            worker_count: worker_count.max(1),
            known_hashes_url: DEFAULT_KNOWN_HASHES_URL.to_string(),
            output: None,
            show_progress: false,
        }
    }

    /// Are outputs checked against the known-hash list?
    ///
    /// Only bots fetch the list, so only bots gate on it.
    pub fn gating(&self) -> bool {
        self.bot.is_some()
    }
}
