//! case-harness - batch test harness with failure bisection
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use case_harness::config::{CliArgs, HarnessConfig};
use case_harness::harness::Harness;
use case_harness::job::{bot_jobs, parse, parse_line, Job, JobScript};
use case_harness::oracle::Oracle;
use case_harness::progress::{print_header, print_summary, ProgressReporter};
use case_harness::report::{ConsoleReporter, Reporter, Reporters, StepLog};
use case_harness::runner::{Inventory, ProcessRunner};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// How often the spinner is refreshed while waiting
const PROGRESS_TICK: Duration = Duration::from_millis(250);

fn main() -> ExitCode {
    match run() {
        Ok(result) if result.passed() => ExitCode::SUCCESS,
        Ok(result) => {
            eprintln!(
                "{} runs of {} failed after retries.",
                result.failures, result.runner
            );
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// What `main` needs to pick an exit code
struct Outcome {
    failures: usize,
    runner: String,
}

impl Outcome {
    fn passed(&self) -> bool {
        self.failures == 0
    }
}

fn run() -> Result<Outcome> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = HarnessConfig::from_args(args).context("Invalid configuration")?;
    let runner_name = config.runner.display().to_string();
    let bot_name = config.bot.as_ref().map(|b| b.name().to_string());

    if config.show_progress {
        print_header(&runner_name, config.worker_count, bot_name.as_deref());
    }

    let progress = config.show_progress.then(ProgressReporter::new);
    let status = |message: &str| {
        if let Some(bar) = &progress {
            bar.set_status(message);
        }
    };

    // Ask the runner what it can run
    status("Querying runner inventory...");
    let inventory = Inventory::query(&ProcessRunner, &config.runner, &config.resources)
        .context("Failed to query runner inventory")?;

    // Only bots check hashes, so only bots download the list
    let mut oracle = Oracle::new();
    if config.gating() {
        status("Fetching known hashes...");
        oracle
            .hydrate(&config.known_hashes_url)
            .context("Failed to load known hashes")?;
    }

    // Reporters: console always, JSON step log on request
    let step_log = config.output.as_ref().map(|path| Arc::new(StepLog::new(path)));
    let mut reporters = Reporters::new().with(Arc::new(ConsoleReporter::new()));
    if let Some(log) = &step_log {
        reporters = reporters.with(Arc::clone(log) as Arc<dyn Reporter>);
    }

    let script = config.script.clone();
    let cli_job = parse(config.job.as_slice(), &inventory);
    let standard_jobs = config
        .bot
        .as_ref()
        .map(|bot| bot_jobs(bot, &inventory))
        .unwrap_or_default();
    let show_progress = config.show_progress;

    let mut harness = Harness::start(
        config,
        Arc::new(ProcessRunner),
        oracle,
        Arc::new(reporters),
    )
    .context("Failed to start workers")?;

    // Kick off every job; workers start on the first batch right away
    kickoff(&mut harness, cli_job)?;
    if let Some(path) = script {
        let script = JobScript::open(&path).context("Failed to open job script")?;
        for line in script.lines() {
            let line = line.context("Failed to read job script")?;
            kickoff(&mut harness, parse_line(&line, &inventory))?;
        }
    }
    for job in standard_jobs {
        kickoff(&mut harness, job)?;
    }

    // Wait for all batches and reruns
    status("Running jobs...");
    harness.wait(PROGRESS_TICK, |p| {
        if let Some(bar) = &progress {
            bar.update(p);
        }
    });
    let result = harness.finish().context("Run failed")?;

    if let Some(bar) = &progress {
        if result.passed() {
            bar.finish("Run completed");
        } else {
            bar.finish("Run completed with failures");
        }
    }

    if let Some(log) = &step_log {
        log.write(&runner_name, bot_name.as_deref())
            .context("Failed to write step log")?;
        info!(path = %log.path().display(), "Step log written");
    }

    if show_progress {
        let output = step_log.as_ref().map(|log| log.path().display().to_string());
        print_summary(&result, output.as_deref());
    }

    Ok(Outcome {
        failures: result.failures,
        runner: runner_name,
    })
}

fn kickoff(harness: &mut Harness, job: Job) -> Result<()> {
    harness.kickoff(job).context("Failed to submit job")?;
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("case_harness=debug,warn")
    } else {
        EnvFilter::new("case_harness=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
