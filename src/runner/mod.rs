//! Runner invocation
//!
//! The runner is an external executable. One invocation runs one batch:
//!
//! ```text
//! <runner> -i <resources> [flags...] -s <source> [<source>...]
//! ```
//!
//! Output is captured fully in memory. A failed spawn or a non-zero exit is
//! not an error at this layer: it is recorded in the returned `RunOutcome` and
//! left for bisection to resolve.

pub mod inventory;

pub use inventory::{CaseGroup, Inventory};

use crate::error::SpawnError;
use crate::harness::queue::WorkItem;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// A fully-built runner command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<String>,
}

impl Invocation {
    /// Command line for running one batch
    pub fn batch(program: &Path, resources: &Path, item: &WorkItem) -> Self {
        let mut args = Vec::with_capacity(3 + item.flags().len() + item.len());
        args.push("-i".to_string());
        args.push(resources.display().to_string());
        args.extend(item.flags().iter().cloned());
        args.push("-s".to_string());
        args.extend(item.sources().iter().cloned());

        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    /// Command line for an inventory listing (`--listGMs`, `--listTests`)
    pub fn query(program: &Path, resources: &Path, flag: &str) -> Self {
        Self {
            program: program.to_path_buf(),
            args: vec![
                "-i".to_string(),
                resources.display().to_string(),
                flag.to_string(),
            ],
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Exit status and captured output of one runner invocation
#[derive(Debug, Clone, Default)]
pub struct RunOutcome {
    /// Why the run did not exit cleanly, if it didn't
    pub failure: Option<SpawnError>,

    /// Captured stdout
    pub stdout: Vec<u8>,

    /// Captured stderr
    pub stderr: Vec<u8>,
}

impl RunOutcome {
    /// A clean exit
    pub fn success(stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            failure: None,
            stdout,
            stderr,
        }
    }

    /// A failed spawn or non-zero exit
    pub fn failed(error: SpawnError, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            failure: Some(error),
            stdout,
            stderr,
        }
    }

    /// Did the runner exit cleanly?
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// Stdout as text (lossy)
    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Stderr split into lines (lossy)
    pub fn stderr_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.stderr)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Runs one invocation to completion.
///
/// Implementations must be shareable across worker threads. Any
/// `Fn(&Invocation) -> RunOutcome` closure is a runner, which keeps tests free
/// of real processes.
pub trait Runner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> RunOutcome;
}

impl<F> Runner for F
where
    F: Fn(&Invocation) -> RunOutcome + Send + Sync,
{
    fn run(&self, invocation: &Invocation) -> RunOutcome {
        self(invocation)
    }
}

/// Spawns the runner as a child process and waits for it
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl Runner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> RunOutcome {
        let output = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) => {
                let failure = if output.status.success() {
                    None
                } else {
                    Some(match output.status.code() {
                        Some(code) => SpawnError::Exit { code },
                        None => SpawnError::Signaled,
                    })
                };
                RunOutcome {
                    failure,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
            Err(e) => RunOutcome::failed(
                SpawnError::Start {
                    program: invocation.program().display().to_string(),
                    reason: e.to_string(),
                },
                Vec::new(),
                Vec::new(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::queue::FlagSet;

    #[test]
    fn test_batch_command_line() {
        let item = WorkItem::new(
            vec!["blur".into(), "shadows".into()],
            FlagSet::from(vec!["--ct".to_string(), "8888".to_string()]),
        )
        .unwrap();

        let invocation = Invocation::batch(Path::new("out/fm"), Path::new("resources"), &item);
        assert_eq!(
            invocation.args(),
            ["-i", "resources", "--ct", "8888", "-s", "blur", "shadows"]
        );
        assert_eq!(
            invocation.to_string(),
            "out/fm -i resources --ct 8888 -s blur shadows"
        );
    }

    #[test]
    fn test_query_command_line() {
        let invocation = Invocation::query(Path::new("fm"), Path::new("res"), "--listTests");
        assert_eq!(invocation.to_string(), "fm -i res --listTests");
    }

    #[test]
    fn test_missing_program_is_start_failure() {
        let invocation = Invocation::query(
            Path::new("/nonexistent/case-harness-runner"),
            Path::new("res"),
            "--listGMs",
        );
        let outcome = ProcessRunner.run(&invocation);
        assert!(!outcome.succeeded());
        assert!(matches!(outcome.failure, Some(SpawnError::Start { .. })));
    }

    #[test]
    fn test_stderr_lines() {
        let outcome = RunOutcome::failed(
            SpawnError::Exit { code: 1 },
            Vec::new(),
            b"first\nsecond\n".to_vec(),
        );
        assert_eq!(outcome.stderr_lines(), ["first", "second"]);
    }
}
