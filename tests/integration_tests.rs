//! Integration tests for case-harness
//!
//! Most tests drive the harness with an in-process runner (a closure). The
//! unix-only tests write a small shell script runner into a temp directory and
//! run it as a real child process.

use case_harness::config::HarnessConfig;
use case_harness::error::SpawnError;
use case_harness::harness::Harness;
use case_harness::job::{parse, parse_line, BotName, Job};
use case_harness::oracle::Oracle;
use case_harness::report::{StepLog, StepRecord};
use case_harness::runner::{Invocation, Inventory, RunOutcome, Runner};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const GCE_BOT: &str = "Test-Debian10-Clang-GCE-CPU-AVX2-x86_64-Debug-All";

fn start(runner: Arc<dyn Runner>, workers: usize, bot: Option<&str>) -> (Harness, Arc<StepLog>) {
    let mut config = HarnessConfig::local("fm", workers);
    config.bot = bot.map(|name| BotName::parse(name).unwrap());

    let oracle: Oracle = ["deadbeef"].into_iter().collect();
    let log = Arc::new(StepLog::new("-"));
    let harness = Harness::start(config, runner, oracle, log.clone()).unwrap();
    (harness, log)
}

fn names(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}{}", prefix, i)).collect()
}

/// Cases named after `-s` in an invocation
fn sources_of(invocation: &Invocation) -> Vec<String> {
    invocation
        .args()
        .iter()
        .skip_while(|a| *a != "-s")
        .skip(1)
        .cloned()
        .collect()
}

/// Flags between the resources dir and `-s`
fn flags_of(invocation: &Invocation) -> Vec<String> {
    invocation
        .args()
        .iter()
        .skip(2)
        .take_while(|a| *a != "-s")
        .cloned()
        .collect()
}

#[test]
fn test_every_batch_fails() {
    let runner: Arc<dyn Runner> = Arc::new(|_: &Invocation| {
        RunOutcome::failed(SpawnError::Exit { code: 1 }, Vec::new(), Vec::new())
    });
    let (mut harness, log) = start(runner, 3, None);

    // 10 cases over 3 workers: batches of 4, 4, 2
    assert_eq!(harness.kickoff(Job::new(names("case", 10), Vec::new())).unwrap(), 3);
    let result = harness.finish().unwrap();

    assert_eq!(result.failures, 10);
    assert_eq!(result.stats.bisections, 3);
    assert_eq!(result.stats.runs, 13);
    assert_eq!(result.stats.clean_cases, 0);
    assert_eq!(log.steps().len(), 10);
}

#[test]
fn test_no_case_skipped_or_double_counted() {
    let seen = Arc::new(Mutex::new(Vec::<(Vec<String>, String)>::new()));
    let recorder = Arc::clone(&seen);

    // Slow, and fails any batch containing a case ending in 7
    let runner: Arc<dyn Runner> = Arc::new(move |invocation: &Invocation| {
        thread::sleep(Duration::from_millis(2));
        let sources = sources_of(invocation);
        if sources.len() == 1 {
            recorder
                .lock()
                .push((flags_of(invocation), sources[0].clone()));
        }
        if sources.iter().any(|s| s.ends_with('7')) {
            RunOutcome::failed(SpawnError::Exit { code: 1 }, Vec::new(), Vec::new())
        } else {
            RunOutcome::success(Vec::new(), Vec::new())
        }
    });
    let (mut harness, _log) = start(runner, 4, None);

    harness
        .kickoff(Job::new(names("a", 40), vec!["--ct".into(), "565".into()]))
        .unwrap();
    harness
        .kickoff(Job::new(names("b", 25), vec!["--skvm".into()]))
        .unwrap();
    let result = harness.finish().unwrap();

    // a7, a17, a27, a37, b7, b17
    assert_eq!(result.failures, 6);
    assert_eq!(result.stats.clean_cases as usize + result.failures, 65);
    assert_eq!(result.jobs, 2);

    // Every rerun keeps its job's flags, and no case is rerun twice
    let seen = seen.lock();
    let mut rerun: Vec<&String> = seen.iter().map(|(_, source)| source).collect();
    rerun.sort();
    rerun.dedup();
    assert_eq!(rerun.len(), seen.len());
    for (flags, source) in seen.iter() {
        if source.starts_with('a') {
            assert_eq!(flags, &["--ct", "565"]);
        } else {
            assert_eq!(flags, &["--skvm"]);
        }
    }
}

#[test]
fn test_unknown_fingerprint_is_reported_not_failed() {
    let runner: Arc<dyn Runner> = Arc::new(|invocation: &Invocation| {
        let stdout: String = sources_of(invocation)
            .iter()
            .map(|s| {
                let hash = if s == "odd" { "cafebabe" } else { "deadbeef" };
                format!("ok {} {}\n", hash, s)
            })
            .collect();
        RunOutcome::success(stdout.into_bytes(), Vec::new())
    });
    // One worker: all three cases land in one batch
    let (mut harness, log) = start(runner, 1, Some(GCE_BOT));

    let sources = vec!["even".to_string(), "odd".to_string(), "other".to_string()];
    harness.kickoff(Job::new(sources, Vec::new())).unwrap();
    let result = harness.finish().unwrap();

    assert!(result.passed());
    assert_eq!(result.stats.unknown_fingerprints, 1);
    assert_eq!(result.stats.bisections, 1);

    let steps = log.steps();
    assert_eq!(steps.len(), 1);
    match &steps[0] {
        StepRecord::UnknownFingerprint {
            command,
            fingerprint,
            ..
        } => {
            assert!(command.ends_with("-s odd"));
            assert_eq!(fingerprint, "cafebabe");
        }
        other => panic!("unexpected step {:?}", other),
    }
}

#[test]
fn test_unknown_fingerprint_ignored_without_bot() {
    let runner: Arc<dyn Runner> = Arc::new(|invocation: &Invocation| {
        let stdout: String = sources_of(invocation)
            .iter()
            .map(|s| format!("ok cafebabe {}\n", s))
            .collect();
        RunOutcome::success(stdout.into_bytes(), Vec::new())
    });
    let (mut harness, log) = start(runner, 2, None);

    harness.kickoff(Job::new(names("c", 6), Vec::new())).unwrap();
    let result = harness.finish().unwrap();

    assert!(result.passed());
    assert_eq!(result.stats.unknown_fingerprints, 0);
    assert_eq!(result.stats.bisections, 0);
    assert!(log.steps().is_empty());
}

#[test]
fn test_panicking_runner_does_not_hang() {
    let runner: Arc<dyn Runner> = Arc::new(|invocation: &Invocation| {
        if sources_of(invocation).iter().any(|s| s == "boom") {
            panic!("runner exploded");
        }
        RunOutcome::success(Vec::new(), Vec::new())
    });
    let (mut harness, _log) = start(runner, 2, None);

    harness
        .kickoff(Job::new(vec!["boom".to_string()], Vec::new()))
        .unwrap();
    harness.kickoff(Job::new(names("ok", 4), Vec::new())).unwrap();
    let result = harness.finish().unwrap();

    assert_eq!(result.failures, 1);
    assert_eq!(result.stats.clean_cases, 4);
}

#[test]
fn test_script_lines_become_jobs() {
    let inventory = Inventory::new(vec!["gm1".into(), "gm2".into()], vec!["t1".into()]);

    let jobs: Vec<Job> = ["gms ct=8888", "# nothing here", "", "t1 blur b=cpu # trailing"]
        .iter()
        .map(|line| parse_line(line, &inventory))
        .collect();

    assert_eq!(jobs[0].sources, ["gm1", "gm2"]);
    assert_eq!(jobs[0].flags, ["--ct", "8888"]);
    assert!(jobs[1].is_empty());
    assert!(jobs[2].is_empty());
    assert_eq!(jobs[3].sources, ["t1", "blur"]);
    assert_eq!(jobs[3].flags, ["-b", "cpu"]);

    let cli = parse(&["tests", "gm"], &inventory);
    assert_eq!(cli.sources, ["t1", "gm1", "gm2"]);
}

#[cfg(unix)]
mod process {
    use super::*;
    use case_harness::runner::ProcessRunner;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    const SCRIPT: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/calls.log"
case "$3" in
  --listGMs) printf 'blur\nshadows\nbad\n'; exit 0 ;;
  --listTests) printf 'unit1\nunit2\n'; exit 0 ;;
esac
after=0
status=0
for arg in "$@"; do
  if [ "$after" = 1 ]; then
    if [ "$arg" = bad ]; then
      echo "bad case crashed" >&2
      status=1
    fi
    echo "ok deadbeef $arg"
  fi
  if [ "$arg" = "-s" ]; then after=1; fi
done
exit $status
"#;

    fn write_runner(dir: &Path) -> PathBuf {
        let path = dir.join("fm");
        fs::write(&path, SCRIPT).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_inventory_from_process() {
        let dir = tempdir().unwrap();
        let runner = write_runner(dir.path());

        let inventory = Inventory::query(&ProcessRunner, &runner, Path::new("res")).unwrap();
        assert_eq!(
            inventory.members(case_harness::runner::CaseGroup::VisualCases),
            ["blur", "shadows", "bad"]
        );
        assert_eq!(
            inventory.members(case_harness::runner::CaseGroup::UnitTests),
            ["unit1", "unit2"]
        );
    }

    #[test]
    fn test_end_to_end_with_process_runner() {
        let dir = tempdir().unwrap();
        let runner = write_runner(dir.path());
        let inventory = Inventory::query(&ProcessRunner, &runner, Path::new("res")).unwrap();

        let mut config = HarnessConfig::local(&runner, 2);
        config.resources = PathBuf::from("res");
        let log = Arc::new(StepLog::new(dir.path().join("steps.json")));
        let mut harness = Harness::start(
            config,
            Arc::new(ProcessRunner),
            Oracle::new(),
            log.clone(),
        )
        .unwrap();

        harness.kickoff(parse(&["gms", "ct=8888"], &inventory)).unwrap();
        harness.kickoff(parse(&["tests"], &inventory)).unwrap();
        let result = harness.finish().unwrap();

        assert_eq!(result.failures, 1);
        assert_eq!(result.stats.clean_cases, 4);

        let steps = log.steps();
        assert_eq!(steps.len(), 1);
        match &steps[0] {
            StepRecord::Failure { command, stderr, .. } => {
                assert!(command.ends_with("-i res --ct 8888 -s bad"));
                assert_eq!(stderr, &["bad case crashed"]);
            }
            other => panic!("unexpected step {:?}", other),
        }

        log.write(&runner.display().to_string(), None).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(log.path()).unwrap()).unwrap();
        assert_eq!(json["failures"], 1);

        // Every visual-case run carried the job's flags
        let calls = fs::read_to_string(dir.path().join("calls.log")).unwrap();
        for call in calls.lines().filter(|c| c.contains("-s") && c.contains("blur")) {
            assert!(call.starts_with("-i res --ct 8888 -s"), "{}", call);
        }
    }
}
