use std::{collections::BTreeSet, io::Write, path::PathBuf, thread};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::app::console::Console;
use crate::config::Config;
use crate::manifest::write_procfile;
use crate::models::{
    message::{OutputRecord, TaskMessage},
    task::Task,
};
use crate::worker::{executor::run_task, pool};
use crate::Result;

pub const SETUP_TASK_NAME: &str = "common setup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    RunningSetup,
    SetupFailed,
    RunningApplications,
    ApplicationsFailed,
    WritingManifest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    SetupFailed,
    ApplicationsFailed { failed: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub procfile: PathBuf,
    /// Takes precedence over `common.workers` when set.
    pub workers: Option<usize>,
    pub colored: bool,
}

pub struct Orchestrator {
    config: Config,
    options: RunOptions,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(config: Config, options: RunOptions) -> Self {
        Orchestrator {
            config,
            options,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    fn worker_count(&self) -> usize {
        match self.options.workers {
            Some(n) if n > 0 => n,
            _ => self.config.common.worker_count(),
        }
    }

    /// Runs setup, then every enabled application, then writes the manifest.
    ///
    /// All console output is rendered to `out` before this returns.
    pub fn run<W: Write + Send + 'static>(&mut self, out: W) -> Result<RunOutcome> {
        let console = Console::spawn(out, self.options.colored)?;
        let outcome = self.run_phases(console.sender());
        console.finish()?;
        if outcome == RunOutcome::Success {
            self.enter(Phase::WritingManifest);
            write_procfile(&self.options.procfile, &self.config.enabled_applications())?;
        }
        Ok(outcome)
    }

    fn run_phases(&mut self, output: Sender<OutputRecord>) -> RunOutcome {
        self.enter(Phase::RunningSetup);
        if !self.run_setup(&output) {
            self.enter(Phase::SetupFailed);
            return RunOutcome::SetupFailed;
        }

        self.enter(Phase::RunningApplications);
        let failed = self.run_applications(&output);
        if !failed.is_empty() {
            self.enter(Phase::ApplicationsFailed);
            return RunOutcome::ApplicationsFailed { failed };
        }
        RunOutcome::Success
    }

    /// Runs on the calling thread so nothing else starts until it is done.
    fn run_setup(&self, output: &Sender<OutputRecord>) -> bool {
        let (results, _reports) = unbounded();
        let task = Task::new(
            SETUP_TASK_NAME,
            self.config.common.setup_scripts.clone(),
            output.clone(),
            results,
        );
        let success = run_task(&task);
        info!("Setup phase {}.", if success { "passed" } else { "failed" });
        success
    }

    /// Returns the names of the applications that failed, sorted.
    fn run_applications(&self, output: &Sender<OutputRecord>) -> Vec<String> {
        let (results, reports) = unbounded();
        let tasks: Vec<Task> = self
            .config
            .enabled_applications()
            .into_iter()
            .map(|(name, app)| {
                Task::new(name, app.steps.clone(), output.clone(), results.clone())
            })
            .collect();
        drop(results);

        let pending: BTreeSet<String> = tasks.iter().map(|t| t.name.clone()).collect();
        let workers = self.worker_count().min(pending.len().max(1));
        info!(
            "Running {} applications on {} workers.",
            pending.len(),
            workers
        );

        thread::scope(|scope| {
            scope.spawn(move || {
                if let Err(e) = pool::run(tasks, workers) {
                    error!("Failed to start worker pool: {}", e);
                }
            });
            collect_failures(&reports, pending)
        })
    }
}

/// Blocks until every task in `pending` has finished. A task whose worker
/// went away without reporting counts as failed.
fn collect_failures(
    reports: &Receiver<TaskMessage>,
    mut pending: BTreeSet<String>,
) -> Vec<String> {
    let mut failed = BTreeSet::new();
    while !pending.is_empty() {
        match reports.recv() {
            Ok(TaskMessage::Finished { task, success }) => {
                pending.remove(&task);
                if !success {
                    failed.insert(task);
                }
            }
            Ok(TaskMessage::StepCompleted {
                task,
                step,
                success,
            }) => debug!("Task '{}' step {} success={}", task, step, success),
            Err(_) => {
                warn!(
                    "Result channel closed with {} tasks unaccounted for.",
                    pending.len()
                );
                failed.append(&mut pending);
            }
        }
    }
    failed.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn options(dir: &Path, workers: Option<usize>) -> RunOptions {
        RunOptions {
            procfile: dir.join("Procfile"),
            workers,
            colored: false,
        }
    }

    fn run(raw: &str, dir: &Path, workers: Option<usize>) -> (Orchestrator, RunOutcome, String) {
        let config: Config = raw.parse().unwrap();
        let mut orchestrator = Orchestrator::new(config, options(dir, workers));
        let (writer, captured) = SharedBuf::new();
        let outcome = orchestrator.run(writer).unwrap();
        let text = String::from_utf8(captured.lock().unwrap().clone()).unwrap();
        (orchestrator, outcome, text)
    }

    #[derive(Clone)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn new() -> (Self, std::sync::Arc<std::sync::Mutex<Vec<u8>>>) {
            let inner = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
            (SharedBuf(inner.clone()), inner)
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_success_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, outcome, text) = run(
            r#"
[common]
setup_scripts = ["echo setup"]
workers = 1

[applications.web]
steps = ["true"]
command = "bin/web"
"#,
            dir.path(),
            None,
        );
        assert_eq!(outcome, RunOutcome::Success);
        assert_eq!(orchestrator.phase(), Phase::WritingManifest);
        assert!(text.contains("common setup | setup"));
        assert_eq!(
            fs::read_to_string(dir.path().join("Procfile")).unwrap(),
            "web: bin/web\n"
        );
    }

    #[test]
    fn test_setup_failure_skips_applications() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let raw = format!(
            "[common]\nsetup_scripts = [\"false\"]\n\n[applications.web]\nsteps = [\"touch {}\"]\ncommand = \"bin/web\"\n",
            marker.display()
        );
        let (orchestrator, outcome, _) = run(&raw, dir.path(), None);
        assert_eq!(outcome, RunOutcome::SetupFailed);
        assert_eq!(orchestrator.phase(), Phase::SetupFailed);
        assert!(!marker.exists());
        assert!(!dir.path().join("Procfile").exists());
    }

    #[test]
    fn test_application_failure_waits_for_all_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let (orchestrator, outcome, text) = run(
            r#"
[applications.bad]
steps = ["echo before", "false", "echo never"]
command = "bin/bad"

[applications.good]
steps = ["sleep 0.2", "echo done"]
command = "bin/good"

[applications.off]
steps = ["false"]
command = "bin/off"
enabled = false
"#,
            dir.path(),
            Some(2),
        );
        assert_eq!(
            outcome,
            RunOutcome::ApplicationsFailed {
                failed: vec!["bad".to_string()]
            }
        );
        assert_eq!(orchestrator.phase(), Phase::ApplicationsFailed);
        assert!(text.contains("good | done"));
        let failure = "| ERROR has occurred: exit status 1";
        let is_bad_failure = |l: &str| l.starts_with("bad ") && l.ends_with(failure);
        assert!(text.lines().any(is_bad_failure));
        assert!(!text.contains("never"));
        assert!(!text.contains("off"));
        assert!(!dir.path().join("Procfile").exists());
    }

    #[test]
    fn test_empty_applications_still_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let (_, outcome, text) = run(
            "[applications.idle]\ncommand = \"bin/idle\"\n",
            dir.path(),
            None,
        );
        assert_eq!(outcome, RunOutcome::Success);
        assert!(text.is_empty());
        assert_eq!(
            fs::read_to_string(dir.path().join("Procfile")).unwrap(),
            "idle: bin/idle\n"
        );
    }

    #[test]
    fn test_worker_count_far_above_task_count() {
        let dir = tempfile::tempdir().unwrap();
        let (_, outcome, text) = run(
            "[common]\nworkers = 20000\n\n[applications.web]\nsteps = [\"echo hi\"]\ncommand = \"bin/web\"\n",
            dir.path(),
            None,
        );
        assert_eq!(outcome, RunOutcome::Success);
        assert!(text.contains("web | hi"));
        assert_eq!(
            fs::read_to_string(dir.path().join("Procfile")).unwrap(),
            "web: bin/web\n"
        );
    }
}
