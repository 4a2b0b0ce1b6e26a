use std::{
    io::{BufRead, BufReader, Read},
    process::{Command, ExitStatus, Stdio},
    thread,
};

use log::{debug, info, warn};

use crate::error::StepError;
use crate::models::{
    message::{RecordKind, TaskMessage},
    task::Task,
};

const SHELL: &str = "sh";

/// Runs every step of `task` in order, stopping at the first failure.
///
/// Each executed step sends a `StepCompleted` report, and the task always ends
/// with exactly one `Finished` report, even when it has no steps at all.
pub fn run_task(task: &Task) -> bool {
    run_task_with_shell(task, SHELL)
}

fn run_task_with_shell(task: &Task, shell: &str) -> bool {
    info!("Starting task '{}'.", task.name);
    for (index, step) in task.steps.iter().enumerate() {
        task.write_line(RecordKind::Info, format!("Running command `{}`", step));
        match run_step(task, shell, step) {
            Ok(()) => {
                task.write_line(RecordKind::Info, "Completed successfully");
                task.report(TaskMessage::StepCompleted {
                    task: task.name.clone(),
                    step: index,
                    success: true,
                });
            }
            Err(e) => {
                warn!("Task '{}' failed at step {}: {}", task.name, index, e);
                task.write_line(RecordKind::Error, format!("ERROR has occurred: {}", e));
                task.report(TaskMessage::StepCompleted {
                    task: task.name.clone(),
                    step: index,
                    success: false,
                });
                task.report(TaskMessage::Finished {
                    task: task.name.clone(),
                    success: false,
                });
                return false;
            }
        }
    }
    info!("Task '{}' completed.", task.name);
    task.report(TaskMessage::Finished {
        task: task.name.clone(),
        success: true,
    });
    true
}

fn run_step(task: &Task, shell: &str, step: &str) -> Result<(), StepError> {
    let mut child = Command::new(shell)
        .arg("-c")
        .arg(step)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| StepError::Spawn {
            command: step.to_string(),
            source,
        })?;
    debug!(
        "Spawned `{}` for '{}' (pid {}).",
        step,
        task.name,
        child.id()
    );

    let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
        (Some(stdout), Some(stderr)) => (stdout, stderr),
        (stdout, _) => {
            let missing = if stdout.is_none() { "stdout" } else { "stderr" };
            let _ = child.kill();
            let _ = child.wait();
            return Err(StepError::MissingPipe(missing));
        }
    };

    // The step is only finished once both pipes are drained.
    let status = thread::scope(|scope| {
        scope.spawn(|| forward_lines(task, stdout, RecordKind::Stdout));
        scope.spawn(|| forward_lines(task, stderr, RecordKind::Stderr));
        child.wait()
    })
    .map_err(StepError::Wait)?;

    check_status(status)
}

fn forward_lines<R: Read>(task: &Task, pipe: R, kind: RecordKind) {
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => task.write_line(kind, trim_line(&buf)),
            Err(e) => {
                warn!("Failed reading output of '{}': {}", task.name, e);
                break;
            }
        }
    }
}

fn trim_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

fn check_status(status: ExitStatus) -> Result<(), StepError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(StepError::ExitCode(code));
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(StepError::Signal(signal));
        }
    }
    Err(StepError::Unknown)
}
