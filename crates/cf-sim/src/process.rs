//! Child processes with a wall-clock limit and output captured to a log file.

use crate::error::{SimError, SimResult, Step};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const LOG_TAIL_LINES: usize = 20;

/// Run `command` to completion, sending stdout and stderr to `log_path`.
///
/// The child is killed once `limit_s` seconds have passed.
pub fn run_logged(
    step: Step,
    command: &mut Command,
    log_path: &Path,
    limit_s: f64,
) -> SimResult<()> {
    let log = File::create(log_path)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(log.try_clone()?))
        .stderr(Stdio::from(log));

    let program = PathBuf::from(command.get_program());
    tracing::debug!(%step, program = %program.display(), "launching");
    let mut child = command.spawn().map_err(|source| SimError::Spawn {
        step,
        program,
        source,
    })?;

    let limit = Duration::try_from_secs_f64(limit_s).unwrap_or(Duration::MAX);
    let deadline = Instant::now().checked_add(limit);
    loop {
        if let Some(status) = child.try_wait()? {
            if status.success() {
                return Ok(());
            }
            return Err(SimError::Failed {
                step,
                status: status.to_string(),
                log_tail: log_tail(log_path),
            });
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            tracing::warn!(%step, limit_s, "time limit reached, killing child");
            // the child may exit between try_wait and kill
            let _ = child.kill();
            let _ = child.wait();
            return Err(SimError::Timeout { step, limit_s });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Last lines of a log file, or an empty string if it cannot be read.
pub fn log_tail(path: &Path) -> String {
    let Ok(text) = fs::read_to_string(path) else {
        return String::new();
    };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(LOG_TAIL_LINES);
    lines[start..].join("\n")
}
