// Shared test helpers for integration tests
#![allow(dead_code)]

use regression_runner::core::config::RunOptions;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// A shell line that runs `script` and carries `--test suite/<name>` in a
/// trailing comment, so the shell ignores the flag but the test is named.
pub fn line(script: &str, name: &str) -> String {
    format!("{script} # --test suite/{name}")
}

/// Options tuned for fast tests: short grace period, fast progress sampling.
pub fn fast_options(run_limit: usize) -> RunOptions {
    RunOptions::default()
        .with_run_limit(run_limit)
        .with_kill_grace(Duration::from_millis(500))
        .with_progress_interval(Duration::from_millis(10))
}

/// Whether a process with this pid still runs. A zombie counts as dead:
/// processes orphaned by a test shell are reaped by init, not by the runner,
/// and may linger briefly in that state.
pub fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    if kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_none_or(|state| state != "Z"),
        Err(_) => true,
    }
}

/// Writes a regression file with the given lines and returns its path.
pub fn write_regression(temp_dir: &TempDir, file_name: &str, lines: &[String]) -> PathBuf {
    let path = temp_dir.path().join(file_name);
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content).expect("Failed to write regression file");
    path
}

/// All files below `dir` whose name ends with `suffix`.
pub fn find_files(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(find_files(&path, suffix));
        } else if path.to_string_lossy().ends_with(suffix) {
            found.push(path);
        }
    }
    found.sort();
    found
}

/// Polls `condition` every 10ms until it holds or `limit` expires.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
