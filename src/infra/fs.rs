//! # File System Operations Module / 文件系统操作模块
//!
//! Reading regression files and laying out result artifacts on disk.
//! Results of one run go to `<root>/<dd-mm-YYYY>/<HH-MM-SS>_passed.log` and
//! `<root>/<dd-mm-YYYY>/<HH-MM-SS>_failed.log`.
//!
//! 读取回归文件并在磁盘上布置结果文件。

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%d-%m-%Y";
const TIME_FORMAT: &str = "%H-%M-%S";
const PASSED_SUFFIX: &str = "_passed.log";
const FAILED_SUFFIX: &str = "_failed.log";

/// The pair of files a run's results are written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPaths {
    pub passed: PathBuf,
    pub failed: PathBuf,
}

/// Reads a regression file: one shell invocation per line.
///
/// Lines are returned as written; blank lines and comments are left for
/// [`Regression::from_lines`](crate::core::regression::Regression::from_lines)
/// to skip.
pub fn read_regression_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read regression file: {}", path.display()))?;
    Ok(content.lines().map(str::to_string).collect())
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Where the results of a run finished at `now` belong under `root`.
pub fn result_paths(root: &Path, now: DateTime<Local>) -> ResultPaths {
    let dir = root.join(now.format(DATE_FORMAT).to_string());
    paths_for(&dir, &now.format(TIME_FORMAT).to_string())
}

/// Like [`result_paths`], but never names files that already exist: a run
/// finishing in the same second as an earlier one gets a `-002`, `-003`, ...
/// suffix on its stamp.
pub fn unused_result_paths(root: &Path, now: DateTime<Local>) -> ResultPaths {
    let dir = root.join(now.format(DATE_FORMAT).to_string());
    let stamp = now.format(TIME_FORMAT).to_string();
    let mut paths = paths_for(&dir, &stamp);
    let mut attempt = 2;
    while paths.passed.exists() || paths.failed.exists() {
        paths = paths_for(&dir, &format!("{stamp}-{attempt:03}"));
        attempt += 1;
    }
    paths
}

fn paths_for(dir: &Path, stamp: &str) -> ResultPaths {
    ResultPaths {
        passed: dir.join(format!("{stamp}{PASSED_SUFFIX}")),
        failed: dir.join(format!("{stamp}{FAILED_SUFFIX}")),
    }
}

/// Finds the most recent `*_failed.log` under `root`.
///
/// Date directories are ordered by the date they name, files within one day
/// by their `HH-MM-SS` stamp. Entries that do not follow the layout are ignored.
///
/// 查找 `root` 下最近的失败记录文件。
pub fn latest_failed_file(root: &Path) -> Result<Option<PathBuf>> {
    if !root.is_dir() {
        return Ok(None);
    }

    let mut latest: Option<(NaiveDate, String, PathBuf)> = None;
    let days = fs::read_dir(root)
        .with_context(|| format!("Failed to read report directory: {}", root.display()))?;

    for day in days.flatten() {
        let day_name = day.file_name().to_string_lossy().into_owned();
        let Ok(date) = NaiveDate::parse_from_str(&day_name, DATE_FORMAT) else {
            continue;
        };
        let Ok(files) = fs::read_dir(day.path()) else {
            continue;
        };

        for file in files.flatten() {
            let file_name = file.file_name().to_string_lossy().into_owned();
            let Some(stamp) = file_name.strip_suffix(FAILED_SUFFIX) else {
                continue;
            };
            let newer = match &latest {
                Some((best_date, best_stamp, _)) => {
                    (date, stamp) > (*best_date, best_stamp.as_str())
                }
                None => true,
            };
            if newer {
                latest = Some((date, stamp.to_string(), file.path()));
            }
        }
    }

    Ok(latest.map(|(_, _, path)| path))
}
