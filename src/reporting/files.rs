//! # Result Files / 结果文件
//!
//! Line-oriented pass/fail artifacts and a JSON summary of a finished
//! regression. Files are written to a temporary sibling first and then
//! persisted over the destination, so a reader never sees a partial file.
//!
//! 已完成回归的逐行通过/失败文件和 JSON 摘要。文件先写入同目录下的临时文件，
//! 再替换目标文件，读者不会看到写了一半的文件。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::models::{RegressionResult, TestSummary};
use crate::core::regression::Regression;
use crate::infra::fs::{ResultPaths, unused_result_paths};

/// Writes the command line of every passing test to one file and of every
/// other test to the other, in regression order. An earlier run's files
/// with the same stamp are left alone.
///
/// 将通过测试的命令行写入一个文件，其余测试写入另一个文件，顺序与回归一致。
pub fn write_result_files(
    regression: &Regression,
    root: &Path,
    now: DateTime<Local>,
) -> Result<ResultPaths> {
    let paths = unused_result_paths(root, now);

    let passed = join_lines(regression.passed().map(|test| test.command().line()));
    let failed = join_lines(regression.failed().map(|test| test.command().line()));
    write_atomically(&paths.passed, passed.as_bytes())?;
    write_atomically(&paths.failed, failed.as_bytes())?;

    tracing::info!(
        passed = %paths.passed.display(),
        failed = %paths.failed.display(),
        "result files written"
    );
    Ok(paths)
}

fn join_lines<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    lines.fold(String::new(), |mut out, line| {
        out.push_str(line);
        out.push('\n');
        out
    })
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    name: &'a str,
    result: RegressionResult,
    total: usize,
    passed: usize,
    failed: usize,
    run_limit: usize,
    peak_running: usize,
    tests: Vec<TestSummary>,
}

/// Dumps every test's summary plus the aggregate verdict as pretty JSON.
pub fn write_json_summary(regression: &Regression, path: &Path) -> Result<()> {
    let passed = regression.passed().count();
    let summary = JsonSummary {
        name: regression.name(),
        result: regression.result(),
        total: regression.len(),
        passed,
        failed: regression.len() - passed,
        run_limit: regression.run_limit(),
        peak_running: regression.peak_running(),
        tests: regression.summaries(),
    };
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    write_atomically(path, json.as_bytes())
}

/// Writes `contents` to `path` through a temporary file in the same directory.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
