//! # Result Classification / 结果判定
//!
//! Hardware simulators often exit with status 0 even when the simulated test
//! failed; the real verdict only shows up in the output or a log file. A
//! [`ResultClassifier`] inspects those artifacts and overrides the exit-code
//! verdict of a finished test.
//!
//! 硬件仿真器即使在测试失败时也常以 0 退出，真正的结论只出现在输出或日志文件中。
//! [`ResultClassifier`] 会检查这些产物并覆盖已完成测试基于退出码的结论。

use std::fs;
use std::path::PathBuf;

use crate::core::command::Command;
use crate::core::error::ClassificationError;
use crate::core::models::{TestOutput, TestResult};

/// Everything a classifier may look at for one finished test.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub name: &'a str,
    pub command: &'a Command,
    pub exit_code: Option<i32>,
    pub output: &'a TestOutput,
}

/// Decides Pass/Fail for a finished test when the exit code alone is not enough.
pub trait ResultClassifier: Send + Sync {
    fn classify(&self, input: &ClassifierInput<'_>) -> Result<TestResult, ClassificationError>;
}

/// Looks for a verdict marker at the start of a line.
///
/// The first line (after trimming) that starts with `pass_marker` or
/// `fail_marker` decides. When `log_flag` is set and the command carries that
/// flag, the named log file is scanned instead of the captured stdout.
///
/// 在行首查找判定标记。第一条以通过或失败标记开头的行决定结果。
/// 若设置了 `log_flag` 且命令带有该标志，则扫描其指定的日志文件而不是标准输出。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClassifier {
    pub pass_marker: String,
    pub fail_marker: String,
    pub log_flag: Option<String>,
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self {
            pass_marker: "PPPP".to_string(),
            fail_marker: "FFFF".to_string(),
            log_flag: None,
        }
    }
}

impl MarkerClassifier {
    pub fn new(pass_marker: impl Into<String>, fail_marker: impl Into<String>) -> Self {
        Self {
            pass_marker: pass_marker.into(),
            fail_marker: fail_marker.into(),
            log_flag: None,
        }
    }

    pub fn with_log_flag(mut self, flag: impl Into<String>) -> Self {
        self.log_flag = Some(flag.into());
        self
    }

    fn scan(&self, text: &str) -> Option<TestResult> {
        text.lines().map(str::trim_start).find_map(|line| {
            if !self.fail_marker.is_empty() && line.starts_with(&self.fail_marker) {
                Some(TestResult::Failed)
            } else if !self.pass_marker.is_empty() && line.starts_with(&self.pass_marker) {
                Some(TestResult::Passed)
            } else {
                None
            }
        })
    }
}

impl ResultClassifier for MarkerClassifier {
    fn classify(&self, input: &ClassifierInput<'_>) -> Result<TestResult, ClassificationError> {
        let log_path = self
            .log_flag
            .as_deref()
            .and_then(|flag| input.command.value_of(flag))
            .map(PathBuf::from);

        let verdict = match log_path {
            Some(path) => {
                let contents = fs::read_to_string(&path).map_err(|source| ClassificationError::Io {
                    name: input.name.to_string(),
                    path: path.clone(),
                    source,
                })?;
                self.scan(&contents)
            }
            None => self.scan(&input.output.stdout),
        };

        verdict.ok_or_else(|| ClassificationError::Inconclusive {
            name: input.name.to_string(),
        })
    }
}
