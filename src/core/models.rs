//! # Data Models Module / 数据模型模块
//!
//! This module defines the status and result enums shared by tests and
//! regressions, the captured output of a test process, and the serialisable
//! snapshots used by reporting.
//!
//! 此模块定义测试与回归共享的状态和结果枚举、测试进程的捕获输出，
//! 以及报告使用的可序列化快照。

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::infra::t;

/// Lifecycle state of a single test.
/// 单个测试的生命周期状态。
///
/// ```text
/// Idle -> Pending -> Running -> Finished | Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TestStatus {
    /// Created, not yet admitted into scheduling. / 已创建，尚未进入调度。
    #[default]
    Idle,
    /// Admitted into the pending queue, process not started. / 已进入待运行队列。
    Pending,
    /// The OS process is live. / 操作系统进程正在运行。
    Running,
    /// The process exited on its own. / 进程自行退出。
    Finished,
    /// Spawning failed, or the test was stopped by its own terminate/kill.
    /// 派生失败，或被自身的 terminate/kill 停止。
    Terminated,
}

impl TestStatus {
    /// `Finished` and `Terminated` admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, TestStatus::Finished | TestStatus::Terminated)
    }

    pub fn label(self, locale: &str) -> String {
        match self {
            TestStatus::Idle => t!("status.idle", locale = locale).to_string(),
            TestStatus::Pending => t!("status.pending", locale = locale).to_string(),
            TestStatus::Running => t!("status.running", locale = locale).to_string(),
            TestStatus::Finished => t!("status.finished", locale = locale).to_string(),
            TestStatus::Terminated => t!("status.terminated", locale = locale).to_string(),
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Verdict of a test. Only meaningful once the test is in a terminal state.
/// 测试的判定结果。仅在测试进入终止状态后才有意义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TestResult {
    #[default]
    NotApplicable,
    Passed,
    Failed,
}

impl TestResult {
    /// Exit code 0 passes, anything else (including death by signal) fails.
    pub fn from_exit_code(code: Option<i32>) -> Self {
        match code {
            Some(0) => TestResult::Passed,
            _ => TestResult::Failed,
        }
    }

    pub fn label(self, locale: &str) -> String {
        match self {
            TestResult::NotApplicable => t!("result.not_applicable", locale = locale).to_string(),
            TestResult::Passed => t!("result.passed", locale = locale).to_string(),
            TestResult::Failed => t!("result.failed", locale = locale).to_string(),
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The aggregate verdict of a regression. It shares the shape of a test
/// verdict: `Passed` iff every test passed.
pub type RegressionResult = TestResult;

/// Captured standard streams of a finished test process.
/// 已结束测试进程捕获到的标准输出流。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutput {
    pub stdout: String,
    pub stderr: String,
}

impl TestOutput {
    /// stdout followed by stderr, the way the console failure report shows it.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.trim().is_empty() && self.stderr.trim().is_empty()
    }
}

/// A point-in-time, serialisable record of one test, used by the JSON and
/// HTML reports.
/// 单个测试的可序列化快照，供 JSON 与 HTML 报告使用。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub id: u64,
    pub name: String,
    pub command: String,
    pub status: TestStatus,
    pub result: TestResult,
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
    pub duration: Option<Duration>,
}

/// One sample taken by the progress reporter.
/// 进度报告器采集的一次样本。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.done >= self.total
    }
}
