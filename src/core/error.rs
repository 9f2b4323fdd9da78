//! # Error Types / 错误类型
//!
//! Typed errors raised by the scheduling core. Per-test errors never abort a
//! regression on their own; the pipeline logs them and moves the test on to
//! `done` with a failing verdict.
//!
//! 调度核心产生的类型化错误。单个测试的错误本身不会中止回归；
//! 流水线会记录它们，并以失败结果将测试移入 `done`。

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::models::TestStatus;

/// Errors raised by the lifecycle operations of a single test.
#[derive(Debug, Error)]
pub enum TestError {
    /// `start()` was called on a test that is not Idle or Pending.
    #[error("test '{name}' cannot be started: it is already {status}")]
    AlreadyRunning { name: String, status: TestStatus },

    /// `schedule()` was called on a test that is not Idle.
    #[error("test '{name}' cannot be scheduled from status {status}")]
    InvalidState { name: String, status: TestStatus },

    /// The OS process could not be created. Terminal for the test, never retried.
    #[error("failed to spawn test '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("test '{name}' has no process to wait on")]
    NotStarted { name: String },

    #[error("failed while waiting for test '{name}' to exit: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Raised by a result classifier that cannot reach a verdict. The test keeps
/// its exit-code verdict and the error is only logged.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("no pass/fail marker found in the output of '{name}'")]
    Inconclusive { name: String },

    #[error("failed to read log '{}' of '{name}': {source}", path.display())]
    Io {
        name: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Regression-wide failures. Reaching any of these means every live child
/// process has already been signalled to terminate.
#[derive(Debug, Error)]
pub enum RegressionError {
    #[error("regression '{name}' was cancelled ({finished}/{total} tests finished)")]
    Cancelled {
        name: String,
        finished: usize,
        total: usize,
    },

    #[error("regression '{0}' has already been started")]
    AlreadyStarted(String),

    #[error("the {0} queue was closed while the pipeline was still using it")]
    QueueClosed(&'static str),

    #[error("pipeline task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Test(#[from] TestError),
}
