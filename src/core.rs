//! # Core Module / 核心模块
//!
//! The scheduling core of the regression runner: parsed commands, the test
//! lifecycle, the bounded pipeline and the regression that drives it.
//!
//! 回归运行器的调度核心：命令解析、测试生命周期、有界流水线以及驱动它的回归。

pub mod classifier;
pub mod command;
pub mod config;
pub mod error;
pub mod models;
pub(crate) mod pipeline;
pub mod process;
pub mod queue;
pub mod regression;
pub mod test;

// Re-exports
pub use classifier::{ClassifierInput, MarkerClassifier, ResultClassifier};
pub use command::Command;
pub use config::{RegressionConfig, RunOptions};
pub use error::{ClassificationError, RegressionError, TestError};
pub use models::{Progress, RegressionResult, TestResult, TestStatus};
pub use process::{ControlSignal, ControllableProcess};
pub use regression::Regression;
pub use test::Test;
