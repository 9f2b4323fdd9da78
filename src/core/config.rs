//! # Configuration Module / 配置模块
//!
//! Two layers: [`RegressionConfig`] is what a user writes in
//! `Regression.toml`; [`RunOptions`] is the runtime value handed explicitly to
//! a [`Regression`](crate::core::regression::Regression). The core never
//! reads global settings.
//!
//! 两层配置：[`RegressionConfig`] 对应用户在 `Regression.toml` 中编写的内容；
//! [`RunOptions`] 是显式传给回归的运行时值。核心从不读取全局设置。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::classifier::{MarkerClassifier, ResultClassifier};

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "Regression.toml";

/// Default concurrency: half the logical CPUs plus one.
pub fn default_run_limit() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get() / 2 + 1).unwrap_or(NonZeroUsize::MIN)
}

/// Runtime options of a regression.
/// 回归的运行时选项。
#[derive(Clone)]
pub struct RunOptions {
    /// Maximum number of tests concurrently in the Running state.
    /// 同时处于运行状态的测试数量上限。
    pub run_limit: NonZeroUsize,
    /// Shell used to run each command line (`<shell> -c <line>`).
    pub shell: String,
    pub working_dir: Option<PathBuf>,
    /// Per-test wall-clock limit. On expiry the test is terminated, then killed.
    /// 单个测试的时间上限。超时后先 terminate，再 kill。
    pub test_timeout: Option<Duration>,
    /// How long a terminated process gets before it is killed.
    pub kill_grace: Duration,
    pub progress_interval: Duration,
    /// Stop admitting tests after the first non-passing one.
    pub fail_fast: bool,
    pub classifier: Option<Arc<dyn ResultClassifier>>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_limit: default_run_limit(),
            shell: "/bin/sh".to_string(),
            working_dir: None,
            test_timeout: None,
            kill_grace: Duration::from_secs(5),
            progress_interval: Duration::from_millis(200),
            fail_fast: false,
            classifier: None,
        }
    }
}

impl RunOptions {
    pub fn with_run_limit(mut self, run_limit: usize) -> Self {
        self.run_limit = NonZeroUsize::new(run_limit).unwrap_or(NonZeroUsize::MIN);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.test_timeout = timeout;
        self
    }

    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ResultClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("run_limit", &self.run_limit)
            .field("shell", &self.shell)
            .field("working_dir", &self.working_dir)
            .field("test_timeout", &self.test_timeout)
            .field("kill_grace", &self.kill_grace)
            .field("fail_fast", &self.fail_fast)
            .field("classifier", &self.classifier.is_some())
            .finish_non_exhaustive()
    }
}

/// The whole configuration file.
/// 整个配置文件。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RegressionConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub regression: SchedulingConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub run_limit: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub kill_grace_secs: Option<u64>,
    pub progress_interval_ms: Option<u64>,
    pub shell: Option<String>,
    pub working_dir: Option<PathBuf>,
    pub fail_fast: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Root directory for pass/fail artifacts; `~` and `$VARS` are expanded.
    pub directory: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: "regressions".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub enabled: bool,
    pub pass_marker: String,
    pub fail_marker: String,
    pub log_flag: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let markers = MarkerClassifier::default();
        Self {
            enabled: false,
            pass_marker: markers.pass_marker,
            fail_marker: markers.fail_marker,
            log_flag: None,
        }
    }
}

impl RegressionConfig {
    /// Builds the runtime options described by this file.
    pub fn run_options(&self) -> RunOptions {
        let defaults = RunOptions::default();
        let scheduling = &self.regression;

        let classifier = self.classifier.enabled.then(|| {
            let mut markers =
                MarkerClassifier::new(&self.classifier.pass_marker, &self.classifier.fail_marker);
            markers.log_flag = self.classifier.log_flag.clone();
            Arc::new(markers) as Arc<dyn ResultClassifier>
        });

        RunOptions {
            run_limit: scheduling
                .run_limit
                .and_then(NonZeroUsize::new)
                .unwrap_or(defaults.run_limit),
            shell: scheduling.shell.clone().unwrap_or(defaults.shell),
            working_dir: scheduling.working_dir.clone(),
            test_timeout: scheduling.timeout_secs.map(Duration::from_secs),
            kill_grace: scheduling
                .kill_grace_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.kill_grace),
            progress_interval: scheduling
                .progress_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.progress_interval),
            fail_fast: scheduling.fail_fast,
            classifier,
        }
    }
}

/// Loads and parses a configuration file.
pub fn load_config(path: &Path) -> Result<RegressionConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Loads `path` if it exists, otherwise returns the defaults.
pub fn load_config_or_default(path: &Path) -> Result<RegressionConfig> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(RegressionConfig::default())
    }
}
