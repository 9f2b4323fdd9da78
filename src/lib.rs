//! # Regression Runner Library / 回归运行器库
//!
//! Runs verification regressions: lists of shell test commands executed as
//! child processes with bounded parallelism, live progress, interactive
//! process control and an aggregate pass/fail verdict.
//!
//! 运行验证回归：以有界并行度将一组 shell 测试命令作为子进程执行，
//! 支持实时进度、交互式进程控制以及汇总的通过/失败结论。
//!
//! ## Modules / 模块
//!
//! - `core` - Commands, tests, the scheduling pipeline and regressions
//! - `infra` - Process spawning and file system helpers
//! - `reporting` - Console output, result files and reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 命令、测试、调度流水线和回归
//! - `infra` - 进程派生和文件系统辅助功能
//! - `reporting` - 控制台输出、结果文件和报告
//! - `cli` - 命令行接口和命令
//!
//! ## Example / 示例
//!
//! ```no_run
//! use regression_runner::core::{Regression, RunOptions, TestResult};
//!
//! # async fn demo() -> Result<(), regression_runner::core::RegressionError> {
//! let lines = ["sh -c 'exit 0' --test chip/smoke", "sh -c 'exit 1' --test chip/link"];
//! let regression =
//!     Regression::from_lines_with_options("nightly", lines, RunOptions::default().with_run_limit(2));
//! let result = regression.start().await?;
//! assert_eq!(result, TestResult::Failed);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::models;
pub use crate::core::regression::Regression;
pub use crate::core::test::Test;

/// Selects the output language and returns it.
///
/// `preferred` (from `--lang` or the config file) wins when a catalogue for it
/// exists; otherwise the system locale is used. Both are matched on the full
/// tag first (e.g. "zh-CN"), then on the language part (e.g. "en"), falling
/// back to "en".
pub fn select_locale(preferred: Option<&str>) -> String {
    let available_locales = rust_i18n::available_locales!();
    let matches = |locale: &str| -> Option<String> {
        if available_locales.contains(&locale) {
            return Some(locale.to_string());
        }
        locale
            .split(['-', '_'])
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .map(str::to_string)
    };

    let lang = preferred
        .and_then(matches)
        .or_else(|| sys_locale::get_locale().as_deref().and_then(matches))
        .unwrap_or_else(|| "en".to_string());

    rust_i18n::set_locale(&lang);
    lang
}

/// Initializes the application's internationalization (i18n) based on the system locale.
pub fn init() {
    select_locale(None);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
