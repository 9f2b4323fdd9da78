//! # Reporting Module / 报告模块
//!
//! Everything that happens to a regression's results after `start()` returns:
//! console output, pass/fail files, a JSON summary and an HTML report. None of
//! this is done by the core itself.
//!
//! `start()` 返回后对回归结果的所有处理：控制台输出、通过/失败文件、
//! JSON 摘要以及 HTML 报告。核心本身不做这些事情。

pub mod console;
pub mod files;
pub mod html;

// Re-export common reporting functions
pub use console::{print_failure_details, print_progress, print_summary, render_progress};
pub use files::{write_json_summary, write_result_files};
pub use html::generate_html_report;
