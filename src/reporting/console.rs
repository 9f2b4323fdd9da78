//! # Console Reporting Module / 控制台报告模块
//!
//! Live progress line, end-of-run summary table, and failure details, printed
//! in colour with internationalised labels.
//!
//! 实时进度行、运行结束后的摘要表格以及失败详情，带颜色与国际化标签输出。

use colored::*;
use std::io::Write;

use crate::core::models::{Progress, RegressionResult, TestResult, TestStatus};
use crate::core::regression::Regression;
use crate::core::test::Test;
use crate::infra::t;

/// Formats one progress sample as a single line.
///
/// ```text
/// [ 3/5] running 2 | pending 0 | passed 2 | failed 1 | 1.2s
/// ```
pub fn render_progress(progress: &Progress, locale: &str) -> String {
    let width = progress.total.to_string().len();
    let elapsed = format!("{:.1}s", progress.elapsed.as_secs_f64());
    format!(
        "[{:>width$}/{}] {}",
        progress.done,
        progress.total,
        t!(
            "progress.line",
            locale = locale,
            running = progress.running,
            pending = progress.pending,
            passed = progress.passed,
            failed = progress.failed,
            elapsed = elapsed
        ),
    )
}

/// Rewrites the current terminal line with the given progress sample.
pub fn print_progress(progress: &Progress, locale: &str) {
    let mut stdout = std::io::stdout().lock();
    // Progress is cosmetic; a closed stdout must not abort the run.
    let _ = write!(stdout, "\r{}", render_progress(progress, locale).cyan());
    let _ = stdout.flush();
}

fn colored_result(test: &Test, locale: &str) -> ColoredString {
    let label = test.result().label(locale);
    match test.result() {
        TestResult::Passed => label.green(),
        TestResult::Failed if test.status() == TestStatus::Terminated => label.yellow(),
        TestResult::Failed => label.red(),
        TestResult::NotApplicable => label.dimmed(),
    }
}

/// Prints one row per test followed by the aggregate verdict.
///
/// ```text
/// --- Regression Summary: nightly ---
///   - Passed     | Finished   | smoke_reset                     |      1.23s
///   - Failed     | Terminated | pcie_link                       |      0.45s
/// ```
pub fn print_summary(regression: &Regression, locale: &str) {
    println!(
        "\n{}",
        t!("summary.banner", locale = locale, name = regression.name()).bold()
    );

    for (key, test) in regression.iter() {
        let duration = test
            .duration()
            .map(|d| format!("{:.2}s", d.as_secs_f64()))
            .unwrap_or_else(|| "N/A".to_string());
        let timed_out = if test.timed_out() {
            format!(" ({})", t!("summary.timed_out", locale = locale))
        } else {
            String::new()
        };
        println!(
            "  - {:<10} | {:<10} | {:<32} | {:>10}{}",
            colored_result(test, locale),
            test.status().label(locale),
            key,
            duration,
            timed_out
        );
    }

    let passed = regression.passed().count();
    let failed = regression.len() - passed;
    println!(
        "\n{}",
        t!(
            "summary.counts",
            locale = locale,
            total = regression.len(),
            passed = passed,
            failed = failed
        )
    );
    print_result_banner(regression.result(), locale);
}

pub fn print_result_banner(result: RegressionResult, locale: &str) {
    let verdict = result.label(locale);
    let label = t!("summary.result", locale = locale, result = verdict);
    match result {
        TestResult::Passed => println!("{}", label.green().bold()),
        TestResult::Failed => println!("{}", label.red().bold()),
        TestResult::NotApplicable => println!("{}", label.dimmed()),
    }
}

/// Prints the command line, exit code and captured output of every test that
/// did not pass. Tests that never ran are listed without output.
pub fn print_failure_details(regression: &Regression, locale: &str) {
    let failures: Vec<_> = regression
        .iter()
        .filter(|(_, test)| !test.passed())
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("failure.banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, (key, test)) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            t!("failure.header", locale = locale).red(),
            key.cyan()
        );
        println!("  $ {}", test.command());
        match test.exit_code() {
            Some(code) => println!("  {}", t!("failure.exit_code", locale = locale, code = code)),
            None => println!("  {}", t!("failure.not_run", locale = locale).dimmed()),
        }

        match test.output() {
            Some(output) if !output.is_empty() => {
                println!("\n--- {} ---\n", t!("failure.output", locale = locale).yellow());
                println!("{}", output.combined().trim_end());
            }
            Some(_) => println!("  {}", t!("failure.no_output", locale = locale).dimmed()),
            None => {}
        }
        println!("\n{}", "-".repeat(80));
    }
}
