//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a finished regression as a single self-contained HTML page with
//! `maud`: summary counters on top, one table row per test, and the captured
//! output of failing tests in collapsible blocks.
//!
//! 使用 `maud` 将已完成的回归渲染为单个独立 HTML 页面：顶部是汇总计数，
//! 每个测试一行，失败测试的输出放在可折叠块中。

use anyhow::Result;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;

use crate::core::models::{TestResult, TestStatus};
use crate::core::regression::Regression;
use crate::core::test::Test;
use crate::infra::t;
use crate::reporting::files::write_atomically;

const HTML_STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 2em; color: #24292e; }
h1 { font-weight: 600; }
.summary-container { display: flex; gap: 1.5em; margin-bottom: 1.5em; }
.summary-item { display: flex; flex-direction: column; align-items: center; padding: 0.8em 1.4em; border: 1px solid #e1e4e8; border-radius: 6px; }
.count { font-size: 1.8em; font-weight: 600; }
.label { color: #586069; }
table { border-collapse: collapse; width: 100%; }
th, td { text-align: left; padding: 0.5em 0.8em; border-bottom: 1px solid #e1e4e8; vertical-align: top; }
td.command { font-family: monospace; font-size: 0.9em; word-break: break-all; }
.passed { color: #22863a; }
.failed { color: #cb2431; }
.terminated { color: #b08800; }
.not-applicable { color: #6a737d; }
pre.output-content { background: #f6f8fa; padding: 1em; overflow-x: auto; max-height: 30em; }
"#;

fn result_class(test: &Test) -> &'static str {
    match (test.result(), test.status()) {
        (TestResult::Passed, _) => "passed",
        (TestResult::Failed, TestStatus::Terminated) => "terminated",
        (TestResult::Failed, _) => "failed",
        (TestResult::NotApplicable, _) => "not-applicable",
    }
}

fn summary_item(count: usize, class: &str, label: &str) -> Markup {
    html! {
        div class="summary-item" {
            span class={ "count " (class) } { (count) }
            span class="label" { (label) }
        }
    }
}

/// Renders the report page.
pub fn render_html_report(regression: &Regression, locale: &str) -> Markup {
    let passed = regression.passed().count();
    let failed = regression.len() - passed;
    let verdict = regression.result().label(locale);

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale, name = regression.name())) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale, name = regression.name())) }
                p { (t!("summary.result", locale = locale, result = verdict)) }
                div class="summary-container" {
                    (summary_item(regression.len(), "", &t!("html_report.summary.total", locale = locale)))
                    (summary_item(passed, "passed", &t!("html_report.summary.passed", locale = locale)))
                    (summary_item(failed, "failed", &t!("html_report.summary.failed", locale = locale)))
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.name", locale = locale)) }
                            th { (t!("html_report.table.result", locale = locale)) }
                            th { (t!("html_report.table.status", locale = locale)) }
                            th { (t!("html_report.table.duration", locale = locale)) }
                            th { (t!("html_report.table.command", locale = locale)) }
                        }
                    }
                    tbody {
                        @for (key, test) in regression.iter() {
                            tr {
                                td { (key) }
                                td class=(result_class(test)) { (test.result().label(locale)) }
                                td { (test.status().label(locale)) }
                                td {
                                    @if let Some(duration) = test.duration() {
                                        (format!("{:.2}s", duration.as_secs_f64()))
                                    } @else {
                                        "N/A"
                                    }
                                }
                                td class="command" {
                                    (test.command().line())
                                    @if let Some(output) = test.output().filter(|o| !test.passed() && !o.is_empty()) {
                                        details {
                                            summary { (t!("html_report.toggle_output", locale = locale)) }
                                            pre class="output-content" { (output.combined()) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Writes the HTML report of a finished regression to `output_path`.
pub fn generate_html_report(regression: &Regression, output_path: &Path, locale: &str) -> Result<()> {
    let page = render_html_report(regression, locale);
    write_atomically(output_path, page.into_string().as_bytes())
}
