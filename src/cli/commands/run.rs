//! # Run Command Module / 运行命令模块
//!
//! Implements `rgr run`: reads a regression file, runs it with live progress,
//! then writes the pass/fail files and optional reports.
//!
//! 实现 `rgr run`：读取回归文件，运行并显示实时进度，然后写入通过/失败文件以及可选的报告。
//!
//! While a regression runs, Ctrl-C cancels it. On Unix, `SIGUSR1` suspends
//! every running test and `SIGUSR2` resumes them.

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;

use crate::core::config::{CONFIG_FILE_NAME, RegressionConfig, RunOptions, load_config_or_default};
use crate::core::error::RegressionError;
use crate::core::models::TestResult;
use crate::core::process::ControllableProcess;
use crate::core::regression::Regression;
use crate::infra::fs::{expand_path, read_regression_file};
use crate::infra::t;
use crate::reporting::{
    console::{print_failure_details, print_progress, print_summary},
    files::{write_json_summary, write_result_files},
    html::generate_html_report,
};

/// Options of the `run` and `rerun` commands. Flags override the
/// configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    /// The regression file. Required by `run`; `rerun` falls back to the
    /// latest failure list.
    pub input: Option<PathBuf>,
    pub output: Option<String>,
    pub jobs: Option<usize>,
    pub config: Option<PathBuf>,
    pub timeout: Option<u64>,
    pub fail_fast: bool,
    pub name: Option<String>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub no_progress: bool,
}

impl RunArgs {
    /// Applies command-line overrides on top of the file configuration.
    pub fn run_options(&self, config: &RegressionConfig) -> RunOptions {
        let mut options = config.run_options();
        if let Some(jobs) = self.jobs {
            options = options.with_run_limit(jobs);
        }
        if let Some(secs) = self.timeout {
            options = options.with_timeout(Some(Duration::from_secs(secs)));
        }
        if self.fail_fast {
            options = options.with_fail_fast(true);
        }
        options
    }

    /// Directory the pass/fail files go to: `--output`, else the config.
    pub fn report_dir(&self, config: &RegressionConfig) -> Result<PathBuf> {
        expand_path(self.output.as_deref().unwrap_or(&config.report.directory))
    }
}

/// Loads `--config`, or `Regression.toml` from the working directory if present.
pub fn load_run_config(config: Option<&Path>) -> Result<RegressionConfig> {
    match config {
        Some(path) => crate::core::config::load_config(path),
        None => load_config_or_default(Path::new(CONFIG_FILE_NAME)),
    }
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `Ok(())` only if every test passed. A failed or cancelled regression is
/// reported as an error so that the process exits with a failure code.
pub async fn execute(args: RunArgs, locale: &str) -> Result<()> {
    let config = load_run_config(args.config.as_deref())?;
    let Some(input) = args.input.clone() else {
        anyhow::bail!(t!("run.no_input", locale = locale).to_string());
    };

    let lines = read_regression_file(&input)?;
    let name = args
        .name
        .clone()
        .or_else(|| input.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "regression".to_string());
    let options = args.run_options(&config);
    let report_dir = args.report_dir(&config)?;

    let regression = Arc::new(Regression::from_lines_with_options(name, lines, options));

    println!(
        "{}",
        t!("run.loading", locale = locale, path = input.display())
    );
    println!(
        "{}",
        t!(
            "run.starting",
            locale = locale,
            name = regression.name().yellow(),
            count = regression.len(),
            limit = regression.run_limit()
        )
        .bold()
    );

    let handlers = setup_signal_handlers(Arc::clone(&regression), locale);
    let progress = (!args.no_progress).then(|| spawn_progress(&regression, locale));

    let outcome = regression.start().await;

    for handle in handlers.into_iter().chain(progress) {
        handle.abort();
    }
    if !args.no_progress {
        let last = *regression.subscribe_progress().borrow();
        print_progress(&last, locale);
        println!();
    }

    let paths = write_result_files(&regression, &report_dir, chrono::Local::now())
        .context(t!("run.write_results_failed", locale = locale).to_string())?;
    println!(
        "{}",
        t!(
            "run.results_written",
            locale = locale,
            passed = paths.passed.display(),
            failed = paths.failed.display()
        )
    );

    print_summary(&regression, locale);

    if let Some(report_path) = &args.html {
        println!(
            "\n{}",
            t!("run.html_report", locale = locale, path = report_path.display())
        );
        if let Err(e) = generate_html_report(&regression, report_path, locale) {
            eprintln!("{} {:#}", t!("run.html_failed", locale = locale).red(), e);
        }
    }
    if let Some(json_path) = &args.json {
        if let Err(e) = write_json_summary(&regression, json_path) {
            eprintln!("{} {:#}", t!("run.json_failed", locale = locale).red(), e);
        }
    }

    match outcome {
        Ok(TestResult::Passed) => {
            println!("\n{}", t!("run.all_passed", locale = locale).green().bold());
            Ok(())
        }
        Ok(_) => {
            print_failure_details(&regression, locale);
            anyhow::bail!(t!("run.regression_failed", locale = locale).to_string())
        }
        Err(error @ RegressionError::Cancelled { .. }) => {
            print_failure_details(&regression, locale);
            Err(error).context(t!("run.cancelled", locale = locale).to_string())
        }
        Err(error) => Err(error).context(t!("run.aborted", locale = locale).to_string()),
    }
}

/// Renders every progress sample the regression publishes on one line.
fn spawn_progress(regression: &Regression, locale: &str) -> JoinHandle<()> {
    let mut samples = regression.subscribe_progress();
    let locale = locale.to_string();
    tokio::spawn(async move {
        while samples.changed().await.is_ok() {
            let progress = *samples.borrow_and_update();
            print_progress(&progress, &locale);
            if progress.is_complete() {
                break;
            }
        }
    })
}

/// Installs the interactive controls: Ctrl-C cancels the regression, and on
/// Unix `SIGUSR1`/`SIGUSR2` suspend and resume its running tests.
fn setup_signal_handlers(regression: Arc<Regression>, locale: &str) -> Vec<JoinHandle<()>> {
    let mut handlers = Vec::new();

    let token = regression.cancellation_token();
    let message = t!("run.shutdown_signal", locale = locale).to_string();
    handlers.push(tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", message.yellow());
                token.cancel();
            }
            Err(error) => tracing::warn!(%error, "failed to listen for Ctrl-C"),
        }
    }));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal as unix_signal};

        let controls: [(SignalKind, fn(&Regression), String); 2] = [
            (
                SignalKind::user_defined1(),
                |regression| regression.suspend(),
                t!("run.suspended", locale = locale).to_string(),
            ),
            (
                SignalKind::user_defined2(),
                |regression| regression.resume(),
                t!("run.resumed", locale = locale).to_string(),
            ),
        ];

        for (kind, action, message) in controls {
            let mut stream = match unix_signal(kind) {
                Ok(stream) => stream,
                Err(error) => {
                    tracing::warn!(%error, "failed to install signal handler");
                    continue;
                }
            };
            let regression = Arc::clone(&regression);
            handlers.push(tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    println!("\n{}", message.cyan());
                    action(&regression);
                }
            }));
        }
    }

    handlers
}
