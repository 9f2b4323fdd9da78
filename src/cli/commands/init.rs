//! # Init Command Module / 初始化命令模块
//!
//! Implements `rgr init`, which writes a starter `Regression.toml`. In a
//! terminal a short wizard asks for the values that differ most between
//! setups; with `--non-interactive` the defaults are written as-is.
//!
//! 实现 `rgr init`，生成初始的 `Regression.toml`。在终端中会通过简短的向导询问
//! 最常需要修改的值；使用 `--non-interactive` 时直接写入默认值。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::path::Path;

use crate::core::config::{RegressionConfig, default_run_limit};
use crate::infra::t;
use crate::reporting::files::write_atomically;

const CONFIG_HEADER: &str = "# Regression runner configuration / 回归运行器配置\n\
# run_limit: tests running at the same time / 同时运行的测试数量\n\
# timeout_secs: per-test time limit / 单个测试的时间上限\n\
# [classifier]: read PPPP/FFFF verdict markers from stdout or a log file\n\n";

/// Options of the `init` command.
#[derive(Debug, Clone)]
pub struct InitArgs<'a> {
    pub output: &'a Path,
    pub force: bool,
    pub non_interactive: bool,
}

/// Builds the configuration written by a non-interactive `init`.
pub fn default_config(language: &str) -> RegressionConfig {
    let mut config = RegressionConfig {
        language: Some(language.to_string()),
        ..RegressionConfig::default()
    };
    config.regression.run_limit = Some(default_run_limit().get());
    config.regression.kill_grace_secs = Some(5);
    config
}

/// Runs the init command.
///
/// An existing file is only replaced with `--force` or after confirmation.
pub fn execute(args: InitArgs<'_>, language: &str) -> Result<()> {
    let theme = ColorfulTheme::default();
    let path = args.output;

    if !args.non_interactive {
        println!("\n{}", t!("init.welcome", locale = language).cyan().bold());
    }

    if path.exists() && !args.force {
        if args.non_interactive {
            println!(
                "{}",
                t!("init.file_exists", locale = language, path = path.display()).red()
            );
            println!("{}", t!("init.use_force", locale = language).yellow());
            return Ok(());
        }
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = path.display()))
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
        if !overwrite {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let mut config = default_config(language);
    if !args.non_interactive {
        let run_limit: usize = Input::with_theme(&theme)
            .with_prompt(t!("init.run_limit_prompt", locale = language))
            .default(default_run_limit().get())
            .interact_text()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
        config.regression.run_limit = Some(run_limit.max(1));

        let directory: String = Input::with_theme(&theme)
            .with_prompt(t!("init.report_dir_prompt", locale = language))
            .default(config.report.directory.clone())
            .interact_text()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
        config.report.directory = directory;

        config.classifier.enabled = Confirm::with_theme(&theme)
            .with_prompt(t!("init.classifier_prompt", locale = language))
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;

        config.regression.fail_fast = Confirm::with_theme(&theme)
            .with_prompt(t!("init.fail_fast_prompt", locale = language))
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
    }

    write_config(path, &config, language)
}

fn write_config(path: &Path, config: &RegressionConfig, language: &str) -> Result<()> {
    let body = toml::to_string_pretty(config)
        .context(t!("init.serialize_failed", locale = language).to_string())?;
    let contents = format!("{CONFIG_HEADER}{body}");

    write_atomically(path, contents.as_bytes())
        .with_context(|| t!("init.write_failed", locale = language, path = path.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", locale = language, path = path.display()).bold()
    );
    println!("{}", t!("init.next_steps", locale = language));
    Ok(())
}
