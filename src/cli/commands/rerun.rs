//! # Rerun Command Module / 重跑命令模块
//!
//! `rgr rerun` runs the most recent failure list again. Without `--input` it
//! looks for the newest `*_failed.log` under the report directory.
//!
//! `rgr rerun` 重新运行最近一次的失败列表。未指定 `--input` 时，
//! 会在报告目录下查找最新的 `*_failed.log`。

use anyhow::Result;
use colored::*;

use crate::cli::commands::run::{self, RunArgs, load_run_config};
use crate::infra::fs::latest_failed_file;
use crate::infra::t;

pub async fn execute(mut args: RunArgs, locale: &str) -> Result<()> {
    if args.input.is_none() {
        let config = load_run_config(args.config.as_deref())?;
        let report_dir = args.report_dir(&config)?;
        match latest_failed_file(&report_dir)? {
            Some(path) => {
                println!(
                    "{}",
                    t!("rerun.found", locale = locale, path = path.display()).cyan()
                );
                args.input = Some(path);
            }
            None => {
                println!(
                    "{}",
                    t!("rerun.nothing", locale = locale, path = report_dir.display()).yellow()
                );
                return Ok(());
            }
        }
    }

    if args.name.is_none() {
        args.name = Some("rerun".to_string());
    }
    run::execute(args, locale).await
}
