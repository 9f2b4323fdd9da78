//! # Command-Line Interface / 命令行接口
//!
//! The `rgr` front-end: builds the clap command tree with localised help
//! text and dispatches to [`commands`].
//!
//! `rgr` 前端：构建带本地化帮助文本的 clap 命令树，并分发到各子命令。

pub mod commands;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::cli::commands::{init::InitArgs, run::RunArgs};
use crate::core::config::{CONFIG_FILE_NAME, load_config_or_default};
use crate::infra::t;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

/// Language preference: `--lang`, then the `language` of `Regression.toml`
/// in the working directory, then the system locale.
fn resolve_language() -> String {
    let preferred = pre_parse_language().or_else(|| {
        load_config_or_default(std::path::Path::new(CONFIG_FILE_NAME))
            .ok()
            .and_then(|config| config.language)
    });
    crate::select_locale(preferred.as_deref())
}

fn run_args(name: &'static str, locale: &str, input_required: bool) -> Command {
    Command::new(name)
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help(t!("arg.input", locale = locale).to_string())
                .value_name("FILE")
                .required(input_required)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help(t!("arg.output", locale = locale).to_string())
                .value_name("DIR")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("jobs")
                .short('j')
                .long("jobs")
                .help(t!("arg.jobs", locale = locale).to_string())
                .value_name("JOBS")
                .value_parser(clap::value_parser!(usize))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help(t!("arg.config", locale = locale).to_string())
                .value_name("CONFIG")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help(t!("arg.timeout", locale = locale).to_string())
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("fail-fast")
                .long("fail-fast")
                .help(t!("arg.fail_fast", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .help(t!("arg.name", locale = locale).to_string())
                .value_name("NAME")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("html")
                .long("html")
                .help(t!("arg.html", locale = locale).to_string())
                .value_name("HTML")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help(t!("arg.json", locale = locale).to_string())
                .value_name("JSON")
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("no-progress")
                .long("no-progress")
                .help(t!("arg.no_progress", locale = locale).to_string())
                .action(ArgAction::SetTrue),
        )
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("rgr")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help(t!("cli.verbose", locale = locale).to_string())
                .global(true)
                .action(ArgAction::Count),
        )
        .subcommand(
            run_args("run", locale, true).about(t!("cmd.run_about", locale = locale).to_string()),
        )
        .subcommand(
            run_args("rerun", locale, false)
                .about(t!("cmd.rerun_about", locale = locale).to_string()),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd.init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("arg.init_output", locale = locale).to_string())
                        .value_name("PATH")
                        .default_value(CONFIG_FILE_NAME)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help(t!("arg.force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg.non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

/// Parsed command line together with the language chosen for output.
#[derive(Debug)]
pub struct Invocation {
    pub matches: ArgMatches,
    pub locale: String,
}

impl Invocation {
    /// Number of `-v` flags given.
    pub fn verbosity(&self) -> u8 {
        self.matches.get_count("verbose")
    }
}

/// Selects the output language, then parses the command line.
/// Exits the process on `--help`, `--version` or a usage error, as clap does.
pub fn parse_args() -> Invocation {
    let locale = resolve_language();
    let matches = build_cli(&locale).get_matches();
    Invocation { matches, locale }
}

fn parse_run_args(matches: &ArgMatches) -> RunArgs {
    RunArgs {
        input: matches.get_one::<PathBuf>("input").cloned(),
        output: matches.get_one::<String>("output").cloned(),
        jobs: matches.get_one::<usize>("jobs").copied(),
        config: matches.get_one::<PathBuf>("config").cloned(),
        timeout: matches.get_one::<u64>("timeout").copied(),
        fail_fast: matches.get_flag("fail-fast"),
        name: matches.get_one::<String>("name").cloned(),
        html: matches.get_one::<PathBuf>("html").cloned(),
        json: matches.get_one::<PathBuf>("json").cloned(),
        no_progress: matches.get_flag("no-progress"),
    }
}

/// Runs the selected subcommand.
pub async fn process_command(invocation: Invocation) -> Result<()> {
    let locale = invocation.locale.as_str();
    match invocation.matches.subcommand() {
        Some(("run", run_matches)) => {
            commands::run::execute(parse_run_args(run_matches), locale).await
        }
        Some(("rerun", rerun_matches)) => {
            commands::rerun::execute(parse_run_args(rerun_matches), locale).await
        }
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
            let args = InitArgs {
                output: &output,
                force: init_matches.get_flag("force"),
                non_interactive: init_matches.get_flag("non-interactive"),
            };
            commands::init::execute(args, locale)
        }
        // `subcommand_required` makes clap print help for anything else.
        _ => Ok(()),
    }
}
