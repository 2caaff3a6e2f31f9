//! tabula command-line tool.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tabula_cli::commands::{TreeOptions, load_settings, run_replay, run_tree};
use tabula_cli::logging::{LogConfig, LogFormat, init_logging};
use tabula_cli::render::{default_columns, print_replay, tree_outline, tree_table};
use tracing::level_filters::LevelFilter;

mod cli;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, ReplayArgs, TreeArgs};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let result = match &cli.command {
        Command::Replay(args) => replay(&cli, args),
        Command::Tree(args) => tree(&cli, args),
    };
    let exit_code = match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn replay(cli: &Cli, args: &ReplayArgs) -> anyhow::Result<i32> {
    let settings = load_settings(cli.config.as_deref())?;
    let report = run_replay(&args.snapshot, &args.events, &settings)?;
    let columns = if args.columns.is_empty() {
        default_columns(&settings.search_fields)
    } else {
        args.columns.clone()
    };
    print_replay(&report, &columns);
    let failed = report.stats.skipped + report.unreadable.len();
    Ok(if failed > 0 { 1 } else { 0 })
}

fn tree(cli: &Cli, args: &TreeArgs) -> anyhow::Result<i32> {
    let settings = load_settings(cli.config.as_deref())?;
    let options = TreeOptions {
        rows: args.rows.clone(),
        parent_key: args.parent_key.clone(),
        id_key: args.id_key.clone(),
        label: args.label.clone(),
        expand_all: args.expand_all,
    };
    let lines = run_tree(&options, &settings)?;
    if args.plain {
        println!("{}", tree_outline(&lines));
    } else {
        println!("{}", tree_table(&lines));
    }
    Ok(0)
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let level = match cli.log_level {
        Some(LogLevelArg::Error) => LevelFilter::ERROR,
        Some(LogLevelArg::Warn) => LevelFilter::WARN,
        Some(LogLevelArg::Info) => LevelFilter::INFO,
        Some(LogLevelArg::Debug) => LevelFilter::DEBUG,
        Some(LogLevelArg::Trace) => LevelFilter::TRACE,
        None => cli.verbosity.tracing_level_filter(),
    };
    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    let ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    let mut config = LogConfig::default()
        .with_level(level)
        .with_format(format)
        .with_ansi(ansi)
        .with_log_file(cli.log_file.clone());
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    config
}
