//! CLI argument definitions for the tabula tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "tabula",
    version,
    about = "Replay push events against cached grid pages and inspect row trees",
    long_about = "Offline tools for the tabula grid engine.\n\n\
                  `replay` applies a JSON-lines stream of socket events to a cache snapshot\n\
                  and prints every reconciled page. `tree` rebuilds the hierarchy of a flat\n\
                  parent-pointer row list."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Grid settings file (TOML). Defaults apply when omitted.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Apply socket events to a cache snapshot and print the resulting pages.
    Replay(ReplayArgs),

    /// Print the flattened hierarchy of a row list.
    Tree(TreeArgs),
}

#[derive(Parser)]
pub struct ReplayArgs {
    /// Cache snapshot (JSON): resource rules and cached pages.
    #[arg(long = "snapshot", value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Socket events, one `{"event": ..., "payload": ...}` object per line.
    #[arg(long = "events", value_name = "PATH")]
    pub events: PathBuf,

    /// Columns to print for each row (default: id plus the search fields).
    #[arg(long = "columns", value_name = "KEY", value_delimiter = ',')]
    pub columns: Vec<String>,
}

#[derive(Parser)]
pub struct TreeArgs {
    /// Rows (JSON): an array of objects, or a page object with `rows`.
    #[arg(long = "rows", value_name = "PATH")]
    pub rows: PathBuf,

    /// Field holding each row's parent id.
    #[arg(long = "parent-key", value_name = "KEY", default_value = "parentId")]
    pub parent_key: String,

    /// Field holding each row's id.
    #[arg(long = "id-key", value_name = "KEY", default_value = "id")]
    pub id_key: String,

    /// Field shown as the row label.
    #[arg(long = "label", value_name = "KEY", default_value = "name")]
    pub label: String,

    /// Expand every parent instead of following the settings' default.
    #[arg(long = "expand-all")]
    pub expand_all: bool,

    /// Print an indented outline instead of a table.
    #[arg(long = "plain")]
    pub plain: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
