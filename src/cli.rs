//! CLI argument parsing.
//!
//! Subcommands mirror the chat commands; the requesting user is passed
//! explicitly with `--user`.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "platewatch",
    version,
    about = "Register license plates and get weekly traffic-violation reports",
    after_help = "Examples:\n  platewatch check --plate 30A-123.45\n  platewatch register --user 1234567890 --plate 30A12345\n  platewatch list --user 1234567890\n  platewatch remove --user 1234567890 --plate 30A12345\n  platewatch sweep --any-day\n  platewatch serve",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// JSON config file (defaults to the per-user config dir when present)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Registration store path (overrides config and PLATEWATCH_DATA_FILE)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_file: Option<PathBuf>,

    /// Print replies as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Check(CheckArgs),
    Register(RegisterArgs),
    List(ListArgs),
    Remove(RemoveArgs),
    Sweep(SweepArgs),
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Look up violations for a plate")]
pub struct CheckArgs {
    /// Plate text; separators and case are normalized
    #[arg(long)]
    pub plate: String,
}

#[derive(Parser, Debug)]
#[command(about = "Register a plate for weekly checks")]
pub struct RegisterArgs {
    /// Chat user id of the owner
    #[arg(long, value_name = "ID")]
    pub user: u64,

    #[arg(long)]
    pub plate: String,
}

#[derive(Parser, Debug)]
#[command(about = "List plates registered by a user")]
pub struct ListArgs {
    #[arg(long, value_name = "ID")]
    pub user: u64,
}

#[derive(Parser, Debug)]
#[command(about = "Remove one of your registered plates")]
pub struct RemoveArgs {
    #[arg(long, value_name = "ID")]
    pub user: u64,

    #[arg(long)]
    pub plate: String,
}

#[derive(Parser, Debug)]
#[command(about = "Run the violation sweep once")]
pub struct SweepArgs {
    /// Sweep even if today is not the configured sweep day
    #[arg(long)]
    pub any_day: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Run the weekly sweep on schedule until stopped")]
pub struct ServeArgs {}
