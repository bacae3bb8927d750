//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use dispatch_domain::OutputFormat;
use std::path::PathBuf;

/// Output format flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Human-readable text
    Text,
    /// JSON documents
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => OutputFormat::Text,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for action-dispatch
#[derive(Parser, Debug)]
#[command(name = "action-dispatch")]
#[command(author, version, about = "Schema-validated action dispatch with human confirmation")]
#[command(long_about = r#"
action-dispatch resolves a named action (or alias), validates its arguments,
asks for confirmation when the action moves funds, runs it, and records the
tool call lifecycle (partial-call → call → result) in a conversation thread.

Configuration files are loaded from (in priority order):
1. --config <path>          Explicit config file
2. ./action-dispatch.toml   Project-level config
3. ~/.config/action-dispatch/config.toml   Global config
Environment variables ACTION_DISPATCH_<SECTION>__<KEY> override all files.

Example:
  action-dispatch tools
  action-dispatch call get_balance
  action-dispatch call "send sonic" --args '{"to":"0x…","amount":"1.5"}'
  action-dispatch history <thread-id>
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format (overrides `[output] format`)
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<FormatArg>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// List the actions a planner can call
    Tools {
        /// Print the full JSON Schema of every action
        #[arg(long)]
        schema: bool,
    },

    /// Dispatch one action and record it in a thread
    Call {
        /// Action name or alias
        name: String,

        /// Arguments as a JSON object
        #[arg(short, long, default_value = "{}", value_name = "JSON")]
        args: String,

        /// Thread to record in (a new thread is created when omitted)
        #[arg(short, long, value_name = "THREAD_ID")]
        thread: Option<String>,

        /// Tool call id (generated when omitted)
        #[arg(long, value_name = "ID")]
        tool_call_id: Option<String>,

        /// Accept confirmation prompts without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Replay the invocation history of a thread
    History {
        thread_id: String,
    },

    /// List recorded threads
    Threads {
        /// Only threads owned by this user
        #[arg(long)]
        user: Option<String>,
    },

    /// Close a thread; later calls in it are rejected
    Close {
        thread_id: String,
    },
}
