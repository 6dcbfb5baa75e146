//! Clap derive structures for the `jetdash` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

use jetdash_core::{Source, TargetKind};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// jetdash -- monitoring console for Jetson-class machines
#[derive(Debug, Parser)]
#[command(
    name = "jetdash",
    version,
    about = "Monitor and operate Jetson machines from the command line",
    long_about = "Polls a console backend for the local machine and, when one is\n\
        configured, a remote target: system info, GPU, docker services, power\n\
        mode, hardware sentinel and the LAN device inventory.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Console profile to use
    #[arg(long, short = 'p', env = "JETDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Console backend URL (overrides profile)
    #[arg(long, short = 'c', env = "JETDASH_CONSOLE", global = true)]
    pub console: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "JETDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "JETDASH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "JETDASH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print one consolidated view of both targets
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Keep polling and redraw the view until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Show the merged LAN device inventory
    #[command(alias = "dev")]
    Devices(DevicesArgs),

    /// List and restart docker services
    #[command(alias = "svc")]
    Services(ServicesArgs),

    /// Show or change the power mode
    #[command(alias = "pm")]
    PowerMode(PowerModeArgs),

    /// Reboot a target
    Reboot(RebootArgs),

    /// Thermals, fan and clock controls
    Sentinel(SentinelArgs),

    /// Poll one source now, outside its schedule
    Refresh(RefreshArgs),

    /// Ask the console backend's assistant
    Chat(ChatArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared arguments ─────────────────────────────────────────────────

/// Which machine a command addresses.
#[derive(Debug, Args)]
pub struct TargetArg {
    /// Address the remote target instead of the local machine
    #[arg(long, short = 'r')]
    pub remote: bool,
}

impl TargetArg {
    pub fn kind(&self) -> TargetKind {
        if self.remote {
            TargetKind::Remote
        } else {
            TargetKind::Local
        }
    }
}

/// Waiting behaviour shared by operation commands.
#[derive(Debug, Args)]
pub struct WaitArg {
    /// Wait until the operation is confirmed, fails or times out
    #[arg(long)]
    pub wait: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  STATUS / WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Longest time to wait for first results, in seconds
    #[arg(long, default_value = "15")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Redraw period (e.g. "2s", "500ms")
    #[arg(long, default_value = "2s", value_parser = humantime::parse_duration)]
    pub every: std::time::Duration,

    /// Write logs to this file instead of the terminal
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(flatten)]
    pub target: TargetArg,

    /// Also wait for the first deep scan before printing
    #[arg(long)]
    pub deep: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServicesArgs {
    #[command(subcommand)]
    pub command: ServicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServicesCommand {
    /// List docker services
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        target: TargetArg,
    },

    /// Restart a docker service
    Restart {
        /// Service name
        name: String,

        #[command(flatten)]
        target: TargetArg,

        #[command(flatten)]
        wait: WaitArg,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  POWER MODE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PowerModeArgs {
    #[command(subcommand)]
    pub command: PowerModeCommand,
}

#[derive(Debug, Subcommand)]
pub enum PowerModeCommand {
    /// Show the current mode and the available ones
    Show {
        #[command(flatten)]
        target: TargetArg,
    },

    /// Switch to another mode
    Set {
        /// Mode id (see `power-mode show`)
        id: u32,

        #[command(flatten)]
        target: TargetArg,

        #[command(flatten)]
        wait: WaitArg,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REBOOT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
#[command(group(ArgGroup::new("kind").required(true).args(["hard", "soft"])))]
pub struct RebootArgs {
    /// Full machine reboot
    #[arg(long)]
    pub hard: bool,

    /// Restart the monitoring stack only
    #[arg(long)]
    pub soft: bool,

    #[command(flatten)]
    pub target: TargetArg,

    #[command(flatten)]
    pub wait: WaitArg,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SENTINEL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SentinelArgs {
    #[command(subcommand)]
    pub command: SentinelCommand,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum SentinelCommand {
    /// Show thermals, fan, clocks and swap
    Show {
        #[command(flatten)]
        target: TargetArg,
    },

    /// Pin clocks to maximum (jetson_clocks)
    Turbo {
        state: Toggle,

        #[command(flatten)]
        target: TargetArg,

        #[command(flatten)]
        wait: WaitArg,
    },

    /// Set the fan mode
    Fan {
        /// Fan mode (e.g. "auto", "manual")
        mode: String,

        /// Fan speed in percent (manual mode)
        #[arg(long)]
        speed: Option<u32>,

        #[command(flatten)]
        target: TargetArg,

        #[command(flatten)]
        wait: WaitArg,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REFRESH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Source to poll (system-info, network-fast, network-deep, gpu-info,
    /// docker-services, power-mode, hardware-sentinel)
    #[arg(value_parser = parse_source)]
    pub source: Source,

    #[command(flatten)]
    pub target: TargetArg,
}

fn parse_source(raw: &str) -> Result<Source, String> {
    raw.parse()
        .map_err(|_| format!("unknown source '{raw}'"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CHAT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Prompt text
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,

    /// Create or extend the config file
    Init {
        /// Profile name (prompted when omitted)
        #[arg(long)]
        name: Option<String>,

        /// Console backend URL (prompted when omitted)
        #[arg(long)]
        url: Option<String>,
    },

    /// Display current resolved configuration
    Show,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
