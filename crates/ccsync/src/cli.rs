//! Clap derive structures for the `ccsync` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ccsync -- declarative site and IP pool provisioning for Catalyst Center
#[derive(Debug, Parser)]
#[command(
    name = "ccsync",
    version,
    about = "Reconcile Catalyst Center sites and IP pools from a manifest",
    long_about = "Creates and deletes site hierarchy nodes (areas, buildings, floors),\n\
        global IP pools, and pool reservations so that the controller matches\n\
        a declarative manifest. Every mutation is tracked until the controller\n\
        task settles.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "CCSYNC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller address (overrides profile)
    #[arg(long, short = 'c', env = "CCSYNC_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Login name (overrides profile)
    #[arg(long, short = 'u', env = "CCSYNC_USERNAME", global = true)]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "CCSYNC_PASSWORD", global = true, hide_env = true)]
    pub password: Option<String>,

    /// Credential file with CC_IP / CC_USERNAME / CC_PASSWORD keys
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub cc_env: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CCSYNC_OUTPUT",
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
    #[arg(long, short = 'k', env = "CCSYNC_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "CCSYNC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// How long to wait for one controller task, in seconds
    #[arg(long, env = "CCSYNC_TASK_TIMEOUT", global = true)]
    pub task_timeout: Option<u64>,
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
    /// Create every resource in the manifest that the controller lacks
    Create(ManifestArgs),

    /// Delete every resource in the manifest, dependents first
    #[command(alias = "rm")]
    Delete(DeleteArgs),

    /// Show what the controller currently has
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Print the ordered plan for a manifest without contacting the controller
    Plan(PlanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Desired-state manifest (.yaml, .yml, .toml or .json)
    #[arg(value_name = "MANIFEST")]
    pub manifest: PathBuf,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Delete without prompting
    #[arg(long, short = 'f')]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show one kind of resource
    #[arg(long, value_enum)]
    pub kind: Option<StatusKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusKind {
    Pools,
    Sites,
    Reservations,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,

    /// Show the deletion order instead of the creation order
    #[arg(long)]
    pub delete: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
