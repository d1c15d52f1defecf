use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::hierarchy::ClickTarget;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub json: bool,     // global --json
    pub root: PathBuf,  // global --root
    pub backend: BackendArg,
}

impl AppContext {
    pub fn color(&self) -> bool {
        !self.no_color && !self.json
    }
}

#[derive(Parser)]
#[command(name = "callscope")]
#[command(about = "Call and include hierarchies for C code bases, backed by cscope and ctags")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Workspace root (tools run here, paths are relative to it)
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Which relation source answers queries
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub backend: BackendArg,

    /// Log debug output to stderr (-vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// cscope when the tools are installed, else the source scanner
    Auto,
    /// cscope/readtags queries; builds missing stores first
    Index,
    /// Regex source scanner, no external tools
    Fallback,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the functions calling a symbol
    Callers(HierarchyArgs),

    /// Show the functions a symbol calls
    Callees(HierarchyArgs),

    /// Show the files including a header
    Includers(IncludersArgs),

    /// Show the headers a file includes
    Includes(IncludesArgs),

    /// Print the kind of a symbol
    Kind(KindArgs),

    /// Build the cscope and ctags stores
    Build(BuildArgs),

    /// Scan sources with the built-in indexer
    Index(IndexArgs),

    /// Check that cscope, ctags and readtags can be found
    Tools,

    /// Initialize a callscope.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct HierarchyArgs {
    /// Symbol name
    #[arg(required_unless_present = "at")]
    pub symbol: Option<String>,

    /// Cursor position instead of a name (format: file.c:LINE[:COL], 1-based)
    #[arg(long, value_name = "FILE:LINE[:COL]", conflicts_with = "symbol")]
    pub at: Option<String>,

    /// Levels to expand
    #[arg(short, long, default_value = "1")]
    pub depth: usize,

    /// Where node locations point (overrides config)
    #[arg(long, value_enum)]
    pub click_target: Option<ClickTarget>,

    /// Omit file names from node details
    #[arg(long)]
    pub no_file_names: bool,
}

#[derive(Debug, Args)]
pub struct IncludersArgs {
    /// Header name, e.g. util.h
    pub header: String,

    /// Levels to expand
    #[arg(short, long, default_value = "1")]
    pub depth: usize,
}

#[derive(Debug, Args)]
pub struct IncludesArgs {
    /// Source or header file, relative to the root
    pub file: PathBuf,

    /// Levels to expand
    #[arg(short, long, default_value = "1")]
    pub depth: usize,
}

#[derive(Debug, Args)]
pub struct KindArgs {
    /// Symbol name
    pub symbol: String,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Rebuild both stores even if they exist
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Write the call graph in Graphviz format to this file
    #[arg(long, value_name = "FILE")]
    pub dot: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
