//! **callscope** - call and include hierarchies for C code bases
//!
//! Answers "who calls / is called by / includes / is included by" from a
//! cscope cross-reference store and a ctags tag store, or from a built-in
//! regex scanner when those tools are not installed.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Command handlers behind the CLI
pub mod cli_ext {
    /// callers, callees, includers, includes, kind
    pub mod hierarchy_cmd;

    /// build, index, tools
    pub mod db_cmd;

    /// Backend selection, progress and cancellation wiring
    pub mod session;
}

/// Hierarchy engine
pub mod core {
    /// Recoverable and reportable failures
    pub mod error;
    pub use error::HierarchyError;

    /// Query output line parsing
    pub mod record;
    pub use record::SymbolRecord;

    /// Tag kind codes and the macro rule
    pub mod kind;
    pub use kind::{SymbolKind, TagEntry, classify};

    /// Token and include-clause ranges
    pub mod range;
    pub use range::{Position, TextRange};

    /// External process seam
    pub mod process;

    pub mod cancel;
    pub use cancel::CancelToken;

    pub mod progress;
    pub use progress::Progress;

    /// Tool and store locations for one workspace
    pub mod workspace;
    pub use workspace::IndexContext;

    /// Relation interface shared by both backends
    pub mod provider;
    pub use provider::RelationProvider;

    /// cscope/readtags query client
    pub mod query;
    pub use query::IndexClient;

    /// Cross-reference and tag store builds
    pub mod database;
    pub use database::{BuildReport, BuildStep, DatabaseManager, DbState};

    /// Call/include graph builder
    pub mod hierarchy;
    pub use hierarchy::{
        CallEdge, ClickTarget, Direction, Expansion, GraphBuilder, HierarchyNode, HierarchyOptions,
        HierarchyTree,
    };

    /// Regex source indexer and its petgraph call graph
    pub mod fallback;
    pub use fallback::{FallbackIndex, FallbackIndexer, FunctionRecord};

    /// Tree and JSON output
    pub mod render;
}

/// Infrastructure - configuration, file access and tool discovery
pub mod infra {
    /// Layered configuration with TOML defaults
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use io::{FileContent, read_file_smart};

    /// CRLF/LF-robust line indexing
    pub mod line_index;
    pub use line_index::LineIndex;

    /// Source text accessors (disk and in-memory)
    pub mod source;
    pub use source::{FsSource, MemorySource, SourceText};

    /// Gitignore-aware source file walking
    pub mod walk;
    pub use walk::SourceWalker;

    /// External tool lookup on PATH
    pub mod tools;
    pub use tools::ToolPaths;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, load_config};
