//! Per-workspace settings shared by the query client and the database
//! manager: where the tools live and where the stores are written.

use std::path::{Path, PathBuf};

use crate::infra::tools::ToolPaths;

pub const DEFAULT_CSCOPE_DB: &str = "cscope.out";
pub const DEFAULT_CTAGS_DB: &str = "ctags.out";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexContext
{
    /// Workspace root; tools run here and record paths are relative to it
    pub root: PathBuf,

    /// External tool locations
    pub tools: ToolPaths,

    /// Cross-reference store, relative to `root` unless absolute
    pub cscope_db: PathBuf,

    /// Tag store, relative to `root` unless absolute
    pub ctags_db: PathBuf,
}

impl IndexContext
{
    pub fn new(root: impl Into<PathBuf>) -> Self
    {
        Self {
            root: root.into(),
            tools: ToolPaths::default(),
            cscope_db: PathBuf::from(DEFAULT_CSCOPE_DB),
            ctags_db: PathBuf::from(DEFAULT_CTAGS_DB),
        }
    }

    pub fn with_tools(
        mut self,
        tools: ToolPaths,
    ) -> Self
    {
        self.tools = tools;
        self
    }

    pub fn with_databases(
        mut self,
        cscope_db: impl Into<PathBuf>,
        ctags_db: impl Into<PathBuf>,
    ) -> Self
    {
        self.cscope_db = cscope_db.into();
        self.ctags_db = ctags_db.into();
        self
    }

    /// Absolute location of a store path.
    pub fn resolve(
        &self,
        path: &Path,
    ) -> PathBuf
    {
        if path.is_absolute()
        {
            path.to_path_buf()
        }
        else
        {
            self.root
                .join(path)
        }
    }

    /// Store path as passed to the tools (which run inside `root`).
    pub fn tool_arg(path: &Path) -> String
    {
        path.to_string_lossy()
            .into_owned()
    }
}
