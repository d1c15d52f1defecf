//! Locations of the external index tools.
//!
//! Paths come from configuration (`~` and `$VAR` are expanded) and are
//! resolved on PATH with `which`. Installing the tools is left to the user.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths
{
    /// Cross-reference engine
    pub cscope: PathBuf,

    /// Tag store builder
    pub ctags: PathBuf,

    /// Tag store reader
    pub readtags: PathBuf,
}

impl Default for ToolPaths
{
    fn default() -> Self
    {
        Self {
            cscope: PathBuf::from("cscope"),
            ctags: PathBuf::from("ctags"),
            readtags: PathBuf::from("readtags"),
        }
    }
}

/// Resolution result for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus
{
    pub name: &'static str,
    pub configured: PathBuf,
    pub resolved: Option<PathBuf>,
}

impl ToolPaths
{
    /// Copy with `~` and environment variables expanded.
    pub fn expanded(&self) -> Self
    {
        Self {
            cscope: expand(&self.cscope),
            ctags: expand(&self.ctags),
            readtags: expand(&self.readtags),
        }
    }

    /// Resolve each tool on PATH (or as given, if it is a path).
    pub fn locate(&self) -> Vec<ToolStatus>
    {
        [("cscope", &self.cscope), ("ctags", &self.ctags), ("readtags", &self.readtags)]
            .into_iter()
            .map(|(name, configured)| {
                let resolved = which::which(configured).ok();
                debug!(tool = name, configured = %configured.display(), found = resolved.is_some());
                ToolStatus { name, configured: configured.clone(), resolved }
            })
            .collect()
    }

    /// True when every tool resolves.
    pub fn all_found(&self) -> bool
    {
        self.locate()
            .iter()
            .all(|s| {
                s.resolved
                    .is_some()
            })
    }
}

fn expand(path: &Path) -> PathBuf
{
    let raw = path.to_string_lossy();

    match shellexpand::full(&raw)
    {
        Ok(s) => PathBuf::from(s.into_owned()),
        Err(_) => PathBuf::from(
            shellexpand::tilde(&raw)
                .into_owned(),
        ),
    }
}
