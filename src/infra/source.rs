//! Source text access for range resolution and kind checks.
//!
//! Index results carry workspace-relative paths; `FsSource` resolves them
//! against the workspace root. `MemorySource` holds text that is not on disk
//! (unsaved editor buffers, fixtures).

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    core::error::HierarchyError,
    infra::{io, line_index::LineIndex},
};

pub trait SourceText
{
    /// Text of the 0-based line `idx` of `path`.
    fn read_line(
        &self,
        path: &Path,
        idx: usize,
    ) -> Result<String, HierarchyError>;

    /// Whole text of `path`.
    fn read_file(
        &self,
        path: &Path,
    ) -> Result<String, HierarchyError>;
}

/// Files under a workspace root.
#[derive(Debug, Clone)]
pub struct FsSource
{
    root: PathBuf,
}

impl FsSource
{
    pub fn new(root: impl Into<PathBuf>) -> Self
    {
        Self { root: root.into() }
    }

    fn resolve(
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
}

impl SourceText for FsSource
{
    fn read_line(
        &self,
        path: &Path,
        idx: usize,
    ) -> Result<String, HierarchyError>
    {
        io::read_line_at(self.resolve(path), idx).map_err(|e| not_found(path, e))
    }

    fn read_file(
        &self,
        path: &Path,
    ) -> Result<String, HierarchyError>
    {
        io::read_file_smart(self.resolve(path))
            .map(|c| {
                c.as_ref()
                    .to_string()
            })
            .map_err(|e| not_found(path, e))
    }
}

/// In-memory file set keyed by workspace-relative path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource
{
    files: HashMap<PathBuf, String>,
}

impl MemorySource
{
    pub fn with_file(
        mut self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Self
    {
        self.insert(path, text);
        self
    }

    pub fn insert(
        &mut self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
    )
    {
        self.files
            .insert(path.into(), text.into());
    }
}

impl SourceText for MemorySource
{
    fn read_line(
        &self,
        path: &Path,
        idx: usize,
    ) -> Result<String, HierarchyError>
    {
        let text = self.read_file(path)?;

        LineIndex::build(&text)
            .line(idx)
            .map(str::to_string)
            .ok_or_else(|| HierarchyError::FileNotFound {
                path: path.to_path_buf(),
                reason: format!("line {} out of range", idx + 1),
            })
    }

    fn read_file(
        &self,
        path: &Path,
    ) -> Result<String, HierarchyError>
    {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| HierarchyError::FileNotFound {
                path: path.to_path_buf(),
                reason: "no such buffer".to_string(),
            })
    }
}

fn not_found(
    path: &Path,
    err: anyhow::Error,
) -> HierarchyError
{
    HierarchyError::FileNotFound { path: path.to_path_buf(), reason: format!("{err:#}") }
}
