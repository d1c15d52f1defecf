//! Source file enumeration for the fallback indexer.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs prune directories early and filter files late
//! - Only files whose extension is in the configured set are returned
//! - Sorted output, so indexing order and progress are deterministic
//!
//! Backed by the `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};
use tracing::trace;

/// Extensions scanned when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "cxx", "hh", "hpp"];

pub struct SourceWalker
{
    /// Extra ignore patterns on top of ignore files
    ignore_patterns: GlobSet,

    /// Lower-cased extensions without the dot
    extensions: Vec<String>,

    /// Skip dotfiles and dot-directories; default true
    skip_hidden: bool,
}

impl SourceWalker
{
    /// Walker for `extensions` ("c", ".h" and "H" are all accepted) with
    /// additional ignore globs such as "build/**".
    pub fn new(
        extensions: &[String],
        additional_ignores: &[String],
    ) -> Result<Self>
    {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores
        {
            builder.add(Glob::new(pattern).with_context(|| format!("invalid ignore pattern `{pattern}`"))?);
        }

        let extensions = extensions
            .iter()
            .map(|e| {
                e.trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .filter(|e| !e.is_empty())
            .collect();

        Ok(Self {
            ignore_patterns: builder.build()?,
            extensions,
            skip_hidden: true,
        })
    }

    pub fn with_skip_hidden(
        mut self,
        skip: bool,
    ) -> Self
    {
        self.skip_hidden = skip;
        self
    }

    pub fn accepts(
        &self,
        path: &Path,
    ) -> bool
    {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                self.extensions
                    .iter()
                    .any(|x| x.eq_ignore_ascii_case(e))
            })
    }

    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        b.hidden(self.skip_hidden);
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);
        b.follow_links(false);

        let extra = self
            .ignore_patterns
            .clone();
        let root = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .is_some_and(|ft| ft.is_dir());
            let rel = ent
                .path()
                .strip_prefix(&root)
                .unwrap_or(ent.path());

            !(is_dir && (extra.is_match(rel) || extra.is_match(rel.join("x"))))
        });

        b
    }

    /// Source files under `root`, sorted.
    pub fn walk(
        &self,
        root: &Path,
    ) -> Vec<PathBuf>
    {
        let mut out: Vec<PathBuf> = self
            .build_walk(root)
            .build()
            .filter_map(|res| {
                res.map_err(|e| trace!("walk: {e}"))
                    .ok()
            })
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            .filter(|abs| self.accepts(abs))
            .filter(|abs| {
                let rel = abs
                    .strip_prefix(root)
                    .unwrap_or(abs);
                !self
                    .ignore_patterns
                    .is_match(rel)
            })
            .collect();

        out.sort();
        out
    }
}
