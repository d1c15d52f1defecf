use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::infra::line_index::LineIndex;

const MMAP_THRESHOLD: u64 = 1024 * 1024; // 1 MiB

pub enum FileContent {
    Mapped(Mmap),
    Buffered(String),
}

impl AsRef<str> for FileContent {
    fn as_ref(&self) -> &str {
        match self {
            // Only valid UTF-8 stays mapped, see `read_file_smart`
            FileContent::Mapped(mmap) => std::str::from_utf8(mmap).unwrap_or_default(),
            FileContent::Buffered(s) => s.as_str(),
        }
    }
}

/// Read a source file, mapping it when it is large.
pub fn read_file_smart<P: AsRef<Path>>(path: P) -> Result<FileContent> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    if metadata.len() > MMAP_THRESHOLD {
        let file =
            File::open(path).with_context(|| format!("Failed to open file {}", path.display()))?;

        // Safety: read-only map; the index tools never rewrite sources
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("Failed to memory-map {}", path.display()))?;

        if std::str::from_utf8(&mmap).is_ok() {
            return Ok(FileContent::Mapped(mmap));
        }

        // Large non-UTF-8 sources get the same lossy decoding as small ones
        debug!("{} is not UTF-8; decoding lossily", path.display());
        Ok(FileContent::Buffered(String::from_utf8_lossy(&mmap).into_owned()))
    } else {
        // C sources are not always UTF-8 (Latin-1 comments); be lossy
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read file {}", path.display()))?;

        Ok(FileContent::Buffered(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Fetch one 0-based line from a file on disk.
pub fn read_line_at<P: AsRef<Path>>(path: P, idx: usize) -> Result<String> {
    let path = path.as_ref();
    let content = read_file_smart(path)?;
    let index = LineIndex::build(content.as_ref());

    index
        .line(idx)
        .map(str::to_string)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "line {} out of range ({} lines)",
                idx + 1,
                index.line_count()
            )
        })
}
