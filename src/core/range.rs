//! Text ranges for symbol occurrences on a single line.
//!
//! Two address modes:
//! - token: the first case-insensitive, word-boundary match of an identifier
//! - include clause: the whole `#include <x>` / `#include "x"` directive
//!
//! Columns count chars, lines are 0-based, ranges are half-open.

use std::{path::Path, sync::LazyLock};

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::{core::error::HierarchyError, infra::source::SourceText};

static INCLUDE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"^\s*(#\s*include\s*[<"]([^>"]+)[>"])"#).ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position
{
    pub line: usize,
    pub character: usize,
}

/// Half-open `[start, end)` on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TextRange
{
    pub start: Position,
    pub end: Position,
}

impl TextRange
{
    pub fn on_line(
        line: usize,
        start: usize,
        end: usize,
    ) -> Self
    {
        Self {
            start: Position { line, character: start },
            end: Position { line, character: end },
        }
    }

    /// Zero-width range at column 0; the degraded fallback.
    pub fn line_start(line: usize) -> Self
    {
        Self::on_line(line, 0, 0)
    }

    pub fn is_empty(&self) -> bool
    {
        self.start == self.end
    }
}

/// An include directive found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective
{
    /// Header as written (`sys/types.h`)
    pub header: String,

    /// Whole clause, `#` through the closing delimiter
    pub range: TextRange,
}

impl IncludeDirective
{
    /// Final path segment of the header.
    pub fn header_name(&self) -> &str
    {
        self.header
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.header)
    }
}

/// Token mode on already-loaded line text.
pub fn token_range(
    text: &str,
    line: usize,
    token: &str,
) -> Option<TextRange>
{
    if token.is_empty()
    {
        return None;
    }

    let re = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(token)))
        .case_insensitive(true)
        .build()
        .ok()?;
    let m = re.find(text)?;

    Some(TextRange::on_line(line, char_col(text, m.start()), char_col(text, m.end())))
}

/// Token mode against a file; a missing token is `RangeNotFound`.
pub fn resolve_token(
    source: &dyn SourceText,
    file: &Path,
    line: usize,
    token: &str,
) -> Result<TextRange, HierarchyError>
{
    let text = source.read_line(file, line)?;

    token_range(&text, line, token).ok_or_else(|| HierarchyError::RangeNotFound {
        file: file.to_path_buf(),
        line,
        token: token.to_string(),
    })
}

/// Parse an include directive from one line.
pub fn include_directive(
    text: &str,
    line: usize,
) -> Option<IncludeDirective>
{
    let re = INCLUDE_RE.as_ref()?;
    let caps = re.captures(text)?;
    let clause = caps.get(1)?;
    let header = caps.get(2)?;

    Some(IncludeDirective {
        header: header
            .as_str()
            .trim()
            .to_string(),
        range: TextRange::on_line(
            line,
            char_col(text, clause.start()),
            char_col(text, clause.end()),
        ),
    })
}

/// Include-clause mode: the clause including `header`, or a zero-width
/// range at column 0 when the line holds no such directive.
pub fn include_range(
    text: &str,
    line: usize,
    header: &str,
) -> TextRange
{
    include_directive(text, line)
        .filter(|d| d.header == header || d.header_name() == header)
        .map(|d| d.range)
        .unwrap_or_else(|| TextRange::line_start(line))
}

/// Include-clause mode against a file.
pub fn resolve_include(
    source: &dyn SourceText,
    file: &Path,
    line: usize,
    header: &str,
) -> Result<TextRange, HierarchyError>
{
    let text = source.read_line(file, line)?;

    Ok(include_range(&text, line, header))
}

/// Identifier under the char column `character`, with its range.
pub fn word_at(
    text: &str,
    line: usize,
    character: usize,
) -> Option<(String, TextRange)>
{
    let chars: Vec<char> = text
        .chars()
        .collect();
    let is_word = |c: char| c == '_' || c.is_alphanumeric();

    // Cursor right after a word still selects it
    let at = if chars
        .get(character)
        .is_some_and(|&c| is_word(c))
    {
        character
    }
    else if character > 0
        && chars
            .get(character - 1)
            .is_some_and(|&c| is_word(c))
    {
        character - 1
    }
    else
    {
        return None;
    };

    let mut start = at;
    while start > 0 && is_word(chars[start - 1])
    {
        start -= 1;
    }

    let mut end = at;
    while end < chars.len() && is_word(chars[end])
    {
        end += 1;
    }

    let word: String = chars[start..end]
        .iter()
        .collect();

    Some((word, TextRange::on_line(line, start, end)))
}

fn char_col(
    text: &str,
    byte: usize,
) -> usize
{
    text[..byte]
        .chars()
        .count()
}
