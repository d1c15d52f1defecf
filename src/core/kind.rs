//! Symbol kinds derived from ctags kind codes.
//!
//! The tag store reports one-letter C kind codes. Function-like macros share
//! the `d` code with object-like constants, so `d` entries get a second look
//! at the defining line and are shown as fields when they take arguments.

use std::{fmt, path::PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::infra::source::SourceText;

/// Hierarchy icon kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind
{
    Constant,
    Enum,
    EnumMember,
    Function,
    File,
    Variable,
    Field,
    Struct,
    Class,
    TypeParameter,
    Namespace,

    /// Code missing from the table, or no tag at all
    Unclassified,
}

impl SymbolKind
{
    /// Base mapping from a ctags C kind code.
    pub fn from_tag_code(code: &str) -> Self
    {
        match code
        {
            "d" => SymbolKind::Constant,
            "e" => SymbolKind::Enum,
            "f" | "p" => SymbolKind::Function,
            "g" => SymbolKind::EnumMember,
            "h" => SymbolKind::File,
            "l" | "v" | "x" => SymbolKind::Variable,
            "m" => SymbolKind::Field,
            "s" | "u" => SymbolKind::Struct,
            "t" => SymbolKind::Class,
            "z" | "D" => SymbolKind::TypeParameter,
            "L" => SymbolKind::Namespace,
            _ => SymbolKind::Unclassified,
        }
    }
}

impl fmt::Display for SymbolKind
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        let s = match self
        {
            SymbolKind::Constant => "constant",
            SymbolKind::Enum => "enum",
            SymbolKind::EnumMember => "enum member",
            SymbolKind::Function => "function",
            SymbolKind::File => "file",
            SymbolKind::Variable => "variable",
            SymbolKind::Field => "field",
            SymbolKind::Struct => "struct",
            SymbolKind::Class => "type",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Unclassified => "unclassified",
        };
        f.write_str(s)
    }
}

/// One line of readtags output: `<name> <file> <line> <kind>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry
{
    pub name: String,
    pub file_path: PathBuf,
    pub line: usize,
    pub kind_code: String,
}

impl TagEntry
{
    /// Parse a tag line; needs at least four fields and a numeric line.
    pub fn parse(line: &str) -> Option<Self>
    {
        let fields: Vec<&str> = line
            .split_whitespace()
            .collect();

        if fields.len() < 4
        {
            return None;
        }

        Some(Self {
            name: fields[0].to_string(),
            file_path: fields[1].into(),
            line: fields[2]
                .parse()
                .ok()?,
            kind_code: fields[3].to_string(),
        })
    }

    /// Parse a readtags result in order.
    pub fn parse_all(output: &str) -> Vec<Self>
    {
        output
            .lines()
            .filter_map(Self::parse)
            .collect()
    }
}

/// The entry that decides the kind: later entries for the same name
/// override earlier ones.
pub fn authoritative<'a>(
    name: &str,
    entries: &'a [TagEntry],
) -> Option<&'a TagEntry>
{
    entries
        .iter()
        .rev()
        .find(|t| t.name == name)
}

/// Resolve the kind of `name` from its tag entries.
///
/// Unknown codes and symbols without tags are `Unclassified`. A defining
/// line that cannot be read keeps the table kind.
pub fn classify(
    name: &str,
    entries: &[TagEntry],
    source: &dyn SourceText,
) -> SymbolKind
{
    let Some(tag) = authoritative(name, entries)
    else
    {
        return SymbolKind::Unclassified;
    };

    let base = SymbolKind::from_tag_code(&tag.kind_code);

    if tag.kind_code != "d" || tag.line == 0
    {
        return base;
    }

    match source.read_line(&tag.file_path, tag.line - 1)
    {
        Ok(text) if is_function_like_macro(name, &text) => SymbolKind::Field,
        Ok(_) => base,
        Err(e) =>
        {
            debug!("macro check for {name} skipped: {e}");
            base
        }
    }
}

/// `#define NAME(` with no space before the parenthesis.
pub fn is_function_like_macro(
    name: &str,
    line: &str,
) -> bool
{
    let pattern = format!(r"^\s*#\s*define\s+{}\(", regex::escape(name));

    Regex::new(&pattern)
        .map(|re| re.is_match(line))
        .unwrap_or(false)
}
