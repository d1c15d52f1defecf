//! Line records parsed from cscope/readtags query output.
//!
//! Output lines are whitespace-separated: `<file> <symbol> <line> <text...>`.
//! Anything that does not carry at least those three fields with a positive
//! line number is noise (blank trailers, truncated writes) and is skipped.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::trace;

use crate::core::error::HierarchyError;

/// One symbol occurrence reported by the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRecord
{
    /// Symbol (function, macro, file) name
    pub name: String,

    /// Path relative to the workspace root
    pub file_path: PathBuf,

    /// 1-based line number
    pub line: usize,
}

impl SymbolRecord
{
    pub fn new(
        name: impl Into<String>,
        file_path: impl Into<PathBuf>,
        line: usize,
    ) -> Self
    {
        Self { name: name.into(), file_path: file_path.into(), line }
    }

    /// Parse a call-site line: `[file, symbol, line, ...ignored]`.
    pub fn parse_call_site(line: &str) -> Result<Self, HierarchyError>
    {
        let (file, name, lineno) = split_fields(line)?;

        Ok(Self::new(name, file, lineno))
    }

    /// Parse an includer line, where the first field is the interesting
    /// path and the name is its final segment.
    pub fn parse_file_record(line: &str) -> Result<Self, HierarchyError>
    {
        let (file, _, lineno) = split_fields(line)?;
        let name = final_segment(file);

        if name.is_empty()
        {
            return Err(malformed(line));
        }

        Ok(Self::new(name, file, lineno))
    }

    /// Final path segment, accepting both separators.
    pub fn file_name(&self) -> String
    {
        final_segment(&self.file_path.to_string_lossy()).to_string()
    }

    /// Human-readable "file @ line" detail.
    pub fn description(
        &self,
        show_file_names: bool,
    ) -> String
    {
        describe(&self.file_path, self.line, show_file_names)
    }

    /// 0-based line index for text access.
    pub fn line_index(&self) -> usize
    {
        self.line - 1
    }
}

/// Format the detail string shown next to a hierarchy node.
pub fn describe(
    file_path: &Path,
    line: usize,
    show_file_names: bool,
) -> String
{
    if show_file_names
    {
        format!("{} @ {}", final_segment(&file_path.to_string_lossy()), line)
    }
    else
    {
        format!("@ {line}")
    }
}

/// Parse every usable line of a query result, skipping noise.
pub fn parse_lines<F>(
    output: &str,
    parse: F,
) -> Vec<SymbolRecord>
where
    F: Fn(&str) -> Result<SymbolRecord, HierarchyError>,
{
    output
        .lines()
        .filter(|l| {
            !l.trim()
                .is_empty()
        })
        .filter_map(|l| match parse(l)
        {
            Ok(rec) => Some(rec),
            Err(e) =>
            {
                trace!("skipping {e}");
                None
            }
        })
        .collect()
}

fn split_fields(line: &str) -> Result<(&str, &str, usize), HierarchyError>
{
    let mut fields = line.split_whitespace();

    let (Some(file), Some(name), Some(lineno)) = (fields.next(), fields.next(), fields.next())
    else
    {
        return Err(malformed(line));
    };

    match lineno.parse::<usize>()
    {
        Ok(n) if n >= 1 => Ok((file, name, n)),
        _ => Err(malformed(line)),
    }
}

fn final_segment(path: &str) -> &str
{
    path.rsplit(['/', '\\'])
        .next()
        .unwrap_or(path)
}

fn malformed(line: &str) -> HierarchyError
{
    HierarchyError::ParseMalformed { line: line.to_string() }
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_parse_call_site_ignores_trailing_text()
    {
        let rec = SymbolRecord::parse_call_site("src/a.c main 42 bar(x, y);").unwrap();

        assert_eq!(rec, SymbolRecord::new("main", "src/a.c", 42));
        assert_eq!(rec.line_index(), 41);
    }

    #[test]
    fn test_parse_rejects_short_and_non_numeric_lines()
    {
        assert!(SymbolRecord::parse_call_site("").is_err());
        assert!(SymbolRecord::parse_call_site("src/a.c main").is_err());
        assert!(SymbolRecord::parse_call_site("src/a.c main x12").is_err());
        assert!(SymbolRecord::parse_call_site("src/a.c main 0").is_err());
    }

    #[test]
    fn test_file_record_takes_final_segment()
    {
        let rec = SymbolRecord::parse_file_record("lib\\net\\sock.c <global> 7 #include \"x.h\"")
            .unwrap();
        assert_eq!(rec.name, "sock.c");
        assert_eq!(rec.line, 7);

        let rec = SymbolRecord::parse_file_record("drv/uart.c <global> 3 #include <uart.h>").unwrap();
        assert_eq!(rec.name, "uart.c");
    }

    #[test]
    fn test_parse_lines_skips_noise_without_aborting()
    {
        let out = "a.c main 3 foo();\n\ngarbage\nb.c init 9 foo();\n";
        let recs = parse_lines(out, SymbolRecord::parse_call_site);

        assert_eq!(
            recs,
            vec![SymbolRecord::new("main", "a.c", 3), SymbolRecord::new("init", "b.c", 9)]
        );
    }

    #[test]
    fn test_description_respects_file_name_flag()
    {
        let rec = SymbolRecord::new("main", "src/app/main.c", 12);

        assert_eq!(rec.description(true), "main.c @ 12");
        assert_eq!(rec.description(false), "@ 12");
    }

    proptest! {
        #[test]
        fn prop_well_formed_lines_round_trip(
            path in "[a-z]{1,8}(/[a-z_]{1,8}){0,3}\\.[ch]",
            name in "[A-Za-z_][A-Za-z0-9_]{0,16}",
            line in 1usize..100_000,
            tail in "[ -~]{0,24}",
        ) {
            let raw = format!("{path} {name} {line} {tail}");
            let rec = SymbolRecord::parse_call_site(&raw).unwrap();

            prop_assert_eq!(rec.name, name);
            prop_assert_eq!(rec.file_path, PathBuf::from(path));
            prop_assert_eq!(rec.line, line);
        }

        #[test]
        fn prop_fewer_than_three_fields_is_malformed(
            fields in proptest::collection::vec("[a-z0-9]{1,6}", 0..3),
        ) {
            let raw = fields.join(" ");
            prop_assert!(SymbolRecord::parse_call_site(&raw).is_err());
        }
    }
}
