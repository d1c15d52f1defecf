//! Approximate call graph built by scanning source text directly.
//!
//! Used when cscope is not available. Function definitions are found with a
//! regex, bodies are carved out by brace matching, and calls are
//! `identifier ( ... ) ;` statements inside a body. Comments and literals
//! are blanked out before any matching. Nothing here understands the
//! preprocessor, so results are a best effort.
//!
//! The result is a `FallbackIndex`, an independent backend behind
//! `RelationProvider`; it is never merged with query results.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{
        LazyLock,
        atomic::{AtomicBool, Ordering},
    },
};

use petgraph::{
    Direction,
    dot::{Config as DotConfig, Dot},
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    core::{
        cancel::CancelToken,
        error::HierarchyError,
        kind::TagEntry,
        progress::{PercentSteps, Progress},
        provider::RelationProvider,
        range,
        record::SymbolRecord,
    },
    infra::{io::read_file_smart, line_index::LineIndex, walk::SourceWalker},
};

/// Built-in C function definition pattern. The name is the `name` group
/// (or the first group in custom patterns).
pub const DEFAULT_FUNCTION_PATTERN: &str = r"(?m)^[ \t]*(?:[A-Za-z_]\w*[ \t\*\r\n]+)+\**(?P<name>[A-Za-z_]\w*)[ \t]*\([^;{}()]*(?:\([^;{}()]*\)[^;{}()]*)*\)\s*\{";

/// Words that look like calls or definitions but are not.
const KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "do", "switch", "case", "return", "sizeof", "goto", "typeof",
    "alignof", "_Alignof", "defined",
];

static CALL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\b([A-Za-z_]\w*)\s*\(").ok());

/// One call statement inside a function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSite
{
    pub name: String,

    /// 1-based
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionRecord
{
    pub file_path: PathBuf,

    /// 1-based line of the function name
    pub line_number: usize,

    pub name: String,

    /// Text from the opening to the closing brace
    #[serde(skip)]
    pub body: String,

    /// Calls in order of appearance
    pub callees: Vec<CallSite>,
}

impl FunctionRecord
{
    pub fn callee_names(&self) -> Vec<&str>
    {
        self.callees
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// `#include` seen while scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeSite
{
    pub file_path: PathBuf,

    /// 1-based
    pub line: usize,

    /// As written in the directive
    pub header: String,
}

/// Call-site weight on graph edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRef
{
    pub file_path: PathBuf,
    pub line: usize,
}

impl fmt::Display for SiteRef
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        write!(f, "{}:{}", self.file_path.display(), self.line)
    }
}

/// In-memory relation store produced by one indexing run.
#[derive(Debug, Default)]
pub struct FallbackIndex
{
    functions: Vec<FunctionRecord>,
    includes: Vec<IncludeSite>,
    files: Vec<PathBuf>,
    graph: DiGraph<String, SiteRef>,
    nodes: HashMap<String, NodeIndex>,

    /// Files that could not be read
    pub skipped: Vec<PathBuf>,
}

impl FallbackIndex
{
    pub fn from_parts(
        functions: Vec<FunctionRecord>,
        includes: Vec<IncludeSite>,
        files: Vec<PathBuf>,
    ) -> Self
    {
        let mut index = Self { functions, includes, files, ..Self::default() };

        let calls: Vec<(String, String, SiteRef)> = index
            .functions
            .iter()
            .flat_map(|f| {
                f.callees
                    .iter()
                    .map(|c| {
                        (
                            f.name
                                .clone(),
                            c.name
                                .clone(),
                            SiteRef { file_path: f.file_path.clone(), line: c.line },
                        )
                    })
            })
            .collect();

        let defined: Vec<String> = index
            .functions
            .iter()
            .map(|f| {
                f.name
                    .clone()
            })
            .collect();

        for name in defined
        {
            index.node(&name);
        }
        for (caller, callee, site) in calls
        {
            let from = index.node(&caller);
            let to = index.node(&callee);
            index
                .graph
                .add_edge(from, to, site);
        }

        index
    }

    fn node(
        &mut self,
        name: &str,
    ) -> NodeIndex
    {
        if let Some(idx) = self
            .nodes
            .get(name)
        {
            return *idx;
        }

        let idx = self
            .graph
            .add_node(name.to_string());
        self.nodes
            .insert(name.to_string(), idx);
        idx
    }

    pub fn functions(&self) -> &[FunctionRecord]
    {
        &self.functions
    }

    pub fn includes(&self) -> &[IncludeSite]
    {
        &self.includes
    }

    pub fn call_count(&self) -> usize
    {
        self.graph
            .edge_count()
    }

    /// Graphviz rendering of the call graph.
    pub fn to_dot(&self) -> String
    {
        format!("{}", Dot::with_config(&self.graph, &[DotConfig::EdgeNoLabel]))
    }

    /// Records for edges touching `name`, sorted by site.
    fn neighbours(
        &self,
        name: &str,
        dir: Direction,
    ) -> Vec<SymbolRecord>
    {
        let Some(idx) = self
            .nodes
            .get(name)
        else
        {
            return Vec::new();
        };

        let mut out: Vec<SymbolRecord> = self
            .graph
            .edges_directed(*idx, dir)
            .filter_map(|e| {
                let other = match dir
                {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                let site = e.weight();

                self.graph
                    .node_weight(other)
                    .map(|n| SymbolRecord::new(n.as_str(), &site.file_path, site.line))
            })
            .collect();

        out.sort_by(|a, b| (&a.file_path, a.line).cmp(&(&b.file_path, b.line)));
        out
    }
}

impl RelationProvider for FallbackIndex
{
    fn backend(&self) -> &'static str
    {
        "fallback"
    }

    fn find_definition(
        &self,
        name: &str,
    ) -> Result<Option<SymbolRecord>, HierarchyError>
    {
        Ok(self
            .functions
            .iter()
            .find(|f| f.name == name)
            .map(|f| SymbolRecord::new(f.name.as_str(), &f.file_path, f.line_number)))
    }

    fn find_callers(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        Ok(self.neighbours(name, Direction::Incoming))
    }

    fn find_callees(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        Ok(self.neighbours(name, Direction::Outgoing))
    }

    fn find_includers(
        &self,
        header: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        Ok(self
            .includes
            .iter()
            .filter(|inc| {
                inc.header == header
                    || inc
                        .header
                        .rsplit(['/', '\\'])
                        .next()
                        == Some(header)
            })
            .map(|inc| SymbolRecord::new(file_name(&inc.file_path), &inc.file_path, inc.line))
            .collect())
    }

    fn find_file(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        Ok(self
            .files
            .iter()
            .filter(|p| file_name(p) == name)
            .map(|p| SymbolRecord::new(name, p, 1))
            .collect())
    }

    /// Every definition found is a function.
    fn tag_entries(
        &self,
        name: &str,
    ) -> Result<Vec<TagEntry>, HierarchyError>
    {
        Ok(self
            .functions
            .iter()
            .filter(|f| f.name == name)
            .map(|f| TagEntry {
                name: f
                    .name
                    .clone(),
                file_path: f
                    .file_path
                    .clone(),
                line: f.line_number,
                kind_code: "f".to_string(),
            })
            .collect())
    }
}

/// Scans a workspace into a `FallbackIndex`, one file at a time.
pub struct FallbackIndexer
{
    root: PathBuf,
    walker: SourceWalker,
    function_re: Regex,
    indexing: AtomicBool,
}

impl FallbackIndexer
{
    /// `function_pattern` replaces the built-in definition pattern.
    pub fn new(
        root: impl Into<PathBuf>,
        walker: SourceWalker,
        function_pattern: Option<&str>,
    ) -> Result<Self, regex::Error>
    {
        let function_re = Regex::new(function_pattern.unwrap_or(DEFAULT_FUNCTION_PATTERN))?;

        Ok(Self { root: root.into(), walker, function_re, indexing: AtomicBool::new(false) })
    }

    /// Walk and scan. A second call while one runs is rejected with `Busy`.
    /// Cancellation stops between files and keeps what was scanned.
    #[instrument(skip_all, fields(root = %self.root.display()))]
    pub fn index(
        &self,
        progress: &dyn Progress,
        cancel: &CancelToken,
    ) -> Result<FallbackIndex, HierarchyError>
    {
        if self
            .indexing
            .swap(true, Ordering::SeqCst)
        {
            return Err(HierarchyError::Busy("source indexing"));
        }

        let index = self.scan_all(progress, cancel);

        self.indexing
            .store(false, Ordering::SeqCst);
        Ok(index)
    }

    fn scan_all(
        &self,
        progress: &dyn Progress,
        cancel: &CancelToken,
    ) -> FallbackIndex
    {
        let files = self
            .walker
            .walk(&self.root);
        let mut pct = PercentSteps::new(files.len());
        let mut functions = Vec::new();
        let mut includes = Vec::new();
        let mut scanned = Vec::new();
        let mut skipped = Vec::new();

        for (i, abs) in files
            .iter()
            .enumerate()
        {
            if cancel.is_cancelled()
            {
                info!(done = i, total = files.len(), "indexing cancelled");
                break;
            }

            let rel = abs
                .strip_prefix(&self.root)
                .unwrap_or(abs)
                .to_path_buf();

            match read_file_smart(abs)
            {
                Ok(content) =>
                {
                    let (mut f, mut inc) = scan_source(&rel, content.as_ref(), &self.function_re);
                    debug!(file = %rel.display(), functions = f.len(), "scanned");
                    functions.append(&mut f);
                    includes.append(&mut inc);
                    scanned.push(rel.clone());
                }
                Err(e) =>
                {
                    warn!("skipping {}: {e:#}", rel.display());
                    skipped.push(rel.clone());
                }
            }

            progress.report(pct.advance(i + 1), &rel.to_string_lossy());
        }

        let mut index = FallbackIndex::from_parts(functions, includes, scanned);
        index.skipped = skipped;

        info!(
            functions = index
                .functions
                .len(),
            calls = index.call_count(),
            "fallback index ready"
        );
        index
    }
}

/// Functions and include directives of one file.
pub fn scan_source(
    file_path: &Path,
    text: &str,
    function_re: &Regex,
) -> (Vec<FunctionRecord>, Vec<IncludeSite>)
{
    let lines = LineIndex::build(text);
    let code = mask_non_code(text);

    let includes = (0..lines.line_count())
        .filter_map(|idx| {
            let directive = range::include_directive(lines.line(idx)?, idx)?;
            Some(IncludeSite { file_path: file_path.to_path_buf(), line: idx + 1, header: directive.header })
        })
        .collect();

    let mut functions = Vec::new();
    let mut pos = 0;

    while let Some(caps) = function_re.captures_at(&code, pos)
    {
        let Some(whole) = caps.get(0)
        else
        {
            break;
        };
        let Some(name) = caps
            .name("name")
            .or_else(|| caps.get(1))
        else
        {
            debug!(file = %file_path.display(), "definition match without a name; skipping");
            pos = whole.end();
            continue;
        };

        // The match ends on the opening brace
        let open = whole.end() - 1;
        let Some(close) = matching_brace(&code, open)
        else
        {
            debug!(file = %file_path.display(), name = name.as_str(), "no matching brace; skipping");
            pos = name.end();
            continue;
        };

        if KEYWORDS.contains(&name.as_str())
        {
            pos = name.end();
            continue;
        }

        functions.push(FunctionRecord {
            file_path: file_path.to_path_buf(),
            line_number: lines.line_of_offset(name.start()) + 1,
            name: name
                .as_str()
                .to_string(),
            body: text[open..=close].to_string(),
            callees: call_sites(&code, open, close, &lines),
        });

        pos = close + 1;
    }

    (functions, includes)
}

/// Calls between `open` and `close`, skipping their arguments.
fn call_sites(
    code: &str,
    open: usize,
    close: usize,
    lines: &LineIndex<'_>,
) -> Vec<CallSite>
{
    let Some(re) = CALL_RE.as_ref()
    else
    {
        return Vec::new();
    };

    let body = &code[..close];
    let mut out = Vec::new();
    let mut pos = open + 1;

    while let Some(caps) = re.captures_at(body, pos)
    {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1))
        else
        {
            break;
        };

        let paren = whole.end() - 1;
        let is_call = matching_paren(body, paren).filter(|end| {
            body[end + 1..]
                .trim_start()
                .starts_with(';')
        });

        match is_call
        {
            Some(end) if !KEYWORDS.contains(&name.as_str()) =>
            {
                out.push(CallSite {
                    name: name
                        .as_str()
                        .to_string(),
                    line: lines.line_of_offset(name.start()) + 1,
                });
                pos = end + 1;
            }
            _ => pos = name.end(),
        }
    }

    out
}

fn matching_brace(
    code: &str,
    open: usize,
) -> Option<usize>
{
    matching(code, open, b'{', b'}')
}

fn matching_paren(
    code: &str,
    open: usize,
) -> Option<usize>
{
    matching(code, open, b'(', b')')
}

fn matching(
    code: &str,
    open: usize,
    opener: u8,
    closer: u8,
) -> Option<usize>
{
    let bytes = code.as_bytes();
    let mut depth = 0usize;

    for (i, b) in bytes
        .iter()
        .enumerate()
        .skip(open)
    {
        if *b == opener
        {
            depth += 1;
        }
        else if *b == closer
        {
            depth = depth.checked_sub(1)?;
            if depth == 0
            {
                return Some(i);
            }
        }
    }

    None
}

/// Copy of `text` with comments and the insides of string and char
/// literals replaced by spaces. Byte offsets and newlines are preserved.
pub fn mask_non_code(text: &str) -> String
{
    enum State
    {
        Code,
        LineComment,
        BlockComment,
        Literal(char),
    }

    fn blank(
        out: &mut String,
        c: char,
    )
    {
        if c == '\n'
        {
            out.push('\n');
        }
        else
        {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        }
    }

    let mut out = String::with_capacity(text.len());
    let mut chars = text
        .chars()
        .peekable();
    let mut state = State::Code;

    while let Some(c) = chars.next()
    {
        match state
        {
            State::Code => match (c, chars.peek())
            {
                ('/', Some('/')) =>
                {
                    blank(&mut out, c);
                    state = State::LineComment;
                }
                ('/', Some('*')) =>
                {
                    blank(&mut out, c);
                    if let Some(star) = chars.next()
                    {
                        blank(&mut out, star);
                    }
                    state = State::BlockComment;
                }
                ('"' | '\'', _) =>
                {
                    out.push(c);
                    state = State::Literal(c);
                }
                _ => out.push(c),
            },
            State::LineComment =>
            {
                blank(&mut out, c);
                if c == '\n'
                {
                    state = State::Code;
                }
            }
            State::BlockComment =>
            {
                blank(&mut out, c);
                if c == '*' && chars.peek() == Some(&'/')
                {
                    if let Some(slash) = chars.next()
                    {
                        blank(&mut out, slash);
                    }
                    state = State::Code;
                }
            }
            State::Literal(quote) =>
            {
                if c == '\\'
                {
                    blank(&mut out, c);
                    if let Some(escaped) = chars.next()
                    {
                        blank(&mut out, escaped);
                    }
                }
                else if c == quote || c == '\n'
                {
                    out.push(c);
                    state = State::Code;
                }
                else
                {
                    blank(&mut out, c);
                }
            }
        }
    }

    out
}

fn file_name(path: &Path) -> String
{
    path.file_name()
        .map(|n| {
            n.to_string_lossy()
                .into_owned()
        })
        .unwrap_or_default()
}
