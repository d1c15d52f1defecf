//! Call and include hierarchy assembly.
//!
//! One expansion turns a node into the edges of the next level:
//! - incoming calls: callers of the symbol, one edge per source line
//!   (the last record the index reports for that line wins); in definition
//!   mode each caller points at the called symbol's definition
//! - outgoing calls: callees of the symbol
//! - incoming includes: files that include the header
//! - outgoing includes: directives found by scanning the node's own file
//!
//! A failing query empties the level and is reported on the `Expansion`;
//! unreadable lines and missing tokens only degrade the affected range.
//! The cancel token is checked before every external step.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{
    core::{
        cancel::CancelToken,
        error::HierarchyError,
        kind::{SymbolKind, classify},
        provider::RelationProvider,
        range::{self, TextRange},
        record::{SymbolRecord, describe},
    },
    infra::{line_index::LineIndex, source::SourceText},
};

/// Where clicking a node should land.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ClickTarget
{
    /// The symbol's own definition
    #[default]
    Definition,

    /// The line the index reported (the call site)
    CallSite,
}

/// Display and navigation policy threaded through every expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyOptions
{
    /// Prefix details with the file name ("a.c @ 3" rather than "@ 3")
    pub show_file_names: bool,

    pub click_target: ClickTarget,
}

impl Default for HierarchyOptions
{
    fn default() -> Self
    {
        Self { show_file_names: true, click_target: ClickTarget::Definition }
    }
}

/// Node variants; a node is never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOrigin
{
    Symbol,
    Include,
}

/// One row of the hierarchy view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyNode
{
    pub kind: SymbolKind,
    pub name: String,
    pub detail: String,
    pub file_path: PathBuf,
    pub range: TextRange,
    pub origin: NodeOrigin,
}

impl HierarchyNode
{
    pub fn is_include(&self) -> bool
    {
        self.origin == NodeOrigin::Include
    }
}

/// Directed relation with the ranges of its sites in the `from` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallEdge
{
    pub from: HierarchyNode,
    pub to: HierarchyNode,
    pub site_ranges: Vec<TextRange>,
}

/// Result of expanding one node by one level.
#[derive(Debug, Default)]
pub struct Expansion
{
    pub edges: Vec<CallEdge>,

    /// Records that were kept with a degraded range
    pub warnings: Vec<HierarchyError>,

    /// The error that emptied this level
    pub failure: Option<HierarchyError>,

    /// Stopped early; `edges` holds what was resolved so far
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Direction
{
    Incoming,
    Outgoing,
}

/// A node expanded to some depth, for printing.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyTree
{
    pub node: HierarchyNode,
    pub site_ranges: Vec<TextRange>,
    pub children: Vec<HierarchyTree>,
    pub warnings: Vec<String>,
    pub failure: Option<String>,
    pub recursive: bool,
}

/// Collapse records sharing a source line into the last one seen,
/// keeping the order in which lines first appeared.
pub fn dedup_last_per_line(records: Vec<SymbolRecord>) -> Vec<SymbolRecord>
{
    let mut by_line: IndexMap<(PathBuf, usize), SymbolRecord> = IndexMap::new();

    for rec in records
    {
        by_line.insert((rec.file_path.clone(), rec.line), rec);
    }

    by_line
        .into_values()
        .collect()
}

pub struct GraphBuilder<'a>
{
    provider: &'a dyn RelationProvider,
    source: &'a dyn SourceText,
    options: HierarchyOptions,
}

impl<'a> GraphBuilder<'a>
{
    pub fn new(
        provider: &'a dyn RelationProvider,
        source: &'a dyn SourceText,
        options: HierarchyOptions,
    ) -> Self
    {
        Self { provider, source, options }
    }

    /// Root node for the cursor at `(line, character)` of `file`.
    /// An include line yields an include node for its header.
    pub fn prepare(
        &self,
        file: &Path,
        line: usize,
        character: usize,
    ) -> Result<Option<HierarchyNode>, HierarchyError>
    {
        let text = self
            .source
            .read_line(file, line)?;

        if let Some(directive) = range::include_directive(&text, line)
        {
            return self
                .prepare_header(directive.header_name())
                .map(Some);
        }

        let Some((name, word)) = range::word_at(&text, line, character)
        else
        {
            return Ok(None);
        };

        let here = SymbolRecord::new(name.as_str(), file, line + 1);
        let mut scratch = Expansion::default();

        self.symbol_node(&here, word, &name, &mut HashMap::new(), &CancelToken::new(), &mut scratch)
    }

    /// Root node for a bare symbol name, placed at its definition.
    pub fn prepare_symbol(
        &self,
        name: &str,
    ) -> Result<Option<HierarchyNode>, HierarchyError>
    {
        let Some(def) = self
            .provider
            .find_definition(name)?
        else
        {
            return Ok(None);
        };

        let mut scratch = Expansion::default();
        let kind = self.kind_of(name, &mut HashMap::new())?;
        let range = self.token_or_line_start(&def.file_path, def.line_index(), name, &mut scratch);

        Ok(Some(HierarchyNode {
            kind,
            name: name.to_string(),
            detail: def.description(self.options.show_file_names),
            file_path: def.file_path,
            range,
            origin: NodeOrigin::Symbol,
        }))
    }

    /// Root include node for a header, located through the index.
    pub fn prepare_header(
        &self,
        header: &str,
    ) -> Result<HierarchyNode, HierarchyError>
    {
        let located = self
            .provider
            .find_file(header)?
            .into_iter()
            .next();

        let file_path = located
            .map(|r| r.file_path)
            .unwrap_or_else(|| PathBuf::from(header));

        Ok(self.include_node(header_name(header), file_path, TextRange::line_start(0), 1))
    }

    /// Root include node for a file given by path.
    pub fn prepare_file(
        &self,
        file: &Path,
    ) -> HierarchyNode
    {
        let name = file
            .file_name()
            .map(|n| {
                n.to_string_lossy()
                    .into_owned()
            })
            .unwrap_or_else(|| {
                file.to_string_lossy()
                    .into_owned()
            });

        self.include_node(&name, file.to_path_buf(), TextRange::line_start(0), 1)
    }

    /// Edges pointing at `node`.
    #[instrument(skip(self, node, cancel), fields(name = %node.name))]
    pub fn incoming(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
    ) -> Expansion
    {
        let mut exp = Expansion::default();
        let result = match node.origin
        {
            NodeOrigin::Include => self.incoming_includes(node, cancel, &mut exp),
            NodeOrigin::Symbol => self.incoming_calls(node, cancel, &mut exp),
        };

        finish(exp, result)
    }

    /// Edges leaving `node`.
    #[instrument(skip(self, node, cancel), fields(name = %node.name))]
    pub fn outgoing(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
    ) -> Expansion
    {
        let mut exp = Expansion::default();
        let result = match node.origin
        {
            NodeOrigin::Include => self.outgoing_includes(node, cancel, &mut exp),
            NodeOrigin::Symbol => self.outgoing_calls(node, cancel, &mut exp),
        };

        finish(exp, result)
    }

    /// Expand `root` level by level up to `depth`. Symbols already on the
    /// path from the root are shown but not expanded again.
    pub fn expand(
        &self,
        root: HierarchyNode,
        direction: Direction,
        depth: usize,
        cancel: &CancelToken,
    ) -> HierarchyTree
    {
        let mut path = Vec::new();
        self.expand_inner(root, Vec::new(), direction, depth, cancel, &mut path)
    }

    fn expand_inner(
        &self,
        node: HierarchyNode,
        site_ranges: Vec<TextRange>,
        direction: Direction,
        depth: usize,
        cancel: &CancelToken,
        path: &mut Vec<(NodeOrigin, String)>,
    ) -> HierarchyTree
    {
        let key = (node.origin, node.name.clone());
        let recursive = path.contains(&key);
        let mut tree = HierarchyTree {
            node,
            site_ranges,
            children: Vec::new(),
            warnings: Vec::new(),
            failure: None,
            recursive,
        };

        if recursive || depth == 0 || cancel.is_cancelled()
        {
            return tree;
        }

        let exp = match direction
        {
            Direction::Incoming => self.incoming(&tree.node, cancel),
            Direction::Outgoing => self.outgoing(&tree.node, cancel),
        };

        tree.warnings = exp
            .warnings
            .iter()
            .map(ToString::to_string)
            .collect();
        tree.failure = exp
            .failure
            .as_ref()
            .map(ToString::to_string);

        path.push(key);
        for edge in exp.edges
        {
            let child = match direction
            {
                Direction::Incoming => edge.from,
                Direction::Outgoing => edge.to,
            };
            tree.children
                .push(self.expand_inner(child, edge.site_ranges, direction, depth - 1, cancel, path));
        }
        path.pop();

        tree
    }

    fn incoming_calls(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
        exp: &mut Expansion,
    ) -> Result<(), HierarchyError>
    {
        if stop(cancel, exp)
        {
            return Ok(());
        }

        let callers = dedup_last_per_line(
            self.provider
                .find_callers(&node.name)?,
        );
        let mut kinds = HashMap::new();

        for rec in callers
        {
            if stop(cancel, exp)
            {
                return Ok(());
            }

            // Site: the called name on the caller's line. In definition
            // mode the caller lands on the called symbol's definition.
            let site = self.token_or_line_start(&rec.file_path, rec.line_index(), &node.name, exp);
            let Some(from) = self.symbol_node(&rec, site, &node.name, &mut kinds, cancel, exp)?
            else
            {
                return Ok(());
            };

            exp.edges
                .push(CallEdge { from, to: node.clone(), site_ranges: vec![site] });
        }

        Ok(())
    }

    fn outgoing_calls(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
        exp: &mut Expansion,
    ) -> Result<(), HierarchyError>
    {
        if stop(cancel, exp)
        {
            return Ok(());
        }

        let callees = self
            .provider
            .find_callees(&node.name)?;
        let mut kinds = HashMap::new();

        for rec in callees
        {
            if stop(cancel, exp)
            {
                return Ok(());
            }

            let site = self.token_or_line_start(&rec.file_path, rec.line_index(), &rec.name, exp);
            let Some(to) = self.symbol_node(&rec, site, &rec.name, &mut kinds, cancel, exp)?
            else
            {
                return Ok(());
            };

            exp.edges
                .push(CallEdge { from: node.clone(), to, site_ranges: vec![site] });
        }

        Ok(())
    }

    fn incoming_includes(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
        exp: &mut Expansion,
    ) -> Result<(), HierarchyError>
    {
        if stop(cancel, exp)
        {
            return Ok(());
        }

        let includers = self
            .provider
            .find_includers(&node.name)?;

        for rec in includers
        {
            if stop(cancel, exp)
            {
                return Ok(());
            }

            let site = self.token_or_line_start(&rec.file_path, rec.line_index(), &node.name, exp);
            let from = self.include_node(&rec.name, rec.file_path.clone(), site, rec.line);

            exp.edges
                .push(CallEdge { from, to: node.clone(), site_ranges: vec![site] });
        }

        Ok(())
    }

    /// Outgoing includes come from the file text, not from a query.
    fn outgoing_includes(
        &self,
        node: &HierarchyNode,
        cancel: &CancelToken,
        exp: &mut Expansion,
    ) -> Result<(), HierarchyError>
    {
        if stop(cancel, exp)
        {
            return Ok(());
        }

        let text = self
            .source
            .read_file(&node.file_path)?;
        let lines = LineIndex::build(&text);

        for idx in 0..lines.line_count()
        {
            let Some(directive) = lines
                .line(idx)
                .and_then(|l| range::include_directive(l, idx))
            else
            {
                continue;
            };

            let target = self.locate_header(&node.file_path, &directive.header);
            let to = self.include_node(
                directive.header_name(),
                target,
                TextRange::line_start(0),
                1,
            );

            exp.edges
                .push(CallEdge { from: node.clone(), to, site_ranges: vec![directive.range] });
        }

        Ok(())
    }

    /// Node for a symbol record: kind from the tag store, location at the
    /// record's site or, per `click_target`, at the definition of `target`.
    /// `None` when cancelled before the definition lookup.
    fn symbol_node(
        &self,
        rec: &SymbolRecord,
        site: TextRange,
        target: &str,
        kinds: &mut HashMap<String, SymbolKind>,
        cancel: &CancelToken,
        exp: &mut Expansion,
    ) -> Result<Option<HierarchyNode>, HierarchyError>
    {
        let kind = self.kind_of(&rec.name, kinds)?;
        let show = self
            .options
            .show_file_names;

        let mut node = HierarchyNode {
            kind,
            name: rec
                .name
                .clone(),
            detail: rec.description(show),
            file_path: rec
                .file_path
                .clone(),
            range: site,
            origin: NodeOrigin::Symbol,
        };

        if self
            .options
            .click_target
            != ClickTarget::Definition
        {
            return Ok(Some(node));
        }

        if stop(cancel, exp)
        {
            return Ok(None);
        }

        if let Some(def) = self
            .provider
            .find_definition(target)?
        {
            node.range = self.token_or_line_start(&def.file_path, def.line_index(), &def.name, exp);
            node.detail = def.description(show);
            node.file_path = def.file_path;
        }

        Ok(Some(node))
    }

    fn include_node(
        &self,
        name: &str,
        file_path: PathBuf,
        range: TextRange,
        line: usize,
    ) -> HierarchyNode
    {
        HierarchyNode {
            kind: SymbolKind::File,
            name: name.to_string(),
            detail: describe(
                &file_path,
                line,
                self.options
                    .show_file_names,
            ),
            file_path,
            range,
            origin: NodeOrigin::Include,
        }
    }

    fn kind_of(
        &self,
        name: &str,
        kinds: &mut HashMap<String, SymbolKind>,
    ) -> Result<SymbolKind, HierarchyError>
    {
        if let Some(kind) = kinds.get(name)
        {
            return Ok(*kind);
        }

        let entries = self
            .provider
            .tag_entries(name)?;
        let kind = classify(name, &entries, self.source);

        kinds.insert(name.to_string(), kind);
        Ok(kind)
    }

    /// Token range, degraded to the start of the line when the token or
    /// the file cannot be found.
    fn token_or_line_start(
        &self,
        file: &Path,
        line: usize,
        token: &str,
        exp: &mut Expansion,
    ) -> TextRange
    {
        match range::resolve_token(self.source, file, line, token)
        {
            Ok(r) => r,
            Err(e @ HierarchyError::RangeNotFound { .. }) =>
            {
                debug!("{e}; using line start");
                TextRange::line_start(line)
            }
            Err(e) =>
            {
                warn!("{e}");
                exp.warnings
                    .push(e);
                TextRange::line_start(line)
            }
        }
    }

    /// Header path: next to the including file, else from the root.
    fn locate_header(
        &self,
        includer: &Path,
        header: &str,
    ) -> PathBuf
    {
        let sibling = includer
            .parent()
            .map(|d| d.join(header))
            .unwrap_or_else(|| PathBuf::from(header));

        [sibling, PathBuf::from(header)]
            .into_iter()
            .find(|p| {
                self.source
                    .read_file(p)
                    .is_ok()
            })
            .unwrap_or_else(|| PathBuf::from(header))
    }
}

fn stop(
    cancel: &CancelToken,
    exp: &mut Expansion,
) -> bool
{
    if cancel.is_cancelled()
    {
        exp.cancelled = true;
    }
    exp.cancelled
}

fn finish(
    mut exp: Expansion,
    result: Result<(), HierarchyError>,
) -> Expansion
{
    if let Err(e) = result
    {
        warn!("expansion failed: {e}");
        exp.edges
            .clear();
        exp.failure = Some(e);
    }
    exp
}

fn header_name(header: &str) -> &str
{
    header
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(header)
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn rec(
        name: &str,
        line: usize,
    ) -> SymbolRecord
    {
        SymbolRecord::new(name, "a.c", line)
    }

    #[test]
    fn test_last_record_per_line_wins()
    {
        let out = dedup_last_per_line(vec![rec("a", 5), rec("b", 5), rec("c", 9)]);
        assert_eq!(out, vec![rec("b", 5), rec("c", 9)]);
    }

    #[test]
    fn test_dedup_keeps_first_seen_line_order()
    {
        let out = dedup_last_per_line(vec![rec("x", 9), rec("y", 2), rec("z", 9)]);
        assert_eq!(out, vec![rec("z", 9), rec("y", 2)]);
    }

    #[test]
    fn test_same_line_number_in_different_files_is_not_merged()
    {
        let out = dedup_last_per_line(vec![
            SymbolRecord::new("f", "a.c", 3),
            SymbolRecord::new("g", "b.c", 3),
        ]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_header_name()
    {
        assert_eq!(header_name("sys/types.h"), "types.h");
        assert_eq!(header_name("foo.h"), "foo.h");
    }
}
