//! cscope/readtags query client.
//!
//! Each relation is one line-mode cscope query (`-L<code>`) against the
//! cross-reference store; kinds come from readtags against the tag store.
//! A failing process is an error, never an empty result, so "no callers"
//! and "the query broke" stay distinguishable.

use tracing::{debug, instrument, warn};

use crate::core::{
    error::HierarchyError,
    kind::TagEntry,
    process::{CommandRunner, Invocation, SystemRunner},
    provider::RelationProvider,
    record::{SymbolRecord, parse_lines},
    workspace::IndexContext,
};

/// readtags formatter producing `<name> <file> <line> <kind>`
pub const TAG_FORMAT: &str = r#"(list $name " " $input " " $line " " $kind #t)"#;

/// cscope line-mode query selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryCode
{
    Definition,
    Callees,
    Callers,
    FileOfSymbol,
    Includers,
}

impl QueryCode
{
    pub fn code(self) -> u8
    {
        match self
        {
            QueryCode::Definition => 1,
            QueryCode::Callees => 2,
            QueryCode::Callers => 3,
            QueryCode::FileOfSymbol => 7,
            QueryCode::Includers => 8,
        }
    }
}

/// Query client over an external runner.
pub struct IndexClient<R = SystemRunner>
{
    ctx: IndexContext,
    runner: R,
}

impl IndexClient<SystemRunner>
{
    pub fn new(ctx: IndexContext) -> Self
    {
        Self::with_runner(ctx, SystemRunner)
    }
}

impl<R: CommandRunner> IndexClient<R>
{
    pub fn with_runner(
        ctx: IndexContext,
        runner: R,
    ) -> Self
    {
        Self { ctx, runner }
    }

    pub fn context(&self) -> &IndexContext
    {
        &self.ctx
    }

    pub fn runner(&self) -> &R
    {
        &self.runner
    }

    /// `<cscope> -d -f <db> -L<code> <symbol>`
    pub fn cscope_invocation(
        &self,
        query: QueryCode,
        symbol: &str,
    ) -> Invocation
    {
        Invocation::new(&self.ctx.tools.cscope, &self.ctx.root)
            .arg("-d")
            .arg("-f")
            .arg(IndexContext::tool_arg(&self.ctx.cscope_db))
            .arg(format!("-L{}", query.code()))
            .arg(symbol)
    }

    /// `<readtags> -t <tags> -F <format> <symbol>`
    pub fn readtags_invocation(
        &self,
        symbol: &str,
    ) -> Invocation
    {
        Invocation::new(&self.ctx.tools.readtags, &self.ctx.root)
            .arg("-t")
            .arg(IndexContext::tool_arg(&self.ctx.ctags_db))
            .arg("-F")
            .arg(TAG_FORMAT)
            .arg(symbol)
    }

    /// Run a query; non-zero exit or any stderr text is a failure.
    fn run(
        &self,
        invocation: &Invocation,
    ) -> Result<String, HierarchyError>
    {
        let failed = |reason: String| HierarchyError::QueryFailed {
            command: invocation.to_string(),
            reason,
        };

        let out = self
            .runner
            .run(invocation)
            .map_err(|e| failed(format!("cannot start: {e}")))?;

        if !out.success
            || !out
                .stderr
                .trim()
                .is_empty()
        {
            let err = failed(out.reason());
            warn!("{err}");
            return Err(err);
        }

        Ok(out.stdout)
    }

    fn query(
        &self,
        code: QueryCode,
        symbol: &str,
        parse: fn(&str) -> Result<SymbolRecord, HierarchyError>,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        let out = self.run(&self.cscope_invocation(code, symbol))?;
        let records = parse_lines(&out, parse);

        debug!(?code, symbol, count = records.len(), "query done");
        Ok(records)
    }
}

impl<R: CommandRunner> RelationProvider for IndexClient<R>
{
    fn backend(&self) -> &'static str
    {
        "cscope"
    }

    #[instrument(skip(self))]
    fn find_definition(
        &self,
        name: &str,
    ) -> Result<Option<SymbolRecord>, HierarchyError>
    {
        Ok(self
            .query(QueryCode::Definition, name, SymbolRecord::parse_call_site)?
            .into_iter()
            .next())
    }

    #[instrument(skip(self))]
    fn find_callers(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        self.query(QueryCode::Callers, name, SymbolRecord::parse_call_site)
    }

    #[instrument(skip(self))]
    fn find_callees(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        self.query(QueryCode::Callees, name, SymbolRecord::parse_call_site)
    }

    #[instrument(skip(self))]
    fn find_includers(
        &self,
        header: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        self.query(QueryCode::Includers, header, SymbolRecord::parse_file_record)
    }

    #[instrument(skip(self))]
    fn find_file(
        &self,
        name: &str,
    ) -> Result<Vec<SymbolRecord>, HierarchyError>
    {
        self.query(QueryCode::FileOfSymbol, name, SymbolRecord::parse_file_record)
    }

    #[instrument(skip(self))]
    fn tag_entries(
        &self,
        name: &str,
    ) -> Result<Vec<TagEntry>, HierarchyError>
    {
        let out = self.run(&self.readtags_invocation(name))?;

        Ok(TagEntry::parse_all(&out))
    }
}
