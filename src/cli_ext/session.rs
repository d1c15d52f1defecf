//! Wiring shared by the query commands: configuration, backend choice,
//! progress bars, Ctrl-C cancellation and warning output.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::{
    cli::{AppContext, BackendArg},
    core::{
        cancel::CancelToken,
        database::DatabaseManager,
        error::HierarchyError,
        fallback::{FallbackIndex, FallbackIndexer},
        provider::RelationProvider,
        query::IndexClient,
        workspace::IndexContext,
    },
    infra::{
        config::{Config, load_config},
        source::FsSource,
        walk::SourceWalker,
    },
};

/// The relation source chosen for this run.
pub enum Backend
{
    Index(IndexClient),
    Fallback(FallbackIndex),
}

impl Backend
{
    pub fn provider(&self) -> &dyn RelationProvider
    {
        match self
        {
            Backend::Index(client) => client,
            Backend::Fallback(index) => index,
        }
    }
}

pub struct Session
{
    pub config: Config,
    pub source: FsSource,
    pub backend: Backend,
    pub cancel: CancelToken,
}

impl Session
{
    /// Load config, pick a backend and make sure it can answer queries.
    pub fn open(ctx: &AppContext) -> Result<Self>
    {
        let config = load_config().unwrap_or_default();
        let root = workspace_root(ctx)?;
        let index_ctx = config.index_context(&root);
        let cancel = cancel_on_interrupt()?;

        let use_index = match ctx.backend
        {
            BackendArg::Index => true,
            BackendArg::Fallback => false,
            BackendArg::Auto =>
            {
                let found = index_ctx
                    .tools
                    .all_found();
                if !found
                {
                    info!("index tools not found; using the source scanner");
                }
                found
            }
        };

        let backend = if use_index
        {
            ensure_stores(&index_ctx, ctx)?;
            Backend::Index(IndexClient::new(index_ctx))
        }
        else
        {
            Backend::Fallback(build_fallback(&config, &root, ctx, &cancel)?)
        };

        debug!(
            backend = backend
                .provider()
                .backend(),
            root = %root.display(),
            "session ready"
        );

        Ok(Self { config, source: FsSource::new(&root), backend, cancel })
    }

    pub fn provider(&self) -> &dyn RelationProvider
    {
        self.backend
            .provider()
    }
}

pub fn workspace_root(ctx: &AppContext) -> Result<PathBuf>
{
    dunce::canonicalize(&ctx.root)
        .with_context(|| format!("Workspace root not found: {}", ctx.root.display()))
}

/// Build whichever store is missing before the first query.
pub fn ensure_stores(
    index_ctx: &IndexContext,
    ctx: &AppContext,
) -> Result<()>
{
    let mgr = DatabaseManager::new(index_ctx.clone());

    if mgr
        .missing_steps()
        .is_empty()
    {
        return Ok(());
    }

    let pb = percent_bar(ctx, "building index");
    let report = mgr.ensure(&pb)?;
    pb.finish_and_clear();

    print_warnings(&report.failures, ctx);
    Ok(())
}

/// Scan sources with the regex indexer.
pub fn build_fallback(
    config: &Config,
    root: &Path,
    ctx: &AppContext,
    cancel: &CancelToken,
) -> Result<FallbackIndex>
{
    let walker = SourceWalker::new(&config.fallback.extensions, &config.ignore_patterns)?;
    let indexer = FallbackIndexer::new(root, walker, config.fallback.function_pattern.as_deref())
        .context("Invalid fallback.function_pattern")?;

    let pb = percent_bar(ctx, "scanning sources");
    let index = indexer.index(&pb, cancel)?;
    pb.finish_and_clear();

    Ok(index)
}

/// A 0..=100 bar fed by `Progress` increments; hidden when quiet.
pub fn percent_bar(
    ctx: &AppContext,
    message: &str,
) -> ProgressBar
{
    if ctx.quiet || ctx.json
    {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb.set_message(message.to_string());
    pb
}

/// Ctrl-C sets the token instead of killing the process, so an expansion
/// can stop between queries and still print what it has.
pub fn cancel_on_interrupt() -> Result<CancelToken>
{
    let token = CancelToken::new();

    signal_hook::flag::register(signal_hook::consts::SIGINT, token.flag())
        .context("Failed to install Ctrl-C handler")?;

    Ok(token)
}

/// Print recoverable errors as diagnostics on stderr.
pub fn print_warnings(
    errors: &[HierarchyError],
    ctx: &AppContext,
)
{
    if ctx.quiet
    {
        return;
    }

    for err in errors
    {
        eprintln!("{:?}", miette::Report::new(err.clone()));
    }
}
