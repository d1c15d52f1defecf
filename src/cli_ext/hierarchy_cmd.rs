//! CLI handlers for the hierarchy views: callers, callees, includers,
//! includes and kind lookups.

use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde_json::json;
use tracing::instrument;

use crate::{
    cli::{AppContext, HierarchyArgs, IncludersArgs, IncludesArgs, KindArgs},
    cli_ext::session::Session,
    core::{
        hierarchy::{Direction, GraphBuilder, HierarchyOptions, HierarchyTree},
        kind::classify,
        render::{render_json, render_tree},
    },
    infra::config::Config,
};

/// Parse `file:line[:col]` (1-based) into a 0-based position.
pub fn parse_position(text: &str) -> Result<(PathBuf, usize, usize)>
{
    let mut parts = text.rsplitn(3, ':');
    let last = parts
        .next()
        .unwrap_or_default();
    let middle = parts.next();
    let first = parts.next();

    let number = |s: &str, what: &str| -> Result<usize> {
        let n: usize = s
            .parse()
            .with_context(|| format!("Invalid {what} in position: {s}"))?;
        if n == 0
        {
            anyhow::bail!("{what} numbers start at 1");
        }
        Ok(n - 1)
    };

    match (first, middle)
    {
        // file:line:col, unless the "line" is part of a Windows path
        (Some(file), Some(line)) if line.parse::<usize>().is_ok() =>
        {
            Ok((PathBuf::from(file), number(line, "line")?, number(last, "column")?))
        }
        (Some(file), Some(rest)) => Ok((PathBuf::from(format!("{file}:{rest}")), number(last, "line")?, 0)),
        (None, Some(file)) => Ok((PathBuf::from(file), number(last, "line")?, 0)),
        _ => anyhow::bail!("Invalid position format: expected 'file:line[:col]'"),
    }
}

fn options(
    config: &Config,
    args: &HierarchyArgs,
) -> HierarchyOptions
{
    let mut options = config.hierarchy;

    if let Some(target) = args.click_target
    {
        options.click_target = target;
    }
    if args.no_file_names
    {
        options.show_file_names = false;
    }
    options
}

/// `callers` / `callees`
#[instrument(skip(args, ctx))]
pub fn run_calls(
    args: HierarchyArgs,
    direction: Direction,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::open(ctx)?;
    let builder = GraphBuilder::new(session.provider(), &session.source, options(&session.config, &args));

    let root = match (&args.at, &args.symbol)
    {
        (Some(at), _) =>
        {
            let (file, line, col) = parse_position(at)?;
            builder.prepare(&file, line, col)?
        }
        (None, Some(symbol)) => builder.prepare_symbol(symbol)?,
        (None, None) => anyhow::bail!("Give a symbol name or --at FILE:LINE[:COL]"),
    };

    let Some(root) = root
    else
    {
        if !ctx.quiet
        {
            eprintln!("{}", "No symbol found".yellow());
        }
        return Ok(());
    };

    let tree = builder.expand(root, direction, args.depth, &session.cancel);
    emit(&tree, &session, ctx)
}

/// `includers <header>`
pub fn run_includers(
    args: IncludersArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::open(ctx)?;
    let builder = GraphBuilder::new(session.provider(), &session.source, session.config.hierarchy);

    let root = builder.prepare_header(&args.header)?;
    let tree = builder.expand(root, Direction::Incoming, args.depth, &session.cancel);
    emit(&tree, &session, ctx)
}

/// `includes <file>`
pub fn run_includes(
    args: IncludesArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::open(ctx)?;
    let builder = GraphBuilder::new(session.provider(), &session.source, session.config.hierarchy);

    let root = builder.prepare_file(&args.file);
    let tree = builder.expand(root, Direction::Outgoing, args.depth, &session.cancel);
    emit(&tree, &session, ctx)
}

/// `kind <symbol>`
pub fn run_kind(
    args: KindArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let session = Session::open(ctx)?;
    let entries = session
        .provider()
        .tag_entries(&args.symbol)?;
    let kind = classify(&args.symbol, &entries, &session.source);

    if ctx.json
    {
        let output = json!({
            "name": args.symbol,
            "kind": kind,
            "backend": session.provider().backend(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    else if ctx.color()
    {
        println!("{}  {}", args.symbol.cyan(), kind.to_string().blue());
    }
    else
    {
        println!("{}  {}", args.symbol, kind);
    }
    Ok(())
}

fn emit(
    tree: &HierarchyTree,
    session: &Session,
    ctx: &AppContext,
) -> Result<()>
{
    if ctx.json
    {
        println!("{}", render_json(tree)?);
    }
    else
    {
        print!("{}", render_tree(tree, ctx.color())?);
    }

    if session
        .cancel
        .is_cancelled()
        && !ctx.quiet
    {
        eprintln!("{}", "Interrupted; showing partial results".yellow());
    }
    Ok(())
}
