//! CLI handlers for index maintenance: store builds, the source scanner
//! and tool discovery.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use serde_json::json;
use tabled::{Table, Tabled};
use tracing::instrument;

use crate::{
    cli::{AppContext, BuildArgs, IndexArgs},
    cli_ext::session::{build_fallback, cancel_on_interrupt, percent_bar, print_warnings, workspace_root},
    core::database::DatabaseManager,
    infra::config::load_config,
};

/// `build [--force]`
#[instrument(skip(ctx))]
pub fn run_build(
    args: BuildArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config().unwrap_or_default();
    let root = workspace_root(ctx)?;
    let mgr = DatabaseManager::new(config.index_context(&root));

    let pb = percent_bar(ctx, "building index");
    let report = if args.force
    {
        mgr.rebuild(&pb)?
    }
    else
    {
        mgr.ensure(&pb)?
    };
    pb.finish_and_clear();

    if ctx.json
    {
        let output = json!({
            "ran": report.ran,
            "failures": report.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "state": mgr.state(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    else if !ctx.quiet
    {
        if report.skipped()
        {
            println!("{}", "Index stores are up to date".green());
        }
        for step in &report.ran
        {
            if !report.failed(*step)
            {
                println!("{} {step} store", "Built".green());
            }
        }
    }

    print_warnings(&report.failures, ctx);

    if !report.is_ok()
    {
        anyhow::bail!("{} of {} build steps failed", report.failures.len(), report.ran.len());
    }
    Ok(())
}

/// `index [--dot FILE]`
#[instrument(skip(ctx))]
pub fn run_index(
    args: IndexArgs,
    ctx: &AppContext,
) -> Result<()>
{
    let config = load_config().unwrap_or_default();
    let root = workspace_root(ctx)?;
    let cancel = cancel_on_interrupt()?;

    let index = build_fallback(&config, &root, ctx, &cancel)?;

    if let Some(path) = &args.dot
    {
        std::fs::write(path, index.to_dot())
            .with_context(|| format!("Failed to write call graph to {}", path.display()))?;
    }

    if ctx.json
    {
        let output = json!({
            "functions": index.functions(),
            "includes": index.includes(),
            "skipped": index.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if !ctx.quiet
    {
        println!(
            "Indexed {} functions and {} calls",
            index
                .functions()
                .len()
                .to_string()
                .cyan(),
            index
                .call_count()
                .to_string()
                .cyan()
        );
        for path in &index.skipped
        {
            eprintln!("{} {}", "Skipped".yellow(), path.display());
        }
    }
    Ok(())
}

#[derive(Tabled)]
struct ToolRow
{
    tool: String,
    configured: String,
    resolved: String,
}

/// `tools`
pub fn run_tools(ctx: &AppContext) -> Result<()>
{
    let config = load_config().unwrap_or_default();
    let statuses = config
        .tools
        .expanded()
        .locate();

    if ctx.json
    {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    let rows: Vec<ToolRow> = statuses
        .iter()
        .map(|s| ToolRow {
            tool: s
                .name
                .to_string(),
            configured: s
                .configured
                .display()
                .to_string(),
            resolved: match &s.resolved
            {
                Some(p) => p
                    .display()
                    .to_string(),
                None if ctx.color() => "not found"
                    .red()
                    .to_string(),
                None => "not found".to_string(),
            },
        })
        .collect();

    println!("{}", Table::new(rows));

    if statuses
        .iter()
        .any(|s| s.resolved.is_none())
        && !ctx.quiet
    {
        eprintln!("Missing tools: queries will use the built-in source scanner (--backend fallback)");
    }
    Ok(())
}
