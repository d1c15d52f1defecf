use anyhow::Result;
use callscope::{
    cli::{AppContext, Cli, Commands},
    cli_ext::{db_cmd, hierarchy_cmd},
    core::hierarchy::Direction,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        json: cli.json,
        root: cli.root,
        backend: cli.backend,
    };

    match cli.command {
        Commands::Callers(args) => hierarchy_cmd::run_calls(args, Direction::Incoming, &ctx),
        Commands::Callees(args) => hierarchy_cmd::run_calls(args, Direction::Outgoing, &ctx),
        Commands::Includers(args) => hierarchy_cmd::run_includers(args, &ctx),
        Commands::Includes(args) => hierarchy_cmd::run_includes(args, &ctx),
        Commands::Kind(args) => hierarchy_cmd::run_kind(args, &ctx),
        Commands::Build(args) => db_cmd::run_build(args, &ctx),
        Commands::Index(args) => db_cmd::run_index(args, &ctx),
        Commands::Tools => db_cmd::run_tools(&ctx),
        Commands::Init(args) => callscope::infra::config::init(args, &ctx),
        Commands::Completions(args) => callscope::completion::run(args, &ctx),
    }
}

/// `CALLSCOPE_LOG` wins; otherwise warnings only, or debug/trace with -v/-vv.
fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "callscope=debug",
        _ => "callscope=trace",
    };

    let filter = EnvFilter::try_from_env("CALLSCOPE_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
