//! Builder CLI - drive a bundle-builder session against a live store.
//!
//! Commands:
//! - `builder prefetch` - Warm the catalog for every configured slot
//! - `builder slots` - List slots or browse the items of one slot
//! - `builder build` - Pick items per slot and add the build to the cart
//! - `builder config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, ConfigArgs, PrefetchArgs, SlotsArgs};

/// Builder CLI - Prefetch a store catalog and submit bundle builds
#[derive(Parser)]
#[command(name = "builder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every category the slots draw from
    Prefetch(PrefetchArgs),

    /// List slots or browse one slot's items
    Slots(SlotsArgs),

    /// Select items and add the build to the cart
    Build(BuildArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Human,
    Json,
}

/// `RUST_LOG` wins; otherwise warnings, or debug for this workspace with `--verbose`.
fn init_tracing(verbose: bool, format: LogFormat) {
    let fallback = if verbose {
        "warn,builder_engine=debug,builder_data=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Human => subscriber.with_target(false).init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format);

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), output)?;

    let result = match cli.command {
        Commands::Prefetch(args) => commands::prefetch::run(args, &ctx).await,
        Commands::Slots(args) => commands::slots::run(args, &ctx).await,
        Commands::Build(args) => commands::build::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
