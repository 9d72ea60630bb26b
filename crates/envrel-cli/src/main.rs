mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    config::ConfigSubcommand, edge_group::EdgeGroupSubcommand, env::EnvSubcommand,
    relations::RelationsSubcommand, tag::TagSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "envrel",
    about = "Manage environment groups, tags and edge group membership",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .envrel/)
    #[arg(long, global = true, env = "ENVREL_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config and database under .envrel/
    Init,

    /// Manage environments
    Env {
        #[command(subcommand)]
        subcommand: EnvSubcommand,
    },

    /// Manage tags
    Tag {
        #[command(subcommand)]
        subcommand: TagSubcommand,
    },

    /// Manage edge groups
    EdgeGroup {
        #[command(subcommand)]
        subcommand: EdgeGroupSubcommand,
    },

    /// Update environment relations
    Relations {
        #[command(subcommand)]
        subcommand: RelationsSubcommand,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Env { subcommand } => cmd::env::run(&root, subcommand, cli.json),
        Commands::Tag { subcommand } => cmd::tag::run(&root, subcommand, cli.json),
        Commands::EdgeGroup { subcommand } => cmd::edge_group::run(&root, subcommand, cli.json),
        Commands::Relations { subcommand } => cmd::relations::run(&root, subcommand, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
