//! skinforge CLI - multi-site theme asset builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "skinforge")]
#[command(about = "Build stylesheets, scripts, images and fonts for every configured theme")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the build config (.json or .toml)
    #[arg(short, long, default_value = "skinforge.json", global = true)]
    config: PathBuf,

    /// Minify output and write the fingerprint manifest
    #[arg(long, global = true)]
    production: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, compile every asset class, then fingerprint and run custom tasks
    Build,

    /// Run named tasks in order
    Run {
        /// clean, stylesheets, javascripts, modernizr, images, fonts,
        /// manifest, custom, default, serve or watch
        #[arg(required = true)]
        tasks: Vec<String>,
    },

    /// Start a live reload server per site
    Serve,

    /// Serve, and rebuild on source changes
    Watch,

    /// Write an example config
    Init {
        /// Overwrite an existing config
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let options = commands::Options {
        config: cli.config,
        production: cli.production,
    };

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => commands::build::run(&options).await?,
        Commands::Run { tasks } => commands::run::run(&options, &tasks).await?,
        Commands::Serve => commands::serve::run(&options).await?,
        Commands::Watch => commands::watch::run(&options).await?,
        Commands::Init { yes } => commands::init::run(&options.config, yes)?,
    }

    Ok(())
}
