//! postcache - lazy per-post content cache and builder for markdown blogs.

mod cache;
mod cli;
mod compiler;
mod config;
mod enumerate;
mod generator;
mod logger;
mod post;
mod utils;
mod watch;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::SiteConfig;

use crate::cache::ItemCache;
use crate::compiler::MarkdownCompiler;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    logger::set_verbose(cli.verbose);

    let config = Arc::new(SiteConfig::load(&cli)?);
    debug!("config"; "content {}, output {}", config.content.dir.display(), config.build.output.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run(cli, config))
}

async fn run(cli: Cli, config: Arc<SiteConfig>) -> Result<()> {
    // One cache per process, shared by everything the command does.
    let cache = Arc::new(ItemCache::new(
        config.content_root(),
        Arc::new(MarkdownCompiler::default()),
    ));

    match &cli.command {
        Commands::Build { .. } => cli::build::run(config, cache).await,
        Commands::Watch { .. } => cli::watch::run(config, cache).await,
        Commands::Query { args } => cli::query::run_query(&cache, args).await,
        Commands::List { args } => cli::query::run_list(&cache, args).await,
    }
}
