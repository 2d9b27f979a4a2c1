//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lazy post cache and blog builder
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output directory path (relative to current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to current directory)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::DirPath)]
    pub content: Option<PathBuf>,

    /// Config file name, searched upward from the current directory
    #[arg(short = 'C', long, global = true, default_value = "postcache.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render every post into the output directory
    #[command(visible_alias = "b")]
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Build, then rebuild posts as they change on disk
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Look up a single post by identity
    #[command(visible_alias = "q")]
    Query {
        #[command(flatten)]
        args: QueryArgs,
    },

    /// List all posts, newest first
    #[command(visible_alias = "l")]
    List {
        #[command(flatten)]
        args: ListArgs,
    },
}

/// Shared arguments for Build and Watch
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Enable sitemap generation
    #[arg(short = 'S', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub sitemap: Option<bool>,

    /// Render draft posts too
    #[arg(short = 'D', long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub drafts: Option<bool>,
}

/// What `query` prints for the post.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Show {
    /// Location key and source path
    Location,
    /// Raw source text
    Content,
    /// Frontmatter merged with identity properties
    #[default]
    Data,
    /// Compiled bundle
    Bundle,
}

/// Query command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// Four-digit year, e.g. 2021
    pub year: String,

    /// Two-digit month, e.g. 06
    pub month: String,

    /// Post slug
    pub slug: String,

    /// Which derived value to print
    #[arg(short, long, value_enum, default_value_t)]
    pub show: Show,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,
}

/// List command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Fields to keep (comma-separated); `content` adds the raw source
    #[arg(short, long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,

    /// Keep at most this many posts
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Include draft posts
    #[arg(short, long)]
    pub drafts: bool,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,
}

impl Cli {
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch { .. })
    }

    /// Build arguments of the command, if it builds.
    pub fn build_args(&self) -> Option<&BuildArgs> {
        match &self.command {
            Commands::Build { build_args } | Commands::Watch { build_args } => Some(build_args),
            _ => None,
        }
    }
}
