//! Site configuration management for `postcache.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                     |
//! |-------------|---------------------------------------------|
//! | `[site]`    | Site metadata (title, absolute url)         |
//! | `[content]` | Where posts live and their file extension   |
//! | `[build]`   | Output directory, sitemap, draft rendering  |
//!
//! Relative paths are resolved against the directory holding the config
//! file. Without a config file, defaults are rooted at the working directory.

mod error;
mod util;

pub use error::ConfigError;
use util::{find_config_file, is_http_url};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cli::{BuildArgs, Cli};
use crate::log;
use crate::post::ContentRoot;
use crate::utils::path::normalize_path;

/// Root configuration structure representing postcache.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    pub site: SiteSection,
    pub content: ContentSection,
    pub build: BuildSection,
}

/// `[site]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub title: String,
    /// Absolute base URL, e.g. `https://example.com`. Required by the sitemap.
    pub url: Option<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "Blog".into(),
            url: None,
        }
    }
}

/// `[content]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub dir: PathBuf,
    /// Source file extension, without the dot.
    pub extension: String,
}

impl Default for ContentSection {
    fn default() -> Self {
        Self {
            dir: "content".into(),
            extension: "md".into(),
        }
    }
}

/// `[build]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub output: PathBuf,
    pub sitemap: bool,
    /// Render posts marked `draft: true`.
    pub drafts: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            output: "public".into(),
            sitemap: false,
            drafts: false,
        }
    }
}

impl SiteConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file, then applies CLI
    /// overrides and validates.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.config_path = path;
                config
            }
            None => {
                crate::debug!("config"; "{} not found, using defaults", cli.config.display());
                Self {
                    config_path: cwd.join(&cli.config),
                    ..Self::default()
                }
            }
        };

        let root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);
        config.finalize(&root);
        config.apply_cli(cli);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    pub fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {} (ignored): {}", display_path, fields.join(", "));
    }

    /// Resolve relative paths against `root`.
    pub fn finalize(&mut self, root: &Path) {
        self.root = root.to_path_buf();
        self.content.dir = normalize_path(&root.join(&self.content.dir));
        self.build.output = normalize_path(&root.join(&self.build.output));
        self.content.extension = self.content.extension.trim_start_matches('.').to_string();
        if let Some(url) = &mut self.site.url {
            *url = url.trim_end_matches('/').to_string();
        }
    }

    /// Apply CLI overrides. CLI paths are relative to the working directory.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.content {
            self.content.dir = normalize_path(dir);
        }
        if let Some(dir) = &cli.output {
            self.build.output = normalize_path(dir);
        }
        if let Some(args) = cli.build_args() {
            self.apply_build_args(args);
        }
    }

    fn apply_build_args(&mut self, args: &BuildArgs) {
        Self::update_option(&mut self.build.sitemap, args.sitemap.as_ref());
        Self::update_option(&mut self.build.drafts, args.drafts.as_ref());
    }

    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.content.extension.is_empty() {
            return Err(ConfigError::Validation(
                "[content] extension must not be empty".into(),
            ));
        }
        if self.content.dir == self.build.output {
            return Err(ConfigError::Validation(format!(
                "[build] output must differ from [content] dir ({})",
                self.build.output.display()
            )));
        }
        match &self.site.url {
            Some(url) if !is_http_url(url) => Err(ConfigError::Validation(format!(
                "[site] url must be an absolute http(s) URL, got `{url}`"
            ))),
            None if self.build.sitemap => Err(ConfigError::Validation(
                "[build] sitemap requires [site] url".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Layout of the configured content directory.
    pub fn content_root(&self) -> ContentRoot {
        ContentRoot::new(&self.content.dir, &self.content.extension)
    }
}
