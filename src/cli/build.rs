//! Site building.
//!
//! Every post is rendered concurrently through the shared [`ItemCache`];
//! a failing post is reported and does not stop the others.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tokio::task::JoinSet;

use crate::cache::ItemCache;
use crate::config::SiteConfig;
use crate::enumerate::post_ids;
use crate::generator::{PageOutcome, build_sitemap, write_page};
use crate::log;
use crate::logger::ProgressLine;
use crate::post::Location;
use crate::utils::plural_count;

/// Outcome of one full build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub written: usize,
    pub drafts: usize,
    /// Failed posts with their full error chain.
    pub failed: Vec<(Location, String)>,
}

impl BuildReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log_failures(&self) {
        for (location, message) in &self.failed {
            log!("error"; "{}: {}", location, message);
        }
    }
}

/// Render every post, then the sitemap.
///
/// Errors only when the content or output directory is unusable; per-post
/// failures are collected in the report.
pub async fn build_site(
    config: &Arc<SiteConfig>,
    cache: &Arc<ItemCache>,
    quiet: bool,
) -> Result<BuildReport> {
    let ids = post_ids(cache.root()).await.with_context(|| {
        format!(
            "Failed to read content directory {}",
            cache.root().dir().display()
        )
    })?;
    tokio::fs::create_dir_all(&config.build.output)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                config.build.output.display()
            )
        })?;

    let progress = (!quiet).then(|| Arc::new(ProgressLine::new("posts", ids.len())));

    let mut tasks = JoinSet::new();
    for id in &ids {
        let item = cache.lookup(id);
        let config = Arc::clone(config);
        let progress = progress.clone();
        tasks.spawn(async move {
            let outcome = write_page(&config, &item).await;
            if let Some(progress) = &progress {
                progress.inc();
            }
            (item.location().clone(), outcome)
        });
    }

    let mut report = BuildReport::default();
    while let Some(joined) = tasks.join_next().await {
        let (location, outcome) = joined.context("Build task panicked")?;
        match outcome {
            Ok(PageOutcome::Written(_)) => report.written += 1,
            Ok(PageOutcome::SkippedDraft) => report.drafts += 1,
            Err(e) => report.failed.push((location, format!("{e:#}"))),
        }
    }
    report.failed.sort_by(|a, b| a.0.cmp(&b.0));

    if let Some(progress) = progress.and_then(Arc::into_inner) {
        progress.finish();
    }

    build_sitemap(config, cache).await?;

    if !quiet {
        log!(
            "build";
            "{} written, {} skipped, {} failed",
            plural_count(report.written, "page"),
            plural_count(report.drafts, "draft"),
            report.failed.len()
        );
    }
    Ok(report)
}

/// `build` command.
pub async fn run(config: Arc<SiteConfig>, cache: Arc<ItemCache>) -> Result<()> {
    let report = build_site(&config, &cache, false).await?;
    report.log_failures();
    if !report.is_ok() {
        bail!("{} failed", plural_count(report.failed.len(), "post"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MarkdownCompiler;
    use crate::generator::output_path;
    use crate::post::PostId;
    use tempfile::TempDir;

    fn make_site(posts: &[(&str, &str)]) -> (TempDir, Arc<SiteConfig>, Arc<ItemCache>) {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.finalize(temp.path());
        let root = config.content_root();
        std::fs::create_dir_all(root.dir()).unwrap();

        for (dir, source) in posts {
            let post_dir = root.dir().join(dir);
            std::fs::create_dir_all(&post_dir).unwrap();
            std::fs::write(post_dir.join("index.md"), source).unwrap();
        }

        let cache = ItemCache::new(root, Arc::new(MarkdownCompiler::default()));
        (temp, Arc::new(config), Arc::new(cache))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_build_writes_pages() {
        let (_temp, config, cache) = make_site(&[
            ("2021-06-x", "---\ntitle: X\n---\n# Hi\n"),
            ("2021-07-y", "---\ntitle: Y\n---\nbody\n"),
        ]);

        let report = build_site(&config, &cache, true).await.unwrap();

        assert!(report.is_ok());
        assert_eq!(report.written, 2);
        let id = PostId::new("2021", "06", "x").unwrap();
        let html = std::fs::read_to_string(output_path(&config.build.output, &id)).unwrap();
        assert!(html.contains("<title>X | Blog</title>"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_build_reports_failures_and_skips_drafts() {
        let (_temp, config, cache) = make_site(&[
            ("2021-06-ok", "---\ntitle: Ok\n---\nbody\n"),
            ("2021-06-broken", "---\ntitle broken\n---\nbody\n"),
            ("2021-06-draft", "---\ntitle: D\ndraft: true\n---\nbody\n"),
        ]);

        let report = build_site(&config, &cache, true).await.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.drafts, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.as_str(), "2021-06-broken/index");
        assert!(report.failed[0].1.contains("invalid frontmatter"));

        let draft = PostId::new("2021", "06", "draft").unwrap();
        assert!(!output_path(&config.build.output, &draft).exists());
    }

    #[tokio::test]
    async fn test_build_missing_content_dir() {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.finalize(temp.path());
        let cache = ItemCache::new(config.content_root(), Arc::new(MarkdownCompiler::default()));

        let err = build_site(&Arc::new(config), &Arc::new(cache), true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read content directory"));
    }
}
