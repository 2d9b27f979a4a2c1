//! Watch mode: build once, then keep pages in sync with the content dir.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::build::build_site;
use crate::cache::ItemCache;
use crate::config::SiteConfig;
use crate::generator::{PageOutcome, build_sitemap, remove_page, write_page};
use crate::log;
use crate::logger::{Outcome, status};
use crate::watch::{self, ChangeEvent, ChangeKind, ChangeWatcher};

/// `watch` command. Runs until Ctrl-C.
pub async fn run(config: Arc<SiteConfig>, cache: Arc<ItemCache>) -> Result<()> {
    let (tx, mut rx) = mpsc::channel(64);

    // Attach before the initial build so edits made during it are queued.
    let watcher =
        ChangeWatcher::new(tx, cache.root().clone()).context("Failed to start file watcher")?;

    match build_site(&config, &cache, false).await {
        Ok(report) => report.log_failures(),
        Err(e) => log!("error"; "{:#}", e),
    }

    let watcher_task = tokio::spawn(watcher.run());
    log!("watch"; "watching {} (Ctrl-C to stop)", config.content.dir.display());

    loop {
        tokio::select! {
            Some(event) = rx.recv() => on_change(&config, &cache, event).await,
            _ = tokio::signal::ctrl_c() => break,
            else => break,
        }
    }

    watcher_task.abort();
    log!("watch"; "stopped");
    Ok(())
}

/// Invalidate the post, then bring its page (and the sitemap) up to date.
async fn on_change(config: &SiteConfig, cache: &ItemCache, event: ChangeEvent) {
    watch::apply(cache, &event);
    let location = &event.location;

    match event.kind {
        ChangeKind::Removed => match remove_page(&config.build.output, location.id()).await {
            Ok(true) => status(Outcome::Done, &format!("removed: {location}")),
            Ok(false) => status(Outcome::Skipped, &format!("removed: {location} (no page)")),
            Err(e) => status(Outcome::Failed, &format!("failed to remove: {location}\n{e}")),
        },
        ChangeKind::Created | ChangeKind::Modified => {
            let item = cache.get(location);
            match write_page(config, &item).await {
                Ok(PageOutcome::Written(_)) => {
                    status(Outcome::Done, &format!("{}: {location}", rebuilt_label(event.kind)));
                }
                Ok(PageOutcome::SkippedDraft) => {
                    status(Outcome::Skipped, &format!("draft: {location}"));
                }
                Err(e) => {
                    status(Outcome::Failed, &format!("failed: {location}\n{e:#}"));
                    return;
                }
            }
        }
    }

    if let Err(e) = build_sitemap(config, cache).await {
        log!("error"; "{:#}", e);
    }
}

fn rebuilt_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Created => "built",
        _ => "rebuilt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::MarkdownCompiler;
    use crate::generator::output_path;
    use crate::post::{PostId, resolve};
    use tempfile::TempDir;

    fn make_site() -> (TempDir, SiteConfig, ItemCache) {
        let temp = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.finalize(temp.path());
        std::fs::create_dir_all(&config.content.dir).unwrap();
        let cache = ItemCache::new(config.content_root(), Arc::new(MarkdownCompiler::default()));
        (temp, config, cache)
    }

    fn write_source(cache: &ItemCache, id: &PostId, source: &str) {
        let path = cache.root().source_path(&resolve(id));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, source).unwrap();
    }

    fn event(id: &PostId, kind: ChangeKind) -> ChangeEvent {
        ChangeEvent {
            location: resolve(id),
            kind,
        }
    }

    #[tokio::test]
    async fn test_change_rebuilds_page() {
        let (_temp, config, cache) = make_site();
        let id = PostId::new("2021", "06", "x").unwrap();
        let page = output_path(&config.build.output, &id);

        write_source(&cache, &id, "---\ntitle: First\n---\nbody\n");
        on_change(&config, &cache, event(&id, ChangeKind::Created)).await;
        assert!(std::fs::read_to_string(&page).unwrap().contains("First"));

        write_source(&cache, &id, "---\ntitle: Second\n---\nbody\n");
        on_change(&config, &cache, event(&id, ChangeKind::Modified)).await;
        assert!(std::fs::read_to_string(&page).unwrap().contains("Second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.lookup(&id).stats().reads, 2);
    }

    #[tokio::test]
    async fn test_removed_post_removes_page() {
        let (_temp, config, cache) = make_site();
        let id = PostId::new("2021", "06", "x").unwrap();
        let page = output_path(&config.build.output, &id);

        write_source(&cache, &id, "---\ntitle: X\n---\nbody\n");
        on_change(&config, &cache, event(&id, ChangeKind::Created)).await;
        assert!(page.exists());

        std::fs::remove_dir_all(cache.root().post_dir(&resolve(&id))).unwrap();
        on_change(&config, &cache, event(&id, ChangeKind::Removed)).await;

        assert!(!page.exists());
        assert!(cache.lookup(&id).content().await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_old_page() {
        let (_temp, config, cache) = make_site();
        let id = PostId::new("2021", "06", "x").unwrap();
        let page = output_path(&config.build.output, &id);

        write_source(&cache, &id, "---\ntitle: Good\n---\nbody\n");
        on_change(&config, &cache, event(&id, ChangeKind::Created)).await;

        write_source(&cache, &id, "---\ntitle broken\n---\nbody\n");
        on_change(&config, &cache, event(&id, ChangeKind::Modified)).await;

        assert!(std::fs::read_to_string(&page).unwrap().contains("Good"));
        assert!(cache.lookup(&id).data().await.is_err());
    }
}
