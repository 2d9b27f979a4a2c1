//! Post pages.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use super::escape_xml;
use crate::cache::ContentItem;
use crate::compiler::Bundle;
use crate::config::SiteConfig;
use crate::post::{PostData, PostId};

/// What [`write_page`] did for a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Written(PathBuf),
    /// Draft post while drafts are disabled; any stale page was removed.
    SkippedDraft,
}

/// Directory holding a post's page: `<output>/<year>/<month>/<slug>`.
pub fn page_dir(output: &Path, id: &PostId) -> PathBuf {
    output.join(id.year()).join(id.month()).join(id.slug())
}

pub fn output_path(output: &Path, id: &PostId) -> PathBuf {
    page_dir(output, id).join("index.html")
}

/// Render and write the page for `item`.
pub async fn write_page(config: &SiteConfig, item: &Arc<ContentItem>) -> Result<PageOutcome> {
    let data = item.data().await?;
    let id = item.location().id();

    if data.is_draft() && !config.build.drafts {
        remove_page(&config.build.output, id).await?;
        return Ok(PageOutcome::SkippedDraft);
    }

    let bundle = item.bundle().await?;
    let html = render_page(&config.site.title, &data, &bundle);

    let path = output_path(&config.build.output, id);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(&path, html)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(PageOutcome::Written(path))
}

/// Remove a post's page directory. Returns whether there was one.
pub async fn remove_page(output: &Path, id: &PostId) -> io::Result<bool> {
    match tokio::fs::remove_dir_all(page_dir(output, id)).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Minimal standalone HTML document for one post.
pub fn render_page(site_title: &str, data: &PostData, bundle: &Bundle) -> String {
    let title = escape_xml(data.title());
    let mut html = String::with_capacity(bundle.html.len() + 512);

    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{} | {}</title>", title, escape_xml(site_title));
    if let Some(summary) = &data.meta.summary {
        let _ = writeln!(
            html,
            "<meta name=\"description\" content=\"{}\">",
            escape_xml(summary)
        );
    }
    html.push_str("</head>\n<body>\n<article>\n<header>\n");
    let _ = writeln!(html, "<h1>{title}</h1>");
    if let Some(date) = &data.meta.date {
        let date = escape_xml(date);
        let _ = writeln!(html, "<time datetime=\"{date}\">{date}</time>");
    }
    html.push_str("</header>\n");

    if bundle.headings.len() > 1 {
        html.push_str("<nav class=\"toc\">\n<ul>\n");
        for heading in &bundle.headings {
            let _ = writeln!(
                html,
                "<li class=\"h{}\"><a href=\"#{}\">{}</a></li>",
                heading.level,
                escape_xml(&heading.id),
                escape_xml(&heading.text)
            );
        }
        html.push_str("</ul>\n</nav>\n");
    }

    html.push_str(&bundle.html);
    html.push_str("</article>\n</body>\n</html>\n");
    html
}
