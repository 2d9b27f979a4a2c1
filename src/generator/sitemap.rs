//! Sitemap generation.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
//!   <url>
//!     <loc>https://example.com/2021/06/x/</loc>
//!     <lastmod>2021-06-01</lastmod>
//!   </url>
//! </urlset>
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::escape_xml;
use crate::cache::ItemCache;
use crate::config::SiteConfig;
use crate::enumerate::{ListOptions, list_all};
use crate::log;
use crate::post::JsonMap;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const SITEMAP_FILE: &str = "sitemap.xml";

/// Write `sitemap.xml` if enabled. Returns the written path.
pub async fn build_sitemap(config: &SiteConfig, cache: &ItemCache) -> Result<Option<PathBuf>> {
    if !config.build.sitemap {
        return Ok(None);
    }

    let options = ListOptions {
        limit: None,
        include_drafts: config.build.drafts,
    };
    let posts = list_all(cache, &["href", "date"], &options)
        .await
        .context("Failed to list posts for the sitemap")?;

    let base_url = config.site.url.as_deref().unwrap_or_default();
    let xml = Sitemap::from_posts(base_url, &posts).into_xml();

    let path = config.build.output.join(SITEMAP_FILE);
    tokio::fs::write(&path, xml)
        .await
        .with_context(|| format!("Failed to write sitemap to {}", path.display()))?;

    log!("sitemap"; "{} ({} urls)", SITEMAP_FILE, posts.len());
    Ok(Some(path))
}

struct Sitemap {
    urls: Vec<UrlEntry>,
}

struct UrlEntry {
    loc: String,
    lastmod: Option<String>,
}

impl Sitemap {
    /// Posts without an `href` are left out.
    fn from_posts(base_url: &str, posts: &[JsonMap]) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let urls = posts
            .iter()
            .filter_map(|post| {
                let href = post.get("href")?.as_str()?;
                Some(UrlEntry {
                    loc: format!("{base_url}{href}/"),
                    lastmod: post.get("date").and_then(|d| d.as_str()).map(String::from),
                })
            })
            .collect();
        Self { urls }
    }

    fn into_xml(self) -> String {
        let mut xml = String::with_capacity(4096);

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<urlset xmlns=\"");
        xml.push_str(SITEMAP_NS);
        xml.push_str("\">\n");

        for entry in self.urls {
            xml.push_str("  <url>\n    <loc>");
            xml.push_str(&escape_xml(&entry.loc));
            xml.push_str("</loc>\n");
            if let Some(lastmod) = entry.lastmod {
                xml.push_str("    <lastmod>");
                xml.push_str(&escape_xml(&lastmod));
                xml.push_str("</lastmod>\n");
            }
            xml.push_str("  </url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }
}
