//! Full listing of posts, for route and sitemap generation.
//!
//! Single lookups never go through here: they resolve an identity directly.

use std::cmp::Ordering;
use std::io;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::cache::{ContentItem, ItemCache};
use crate::post::{ContentRoot, JsonMap, PostData, PostId};

/// Pseudo-field projecting the raw source text.
pub const CONTENT_FIELD: &str = "content";

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Keep at most this many posts, after sorting.
    pub limit: Option<usize>,
    pub include_drafts: bool,
}

/// Identities of every post directory under the content root, sorted.
///
/// Entries whose name is not `YYYY-MM-slug` are skipped.
pub async fn post_ids(root: &ContentRoot) -> io::Result<Vec<PostId>> {
    let mut ids = Vec::new();
    let mut entries = tokio::fs::read_dir(root.dir()).await?;

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        match PostId::from_dir_name(name) {
            Ok(id) => ids.push(id),
            Err(e) => crate::debug!("list"; "skip {}: {}", name, e),
        }
    }

    ids.sort();
    Ok(ids)
}

/// Every readable post, newest first, projected onto `fields`.
///
/// Posts whose data fails to load are skipped. An empty `fields` keeps every
/// data key; [`CONTENT_FIELD`] adds the raw source. Unknown fields are
/// omitted from the projection.
pub async fn list_all<S: AsRef<str>>(
    cache: &ItemCache,
    fields: &[S],
    options: &ListOptions,
) -> io::Result<Vec<JsonMap>> {
    let items: Vec<Arc<ContentItem>> = post_ids(cache.root())
        .await?
        .iter()
        .map(|id| cache.lookup(id))
        .collect();

    let loaded = join_all(items.iter().map(|item| async move {
        let data = item.data().await;
        (item, data)
    }))
    .await;

    let mut posts: Vec<(&Arc<ContentItem>, Arc<PostData>)> = loaded
        .into_iter()
        .filter_map(|(item, data)| match data {
            Ok(data) => Some((item, data)),
            Err(e) => {
                crate::debug!("list"; "skip {}: {}", item.location(), e.detail());
                None
            }
        })
        .filter(|(_, data)| options.include_drafts || !data.is_draft())
        .collect();

    posts.sort_by(|(_, a), (_, b)| newest_first(a, b));
    if let Some(limit) = options.limit {
        posts.truncate(limit);
    }

    let mut projected = Vec::with_capacity(posts.len());
    for (item, data) in posts {
        projected.push(project(item, &data, fields).await);
    }
    Ok(projected)
}

/// Dated posts before undated ones; ties broken by slug.
fn newest_first(a: &PostData, b: &PostData) -> Ordering {
    match (&a.meta.date, &b.meta.date) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.properties.slug.cmp(&b.properties.slug))
}

async fn project<S: AsRef<str>>(item: &Arc<ContentItem>, data: &PostData, fields: &[S]) -> JsonMap {
    let Value::Object(all) = data.to_json() else {
        return JsonMap::new();
    };
    if fields.is_empty() {
        return all;
    }

    let mut out = JsonMap::new();
    for field in fields {
        let field = field.as_ref();
        if field == CONTENT_FIELD {
            if let Ok(text) = item.content().await {
                out.insert(field.to_string(), Value::String(text.to_string()));
            }
        } else if let Some(value) = all.get(field) {
            out.insert(field.to_string(), value.clone());
        }
    }
    out
}
