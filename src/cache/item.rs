//! One post with three lazily computed, independently cached values.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ItemError;
use super::slot::{Slot, SlotResult, SlotStatus};
use crate::compiler::{Bundle, BundleCompiler};
use crate::post::{ContentRoot, Location, PostData, PostProperties, frontmatter};

/// Work counters of one item, across all generations.
#[derive(Debug, Default)]
struct Counters {
    reads: AtomicUsize,
    parses: AtomicUsize,
    compiles: AtomicUsize,
}

/// Snapshot of [`ContentItem`] work counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemStats {
    pub reads: usize,
    pub parses: usize,
    pub compiles: usize,
}

/// A post on disk and its cached derived values.
///
/// Accessors take `self: &Arc<Self>` because each computation runs as its
/// own task and keeps the item alive until it finishes.
pub struct ContentItem {
    location: Location,
    source: PathBuf,
    compiler: Arc<dyn BundleCompiler>,
    content: Slot<Arc<str>>,
    data: Slot<Arc<PostData>>,
    bundle: Slot<Arc<Bundle>>,
    counters: Counters,
}

impl ContentItem {
    pub fn new(location: Location, root: &ContentRoot, compiler: Arc<dyn BundleCompiler>) -> Self {
        Self {
            source: root.source_path(&location),
            location,
            compiler,
            content: Slot::new(),
            data: Slot::new(),
            bundle: Slot::new(),
            counters: Counters::default(),
        }
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }

    pub fn properties(&self) -> PostProperties {
        self.location.properties()
    }

    /// Raw source text, read once per generation.
    pub async fn content(self: &Arc<Self>) -> SlotResult<Arc<str>> {
        let item = Arc::clone(self);
        self.content
            .get_or_compute(&self.source, move || Self::read(item))
            .await
    }

    /// Frontmatter merged with identity properties.
    pub async fn data(self: &Arc<Self>) -> SlotResult<Arc<PostData>> {
        let item = Arc::clone(self);
        self.data
            .get_or_compute(&self.source, move || Self::parse(item))
            .await
    }

    /// Compiled body. The header is stripped but not parsed, so a broken
    /// header does not fail the bundle.
    pub async fn bundle(self: &Arc<Self>) -> SlotResult<Arc<Bundle>> {
        let item = Arc::clone(self);
        self.bundle
            .get_or_compute(&self.source, move || Self::compile(item))
            .await
    }

    async fn read(item: Arc<Self>) -> SlotResult<Arc<str>> {
        item.counters.reads.fetch_add(1, Ordering::SeqCst);
        crate::debug!("cache"; "read {}", item.location);
        let text = tokio::fs::read_to_string(&item.source)
            .await
            .map_err(|e| ItemError::from_io(item.source.clone(), e))?;
        Ok(Arc::from(text))
    }

    async fn parse(item: Arc<Self>) -> SlotResult<Arc<PostData>> {
        let content = item.content().await?;
        item.counters.parses.fetch_add(1, Ordering::SeqCst);
        crate::debug!("cache"; "parse {}", item.location);
        let (meta, _) = frontmatter::parse(&content).map_err(|e| ItemError::Parse {
            path: item.source.clone(),
            message: e.to_string(),
        })?;
        Ok(Arc::new(PostData::merge(meta, item.properties())))
    }

    async fn compile(item: Arc<Self>) -> SlotResult<Arc<Bundle>> {
        let content = item.content().await?;
        item.counters.compiles.fetch_add(1, Ordering::SeqCst);
        crate::debug!("cache"; "compile {}", item.location);
        let bundle = item
            .compiler
            .compile(frontmatter::body(&content), &item.source)
            .await
            .map_err(|diagnostic| ItemError::Compile {
                path: item.source.clone(),
                diagnostic,
            })?;
        Ok(Arc::new(bundle))
    }

    /// Clear all three slots. The item itself stays in the cache.
    pub fn invalidate(&self) {
        self.content.invalidate();
        self.data.invalidate();
        self.bundle.invalidate();
    }

    /// `(content, data, bundle)` slot states.
    pub fn status(&self) -> (SlotStatus, SlotStatus, SlotStatus) {
        (
            self.content.status(),
            self.data.status(),
            self.bundle.status(),
        )
    }

    pub fn stats(&self) -> ItemStats {
        ItemStats {
            reads: self.counters.reads.load(Ordering::SeqCst),
            parses: self.counters.parses.load(Ordering::SeqCst),
            compiles: self.counters.compiles.load(Ordering::SeqCst),
        }
    }
}

impl std::fmt::Debug for ContentItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentItem")
            .field("location", &self.location)
            .field("source", &self.source)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
