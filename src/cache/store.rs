//! Location-keyed store of content items.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::ContentItem;
use crate::compiler::BundleCompiler;
use crate::post::{ContentRoot, Location, PostId, resolve};

/// At most one [`ContentItem`] per location for the lifetime of the cache.
///
/// Owned by the running command and passed to whatever needs lookups.
/// Entries are never evicted; the cache goes away with its owner.
pub struct ItemCache {
    root: ContentRoot,
    compiler: Arc<dyn BundleCompiler>,
    items: RwLock<FxHashMap<Location, Arc<ContentItem>>>,
}

impl ItemCache {
    pub fn new(root: ContentRoot, compiler: Arc<dyn BundleCompiler>) -> Self {
        Self {
            root,
            compiler,
            items: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn root(&self) -> &ContentRoot {
        &self.root
    }

    /// The resident item for `location`, created on first use.
    pub fn get(&self, location: &Location) -> Arc<ContentItem> {
        if let Some(item) = self.items.read().get(location) {
            return Arc::clone(item);
        }

        let mut items = self.items.write();
        // Another caller may have inserted between the two locks.
        let item = items.entry(location.clone()).or_insert_with(|| {
            crate::debug!("cache"; "new item {}", location);
            Arc::new(ContentItem::new(
                location.clone(),
                &self.root,
                Arc::clone(&self.compiler),
            ))
        });
        Arc::clone(item)
    }

    /// Resolve an identity and return its item.
    pub fn lookup(&self, id: &PostId) -> Arc<ContentItem> {
        self.get(&resolve(id))
    }

    /// The resident item, without creating one.
    pub fn peek(&self, location: &Location) -> Option<Arc<ContentItem>> {
        self.items.read().get(location).cloned()
    }

    /// Invalidate the resident item for `location`. Returns whether one was
    /// resident.
    pub fn invalidate(&self, location: &Location) -> bool {
        match self.peek(location) {
            Some(item) => {
                item.invalidate();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
