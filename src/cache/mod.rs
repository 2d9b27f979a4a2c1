//! In-process post cache.
//!
//! ```text
//! PostId ──resolve──▶ Location ──ItemCache::get──▶ Arc<ContentItem>
//!                                                    ├─ content()  raw text
//!                                                    ├─ data()     frontmatter ∪ properties
//!                                                    └─ bundle()   compiled body
//! ```
//!
//! Every accessor computes at most once per generation; a change event for a
//! location clears the item's slots in place.

mod error;
mod item;
mod slot;
mod store;


pub use error::ItemError;
pub use item::{ContentItem, ItemStats};
pub use slot::{SlotResult, SlotStatus};
pub use store::ItemCache;
