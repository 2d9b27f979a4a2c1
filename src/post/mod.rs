//! Post types: identity, location, frontmatter and merged data.

pub mod frontmatter;
mod id;
mod location;
mod meta;

pub use id::PostId;
pub use location::{ContentRoot, Location, PostProperties, resolve};
pub use meta::{PostData, PostMeta};

/// A JSON object map for arbitrary metadata fields.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
