//! Canonical post locations and their mapping onto the content directory.
//!
//! A [`Location`] is computed from a [`PostId`] alone. Nothing here touches the
//! filesystem: whether a post exists is only discovered when its content is
//! first read.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::PostId;

/// File stem of every post source inside its directory.
const INDEX_STEM: &str = "index";

/// Canonical address of a post: `YYYY-MM-slug/index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    key: String,
    id: PostId,
}

/// Map an identity to its location.
///
/// Year and month are fixed-width, so distinct identities never share a key.
pub fn resolve(id: &PostId) -> Location {
    Location {
        key: format!("{}/{INDEX_STEM}", id.dir_name()),
        id: id.clone(),
    }
}

impl Location {
    /// Parse a location key. Only keys produced by [`resolve`] are accepted.
    pub fn parse(key: &str) -> Option<Self> {
        let (dir, stem) = key.split_once('/')?;
        if stem != INDEX_STEM {
            return None;
        }
        PostId::from_dir_name(dir).ok().map(|id| resolve(&id))
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> &PostId {
        &self.id
    }

    /// Properties derivable without reading the post.
    pub fn properties(&self) -> PostProperties {
        PostProperties {
            year: self.id.year().to_string(),
            month: self.id.month().to_string(),
            slug: self.id.slug().to_string(),
            href: self.id.href(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// Identity-derived fields merged into every post's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProperties {
    pub year: String,
    pub month: String,
    pub slug: String,
    pub href: String,
}

impl PostProperties {
    pub const KEYS: [&'static str; 4] = ["year", "month", "slug", "href"];
}

/// Content directory layout: `<dir>/<YYYY-MM-slug>/index.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    dir: PathBuf,
    extension: String,
}

impl ContentRoot {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            dir: dir.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Directory holding the post.
    pub fn post_dir(&self, location: &Location) -> PathBuf {
        self.dir.join(location.id().dir_name())
    }

    /// Source file backing the location.
    pub fn source_path(&self, location: &Location) -> PathBuf {
        self.post_dir(location)
            .join(format!("{INDEX_STEM}.{}", self.extension))
    }

    /// Map a filesystem path back to a location.
    ///
    /// Accepts the post's source file or the post directory itself (directory
    /// creation/removal). Anything else under the content dir yields `None`.
    pub fn locate(&self, path: &Path) -> Option<Location> {
        let relative = path.strip_prefix(&self.dir).ok()?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;

        let dir = match parts.as_slice() {
            [dir] => *dir,
            [dir, file] if *file == format!("{INDEX_STEM}.{}", self.extension) => *dir,
            _ => return None,
        };

        PostId::from_dir_name(dir).ok().map(|id| resolve(&id))
    }
}
