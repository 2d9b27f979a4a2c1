//! Post identity: `{ year, month, slug }`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("year `{0}` must be four digits")]
    Year(String),
    #[error("month `{0}` must be two digits between 01 and 12")]
    Month(String),
    #[error("slug `{0}` must be lowercase letters, digits and inner hyphens")]
    Slug(String),
    #[error("`{0}` is not a `YYYY-MM-slug` post name")]
    Malformed(String),
}

/// Structured key of one post, independent of where it is stored.
///
/// Only constructible through validation, so every `PostId` resolves to a
/// well-formed location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PostId {
    year: String,
    month: String,
    slug: String,
}

impl PostId {
    pub fn new(
        year: impl Into<String>,
        month: impl Into<String>,
        slug: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let (year, month, slug) = (year.into(), month.into(), slug.into());

        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdentityError::Year(year));
        }
        let month_ok = month.len() == 2
            && month.bytes().all(|b| b.is_ascii_digit())
            && matches!(month.parse::<u8>(), Ok(1..=12));
        if !month_ok {
            return Err(IdentityError::Month(month));
        }
        if !is_valid_slug(&slug) {
            return Err(IdentityError::Slug(slug));
        }

        Ok(Self { year, month, slug })
    }

    /// Parse a post directory name: `2021-06-improving-nextjs-file-performance`.
    pub fn from_dir_name(name: &str) -> Result<Self, IdentityError> {
        let malformed = || IdentityError::Malformed(name.to_string());
        let (year, rest) = name.split_once('-').ok_or_else(malformed)?;
        let (month, slug) = rest.split_once('-').ok_or_else(malformed)?;
        Self::new(year, month, slug)
    }

    /// Parse a post href: `/2021/06/improving-nextjs-file-performance`.
    pub fn from_href(href: &str) -> Result<Self, IdentityError> {
        let parts: Vec<&str> = href.trim_matches('/').split('/').collect();
        match parts.as_slice() {
            [year, month, slug] => Self::new(*year, *month, *slug),
            _ => Err(IdentityError::Malformed(href.to_string())),
        }
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn month(&self) -> &str {
        &self.month
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Directory name holding the post: `YYYY-MM-slug`.
    pub fn dir_name(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.slug)
    }

    /// Public URL path: `/YYYY/MM/slug`.
    pub fn href(&self) -> String {
        format!("/{}/{}/{}", self.year, self.month, self.slug)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
