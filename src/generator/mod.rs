//! Output generators.
//!
//! - **Pages**: one `index.html` per post, at `<output>/<year>/<month>/<slug>/`
//! - **Sitemap**: `sitemap.xml` for search engine indexing
//!
//! Both read through the [`ItemCache`](crate::cache::ItemCache), so a post
//! already compiled for its page is not compiled again for the sitemap.

pub mod page;
pub mod sitemap;

use std::borrow::Cow;

pub use page::{PageOutcome, output_path, remove_page, write_page};
pub use sitemap::build_sitemap;

/// Escape the five XML special characters. Also valid for HTML text and
/// attribute values.
pub fn escape_xml(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("hello"), "hello");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(escape_xml("it's"), "it&apos;s");
    }

    #[test]
    fn test_escape_xml_borrows_when_clean() {
        assert!(matches!(escape_xml("/2021/06/x"), Cow::Borrowed(_)));
    }
}
