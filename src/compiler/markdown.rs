//! Markdown body compilation with pulldown-cmark.

use std::path::Path;

use async_trait::async_trait;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, TagEnd};
use rustc_hash::FxHashSet;

use super::{Bundle, BundleCompiler, CompileDiagnostic, Heading};

/// Options for markdown conversion
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptions {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    /// `# Heading {#custom-id}`
    pub heading_attributes: bool,
}

impl MarkdownOptions {
    /// All extensions enabled
    pub fn all() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            task_lists: true,
            heading_attributes: true,
        }
    }

    fn to_pulldown_options(&self) -> Options {
        let mut opts = Options::empty();
        if self.tables {
            opts.insert(Options::ENABLE_TABLES);
        }
        if self.footnotes {
            opts.insert(Options::ENABLE_FOOTNOTES);
        }
        if self.strikethrough {
            opts.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            opts.insert(Options::ENABLE_TASKLISTS);
        }
        if self.heading_attributes {
            opts.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        }
        opts
    }
}

/// Default compiler: markdown to HTML, on the blocking pool.
#[derive(Debug, Clone)]
pub struct MarkdownCompiler {
    options: MarkdownOptions,
}

impl MarkdownCompiler {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }
}

impl Default for MarkdownCompiler {
    fn default() -> Self {
        Self::new(MarkdownOptions::all())
    }
}

#[async_trait]
impl BundleCompiler for MarkdownCompiler {
    async fn compile(&self, body: &str, path: &Path) -> Result<Bundle, CompileDiagnostic> {
        let body = body.to_string();
        let options = self.options.clone();
        crate::debug!("compile"; "{}", path.display());

        tokio::task::spawn_blocking(move || render(&body, &options))
            .await
            .map_err(|e| CompileDiagnostic::new(format!("markdown worker failed: {e}")))?
    }
}

struct OpenHeading {
    /// Index of the heading's start event
    index: usize,
    level: u8,
    explicit: Option<String>,
    text: String,
    line: usize,
}

/// Render markdown to HTML, assigning every heading a unique id.
///
/// Explicit `{#id}`s are reserved first; generated ids are suffixed around
/// them. Two headings claiming the same explicit id is a compile error.
pub fn render(markdown: &str, options: &MarkdownOptions) -> Result<Bundle, CompileDiagnostic> {
    let parser = Parser::new_ext(markdown, options.to_pulldown_options()).into_offset_iter();

    let mut events: Vec<Event<'_>> = Vec::new();
    let mut closed: Vec<OpenHeading> = Vec::new();
    let mut explicit_ids = FxHashSet::default();
    let mut open: Option<OpenHeading> = None;
    let mut in_code_block = false;
    let mut words = 0;

    for (event, range) in parser {
        match &event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                open = Some(OpenHeading {
                    index: events.len(),
                    level: *level as u8,
                    explicit: id.as_ref().map(|id| id.to_string()),
                    text: String::new(),
                    line: line_of(markdown, range.start),
                });
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(heading) = open.take() {
                    if let Some(id) = &heading.explicit
                        && !explicit_ids.insert(id.clone())
                    {
                        return Err(CompileDiagnostic::new(format!("duplicate heading id `{id}`"))
                            .at_line(heading.line));
                    }
                    closed.push(heading);
                }
            }
            Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
            Event::End(TagEnd::CodeBlock) => in_code_block = false,
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = open.as_mut() {
                    heading.text.push_str(text);
                }
                if !in_code_block {
                    words += text.split_whitespace().count();
                }
            }
            _ => {}
        }
        events.push(event);
    }

    let mut taken = explicit_ids;
    let mut headings = Vec::with_capacity(closed.len());
    for heading in closed {
        let id = match heading.explicit {
            Some(id) => id,
            None => {
                let id = unique_id(&mut taken, &slugify(&heading.text));
                if let Event::Start(Tag::Heading { id: slot, .. }) = &mut events[heading.index] {
                    *slot = Some(CowStr::from(id.clone()));
                }
                id
            }
        };
        headings.push(Heading {
            level: heading.level,
            id,
            text: heading.text.trim().to_string(),
        });
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());

    Ok(Bundle {
        html,
        headings,
        words,
    })
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Claim `base`, or `base-1`, `base-2`, ... if taken.
fn unique_id(ids: &mut FxHashSet<String>, base: &str) -> String {
    if ids.insert(base.to_string()) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| ids.insert(candidate.clone()))
        .unwrap_or_else(|| base.to_string())
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to `-`.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            slug.push(ch);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_all(markdown: &str) -> Result<Bundle, CompileDiagnostic> {
        render(markdown, &MarkdownOptions::all())
    }

    #[test]
    fn test_basic_html() {
        let bundle = render_all("Hello **world**").unwrap();
        assert_eq!(bundle.html, "<p>Hello <strong>world</strong></p>\n");
        assert_eq!(bundle.words, 2);
    }

    #[test]
    fn test_heading_ids_generated() {
        let bundle = render_all("# Getting Started\n\n## Why? Because!\n").unwrap();

        assert!(bundle.html.contains(r#"<h1 id="getting-started">Getting Started</h1>"#));
        assert_eq!(bundle.headings.len(), 2);
        assert_eq!(bundle.headings[0].level, 1);
        assert_eq!(bundle.headings[1].id, "why-because");
        assert_eq!(bundle.headings[1].text, "Why? Because!");
    }

    #[test]
    fn test_duplicate_generated_ids_suffixed() {
        let bundle = render_all("## Notes\n\n## Notes\n\n## Notes\n").unwrap();
        let ids: Vec<_> = bundle.headings.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["notes", "notes-1", "notes-2"]);
    }

    #[test]
    fn test_explicit_heading_id() {
        let bundle = render_all("## Setup {#install}\n").unwrap();
        assert_eq!(bundle.headings[0].id, "install");
        assert!(bundle.html.contains(r#"id="install""#));
    }

    #[test]
    fn test_duplicate_explicit_id_is_error() {
        let err = render_all("## One {#same}\n\ntext\n\n## Two {#same}\n").unwrap_err();
        assert_eq!(err.message, "duplicate heading id `same`");
        assert_eq!(err.line, Some(5));
    }

    #[test]
    fn test_explicit_id_wins_over_generated() {
        let ids = |markdown| {
            render_all(markdown)
                .unwrap()
                .headings
                .into_iter()
                .map(|h| h.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(ids("# Intro\n\n## Details {#intro}\n"), ["intro-1", "intro"]);
        assert_eq!(ids("## Details {#intro}\n\n# Intro\n"), ["intro", "intro-1"]);
    }

    #[test]
    fn test_generated_id_skips_explicit_suffix() {
        let bundle = render_all("## Notes\n\n## Notes\n\n## Later {#notes-1}\n").unwrap();
        let ids: Vec<_> = bundle.headings.iter().map(|h| h.id.as_str()).collect();

        assert_eq!(ids, vec!["notes", "notes-2", "notes-1"]);
        assert!(bundle.html.contains(r#"<h2 id="notes-2">Notes</h2>"#));
    }

    #[test]
    fn test_code_blocks_not_counted() {
        let bundle = render_all("one two\n\n```rust\nlet a = 1;\n```\n").unwrap();
        assert_eq!(bundle.words, 2);
        assert!(bundle.html.contains("<pre><code class=\"language-rust\">"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World"), "hello-world");
        assert_eq!(slugify("  --  "), "section");
        assert_eq!(slugify("Ünïcode ok"), "ünïcode-ok");
    }

    #[tokio::test]
    async fn test_compiler_trait() {
        let compiler = MarkdownCompiler::default();
        let bundle = compiler
            .compile("# Title\n\nbody", Path::new("2021-06-x/index.md"))
            .await
            .unwrap();
        assert_eq!(bundle.headings[0].id, "title");
    }
}
