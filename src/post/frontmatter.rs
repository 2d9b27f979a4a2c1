//! Frontmatter header detection and parsing.
//!
//! Two header styles are recognized at the top of a post:
//!
//! ```text
//! ---                      +++
//! title: Hello             title = "Hello"
//! tags: a, b               tags = ["a", "b"]
//! ---                      +++
//! ```

use serde_json::Value;
use thiserror::Error;

use super::{JsonMap, PostMeta};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontmatterError {
    #[error("missing frontmatter header")]
    Missing,
    #[error("unterminated `{0}` frontmatter header")]
    Unterminated(&'static str),
    #[error("line {line}: expected `key: value`, found `{text}`")]
    Syntax { line: usize, text: String },
    #[error("line {line}: `{key}` cannot hold nested fields")]
    Nested { line: usize, key: String },
    #[error("invalid TOML frontmatter: {0}")]
    Toml(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fence {
    Yaml,
    Toml,
}

impl Fence {
    const fn marker(self) -> &'static str {
        match self {
            Self::Yaml => "---",
            Self::Toml => "+++",
        }
    }

    fn detect(source: &str) -> Option<Self> {
        [Self::Yaml, Self::Toml]
            .into_iter()
            .find(|fence| source.starts_with(fence.marker()))
    }
}

/// A post split into header text and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frontmatter<'a> {
    fence: Fence,
    pub header: &'a str,
    pub body: &'a str,
}

/// Split a post into header and body without parsing the header.
///
/// Returns `Err` only for an opened but never closed header.
pub fn split(source: &str) -> Result<Option<Frontmatter<'_>>, FrontmatterError> {
    let trimmed = source.trim_start();
    let Some(fence) = Fence::detect(trimmed) else {
        return Ok(None);
    };

    let marker = fence.marker();
    let rest = &trimmed[marker.len()..];
    let close = format!("\n{marker}");
    let Some(end) = rest.find(&close) else {
        return Err(FrontmatterError::Unterminated(marker));
    };

    let header = rest[..end].trim();
    let after = &rest[end + close.len()..];
    // Drop the remainder of the closing fence line.
    let body = after
        .split_once('\n')
        .map_or("", |(_, body)| body)
        .trim_start_matches(['\n', '\r']);

    Ok(Some(Frontmatter {
        fence,
        header,
        body,
    }))
}

/// Body of a post, with any header removed.
///
/// An unterminated header is left in place: the body compiler sees the
/// source as written.
pub fn body(source: &str) -> &str {
    match split(source) {
        Ok(Some(frontmatter)) => frontmatter.body,
        _ => source,
    }
}

/// Parse the header of a post. A header with a non-empty `title` is required.
pub fn parse(source: &str) -> Result<(PostMeta, &str), FrontmatterError> {
    let frontmatter = split(source)?.ok_or(FrontmatterError::Missing)?;

    let meta = match frontmatter.fence {
        Fence::Yaml => parse_yaml_like(frontmatter.header)?,
        Fence::Toml => parse_toml(frontmatter.header)?,
    };

    if meta.title.as_deref().is_none_or(|t| t.trim().is_empty()) {
        return Err(FrontmatterError::MissingField("title"));
    }

    Ok((meta, frontmatter.body))
}

/// TOML headers go through `toml::Table` first so native dates and times
/// (`date = 2021-06-01`) arrive as their text, like in `---` headers.
fn parse_toml(header: &str) -> Result<PostMeta, FrontmatterError> {
    let table: toml::Table =
        toml::from_str(header).map_err(|e| FrontmatterError::Toml(e.message().to_string()))?;
    let value = toml_to_json(toml::Value::Table(table));
    serde_json::from_value(value).map_err(|e| FrontmatterError::Toml(e.to_string()))
}

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(n) => Value::Number(n.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

/// Keys with a typed slot in [`PostMeta`]; none of them takes a mapping.
const TYPED_KEYS: [&str; 7] = ["title", "date", "updated", "author", "summary", "draft", "tags"];

/// Indented lines under a key whose value is empty.
enum Block {
    Empty,
    List(Vec<String>),
    Map { indent: usize, entries: JsonMap },
}

struct OpenKey {
    key: String,
    line: usize,
    block: Block,
}

/// Parse simple YAML-like `key: value` lines.
///
/// A key with an empty value takes either the `- item` lines or the indented
/// `key: value` lines that follow it, one level deep. Anything else indented
/// is a syntax error.
fn parse_yaml_like(header: &str) -> Result<PostMeta, FrontmatterError> {
    let mut meta = PostMeta::default();
    let mut open: Option<OpenKey> = None;

    for (index, raw) in header.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let indent = raw.len() - raw.trim_start().len();

        if let Some(current) = open.as_mut() {
            if let Some(item) = line.strip_prefix("- ") {
                let item = unquote(item.trim()).to_string();
                match current.block {
                    Block::Empty => current.block = Block::List(vec![item]),
                    Block::List(ref mut items) => items.push(item),
                    Block::Map { .. } => return Err(syntax(index, raw)),
                }
                continue;
            }
            if indent > 0 {
                let (key, value) = key_value(index, raw)?;
                if value.is_empty() {
                    return Err(syntax(index, raw));
                }
                let value = parse_yaml_value(value);
                match current.block {
                    Block::Empty => {
                        let mut entries = JsonMap::new();
                        entries.insert(key.to_string(), value);
                        current.block = Block::Map { indent, entries };
                    }
                    Block::Map {
                        indent: expected,
                        ref mut entries,
                    } if expected == indent => {
                        entries.insert(key.to_string(), value);
                    }
                    _ => return Err(syntax(index, raw)),
                }
                continue;
            }
        }

        if let Some(done) = open.take() {
            close_block(&mut meta, done)?;
        }
        if indent > 0 {
            return Err(syntax(index, raw));
        }

        let (key, value) = key_value(index, raw)?;
        if value.is_empty() {
            open = Some(OpenKey {
                key: key.to_string(),
                line: index + 1,
                block: Block::Empty,
            });
            continue;
        }

        apply_scalar(&mut meta, key, value);
    }

    if let Some(done) = open {
        close_block(&mut meta, done)?;
    }

    Ok(meta)
}

fn key_value(index: usize, raw: &str) -> Result<(&str, &str), FrontmatterError> {
    let Some((key, value)) = raw.trim().split_once(':') else {
        return Err(syntax(index, raw));
    };
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return Err(syntax(index, raw));
    }
    Ok((key, value.trim()))
}

fn close_block(meta: &mut PostMeta, open: OpenKey) -> Result<(), FrontmatterError> {
    match open.block {
        Block::Empty => apply_list(meta, open.key, Vec::new()),
        Block::List(items) => apply_list(meta, open.key, items),
        Block::Map { entries, .. } => {
            if TYPED_KEYS.contains(&open.key.to_lowercase().as_str()) {
                return Err(FrontmatterError::Nested {
                    line: open.line,
                    key: open.key,
                });
            }
            meta.extra.insert(open.key, Value::Object(entries));
        }
    }
    Ok(())
}

fn syntax(index: usize, raw: &str) -> FrontmatterError {
    FrontmatterError::Syntax {
        line: index + 1,
        text: raw.trim().to_string(),
    }
}

fn apply_scalar(meta: &mut PostMeta, key: &str, value: &str) {
    let text = || unquote(value).to_string();
    match key.to_lowercase().as_str() {
        "title" => meta.title = Some(text()),
        "date" => meta.date = Some(text()),
        "updated" => meta.updated = Some(text()),
        "author" => meta.author = Some(text()),
        "summary" => meta.summary = Some(text()),
        "draft" => meta.draft = value.eq_ignore_ascii_case("true"),
        "tags" => meta.tags = split_list(value),
        // Custom field, original key case preserved
        _ => {
            meta.extra.insert(key.to_string(), parse_yaml_value(value));
        }
    }
}

fn apply_list(meta: &mut PostMeta, key: String, items: Vec<String>) {
    if key.eq_ignore_ascii_case("tags") {
        meta.tags = items;
    } else if items.is_empty() {
        meta.extra.insert(key, Value::Null);
    } else {
        meta.extra
            .insert(key, Value::Array(items.into_iter().map(Value::String).collect()));
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}

/// `a, b` or `[a, b]` into a list of trimmed, unquoted items.
fn split_list(s: &str) -> Vec<String> {
    let s = s
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(s);
    s.split(',')
        .map(|item| unquote(item.trim()).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse a YAML-like scalar into JSON.
///
/// Booleans, `null`/`~`, integers, floats, `[a, b]` and `a, b` lists,
/// quoted strings, and plain strings otherwise.
fn parse_yaml_value(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if s.eq_ignore_ascii_case("null") || s == "~" {
        return Value::Null;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(n) = s.parse::<f64>()
        && let Some(num) = serde_json::Number::from_f64(n)
    {
        return Value::Number(num);
    }
    if (s.starts_with('[') && s.ends_with(']')) || s.contains(',') {
        return Value::Array(split_list(s).into_iter().map(Value::String).collect());
    }
    Value::String(unquote(s).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_frontmatter() {
        let source = "---\ntitle: Hello\ndate: 2024-01-01\ntags: a, b\n---\n\n# Body";
        let (meta, body) = parse(source).unwrap();

        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(meta.date.as_deref(), Some("2024-01-01"));
        assert_eq!(meta.tags, vec!["a", "b"]);
        assert!(body.starts_with("# Body"));
    }

    #[test]
    fn test_toml_frontmatter() {
        let source = "+++\ntitle = \"Hello\"\ntags = [\"a\", \"b\"]\n+++\n\n# Body";
        let (meta, body) = parse(source).unwrap();

        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(meta.tags, vec!["a", "b"]);
        assert_eq!(body, "# Body");
    }

    #[test]
    fn test_yaml_extra_fields() {
        let source =
            "---\ntitle: Hello\ncustom: world\ncount: 42\nflag: true\nitems: x, y, z\n---\n";
        let (meta, _) = parse(source).unwrap();

        assert_eq!(meta.extra.get("custom"), Some(&serde_json::json!("world")));
        assert_eq!(meta.extra.get("count"), Some(&serde_json::json!(42)));
        assert_eq!(meta.extra.get("flag"), Some(&serde_json::json!(true)));
        assert_eq!(
            meta.extra.get("items"),
            Some(&serde_json::json!(["x", "y", "z"]))
        );
    }

    #[test]
    fn test_yaml_quoted_and_bracketed_values() {
        let source = "---\ntitle: \"Files: faster\"\ntags: [perf, 'nextjs']\n---\nbody";
        let (meta, _) = parse(source).unwrap();

        assert_eq!(meta.title.as_deref(), Some("Files: faster"));
        assert_eq!(meta.tags, vec!["perf", "nextjs"]);
    }

    #[test]
    fn test_yaml_block_list() {
        let source = "---\ntitle: Hello\ntags:\n  - rust\n  - cache\nseries:\n---\nbody";
        let (meta, _) = parse(source).unwrap();

        assert_eq!(meta.tags, vec!["rust", "cache"]);
        assert_eq!(meta.extra.get("series"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn test_yaml_nested_mapping() {
        let source = "---\ntitle: Hello\nseries:\n  name: perf\n  part: 2\ndraft: true\n---\nbody";
        let (meta, _) = parse(source).unwrap();

        assert_eq!(
            meta.extra.get("series"),
            Some(&serde_json::json!({"name": "perf", "part": 2}))
        );
        assert!(meta.draft);
        assert!(!meta.extra.contains_key("name"));
    }

    #[test]
    fn test_yaml_nested_typed_field_is_error() {
        assert_eq!(
            parse("---\ntitle: Hello\nauthor:\n  name: Jo\n---\n"),
            Err(FrontmatterError::Nested {
                line: 2,
                key: "author".to_string()
            })
        );
    }

    #[test]
    fn test_yaml_unsupported_indentation() {
        // Two levels deep
        let deep = parse("---\ntitle: x\nseries:\n  meta:\n    part: 2\n---\n").unwrap_err();
        assert_eq!(
            deep,
            FrontmatterError::Syntax {
                line: 3,
                text: "meta:".to_string()
            }
        );

        // List items mixed into a mapping
        let mixed = parse("---\ntitle: x\nseries:\n  name: perf\n  - two\n---\n").unwrap_err();
        assert!(matches!(mixed, FrontmatterError::Syntax { line: 4, .. }));

        // Uneven indentation inside a mapping
        let uneven = parse("---\ntitle: x\nseries:\n  name: perf\n    part: 2\n---\n").unwrap_err();
        assert!(matches!(uneven, FrontmatterError::Syntax { line: 4, .. }));

        // Indented line with nothing to belong to
        let stray = parse("---\ntitle: x\n  extra: 1\n---\n").unwrap_err();
        assert!(matches!(stray, FrontmatterError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_toml_extra_fields() {
        let source = "+++\ntitle = \"Hello\"\ncustom = \"world\"\ncount = 42\n+++\n";
        let (meta, _) = parse(source).unwrap();

        assert_eq!(meta.extra.get("custom"), Some(&serde_json::json!("world")));
        assert_eq!(meta.extra.get("count"), Some(&serde_json::json!(42)));
    }

    #[test]
    fn test_toml_native_dates() {
        let source = "+++\ntitle = \"x\"\ndate = 2021-06-01\nupdated = 2021-07-02T10:30:00Z\nshot = 07:32:00\n+++\nbody";
        let (meta, body) = parse(source).unwrap();

        assert_eq!(meta.date.as_deref(), Some("2021-06-01"));
        assert_eq!(meta.updated.as_deref(), Some("2021-07-02T10:30:00Z"));
        assert_eq!(meta.extra.get("shot"), Some(&serde_json::json!("07:32:00")));
        assert_eq!(body, "body");
    }

    #[test]
    fn test_toml_wrong_type_is_error() {
        let err = parse("+++\ntitle = 42\n+++\n").unwrap_err();
        assert!(matches!(err, FrontmatterError::Toml(_)));
    }

    #[test]
    fn test_missing_header() {
        assert_eq!(parse("# Just content"), Err(FrontmatterError::Missing));
    }

    #[test]
    fn test_unterminated_header() {
        assert_eq!(
            parse("---\ntitle: Hello\n\n# Body"),
            Err(FrontmatterError::Unterminated("---"))
        );
    }

    #[test]
    fn test_malformed_yaml_line() {
        let err = parse("---\ntitle: Hello\nthis is not a field\n---\n").unwrap_err();
        assert_eq!(
            err,
            FrontmatterError::Syntax {
                line: 2,
                text: "this is not a field".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_toml() {
        let err = parse("+++\ntitle = \n+++\n").unwrap_err();
        assert!(matches!(err, FrontmatterError::Toml(_)));
    }

    #[test]
    fn test_missing_title() {
        assert_eq!(
            parse("---\ndate: 2021-06-01\n---\nbody"),
            Err(FrontmatterError::MissingField("title"))
        );
        assert_eq!(
            parse("---\ntitle: \"\"\n---\nbody"),
            Err(FrontmatterError::MissingField("title"))
        );
    }

    #[test]
    fn test_body_without_parsing() {
        assert_eq!(body("---\nnot valid yaml\n---\n# Body"), "# Body");
        assert_eq!(body("# No header"), "# No header");
        // Unterminated headers stay in the body
        assert_eq!(body("---\ntitle: x"), "---\ntitle: x");
    }
}
