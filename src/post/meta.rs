//! Post metadata from frontmatter, and the merged data exposed to callers.

use serde::{Deserialize, Serialize};

use super::{JsonMap, PostProperties};

/// Deserialize tags, treating `null` as empty vec
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<Vec<String>> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// Frontmatter of a post.
///
/// | Field     | Type          | Description                   |
/// |-----------|---------------|-------------------------------|
/// | `title`   | `String`      | Post title (required)         |
/// | `date`    | `String`      | Publication date              |
/// | `updated` | `String`      | Last update date              |
/// | `author`  | `String`      | Author name                   |
/// | `summary` | `String`      | Short description             |
/// | `draft`   | `bool`        | Draft status (default: false) |
/// | `tags`    | `Vec<String>` | Categorization tags           |
///
/// Any other key lands in `extra` as raw JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub draft: bool,
    #[serde(deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Frontmatter merged with identity properties.
///
/// Serializes as one flat object. Property keys win over frontmatter keys of
/// the same name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostData {
    #[serde(flatten)]
    pub meta: PostMeta,
    #[serde(flatten)]
    pub properties: PostProperties,
}

impl PostData {
    pub fn merge(mut meta: PostMeta, properties: PostProperties) -> Self {
        for key in PostProperties::KEYS {
            meta.extra.remove(key);
        }
        Self { meta, properties }
    }

    pub fn title(&self) -> &str {
        self.meta.title.as_deref().unwrap_or(&self.properties.slug)
    }

    pub fn is_draft(&self) -> bool {
        self.meta.draft
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(JsonMap::new()))
    }
}
