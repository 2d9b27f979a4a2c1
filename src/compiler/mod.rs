//! Body compilation: the seam between the cache and whatever renders posts.

mod markdown;

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

pub use markdown::MarkdownCompiler;

/// Compiled, renderable form of a post body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub html: String,
    pub headings: Vec<Heading>,
    /// Words of prose, code blocks excluded.
    pub words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub id: String,
    pub text: String,
}

/// Diagnostic reported by a compiler for a body it rejects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileDiagnostic {
    pub message: String,
    /// 1-based line in the body, when known.
    pub line: Option<usize>,
}

impl CompileDiagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

/// Compiles a post body into a [`Bundle`].
///
/// `path` is the source file, for diagnostics only; the body has already
/// been read and stripped of its frontmatter.
#[async_trait]
pub trait BundleCompiler: Send + Sync {
    async fn compile(&self, body: &str, path: &Path) -> Result<Bundle, CompileDiagnostic>;
}
