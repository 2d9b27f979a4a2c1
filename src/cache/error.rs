//! Failures of a cached post computation.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::compiler::CompileDiagnostic;

/// Why a post accessor failed.
///
/// `Clone` so one failure can be handed to every caller that waited on the
/// same computation, and cached for later callers.
#[derive(Debug, Clone, Error)]
pub enum ItemError {
    #[error("post not found: `{}`", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("invalid frontmatter in `{}`: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("failed to compile `{}`", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        diagnostic: CompileDiagnostic,
    },

    #[error("computation for `{}` was interrupted: {message}", .path.display())]
    Interrupted { path: PathBuf, message: String },
}

impl ItemError {
    pub(crate) fn from_io(path: PathBuf, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Read {
                path,
                source: Arc::new(err),
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Full message including the source chain, for status display.
    pub fn detail(&self) -> String {
        match self {
            Self::Read { source, .. } => format!("{self}: {source}"),
            Self::Compile { diagnostic, .. } => match diagnostic.line {
                Some(line) => format!("{self}: line {line}: {diagnostic}"),
                None => format!("{self}: {diagnostic}"),
            },
            _ => self.to_string(),
        }
    }
}
