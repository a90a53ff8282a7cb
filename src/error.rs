use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// A required input path was not selected or does not exist.
    #[error("Missing {what}: {detail}")]
    MissingInput { what: &'static str, detail: String },

    /// The input path has an extension the tool does not accept.
    #[error("Unsupported {what} '{}' (expected one of: {expected})", path.display())]
    UnsupportedInput {
        what: &'static str,
        path: PathBuf,
        expected: String,
    },

    #[error("{0}")]
    Parse(String),

    /// An entry whose end does not come after its start.
    #[error("Subtitle {index} has a non-positive duration ({start:?} --> {end:?})")]
    InvalidTiming {
        index: usize,
        start: Duration,
        end: Duration,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}
