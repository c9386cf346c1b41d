use std::path::PathBuf;
use thiserror::Error;

/// Hard failures of the analysis pipeline.
///
/// Missing or malformed individual tag values are not errors; they resolve
/// to `None` and fall through to inference or defaults.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The embedded tag container (or the container holding it) is unreadable.
    #[error("failed to read metadata: {0}")]
    Metadata(String),

    #[error("failed to decode audio: {0}")]
    Decode(String),
}

impl From<symphonia::core::errors::Error> for AnalysisError {
    fn from(err: symphonia::core::errors::Error) -> Self {
        AnalysisError::Decode(err.to_string())
    }
}
