use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to draw plot: {0}")]
    Plot(String),

    #[error("no trials to report")]
    Empty,

    #[error(transparent)]
    Font(#[from] psylab_assets::AssetError),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}
