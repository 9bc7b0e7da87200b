// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;
use civstat_ingest::IngestError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Stat(#[from] StatError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("report rendering failed")]
    Render(#[from] std::fmt::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Ingest(err) => err.code(),
            Self::Stat(err) => err.code(),
            Self::Json(_) => "json_error",
            Self::Render(_) => "render_error",
            Self::Io { .. } => "io_error",
        }
    }
}
