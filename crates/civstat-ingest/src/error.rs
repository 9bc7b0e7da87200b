// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parse error at record {record}: {message}")]
    Parse { record: u64, message: String },

    #[error(transparent)]
    Stat(#[from] StatError),
}

impl IngestError {
    pub fn parse(record: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            record,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_error",
            Self::Status { .. } => "http_status",
            Self::Io { .. } => "io_error",
            Self::Csv(_) => "csv_error",
            Self::Parse { .. } => "parse_error",
            Self::Stat(err) => err.code(),
        }
    }
}
